//! Code storage
//!
//! Uploaded source code is written once and addressed by a key of the form
//! `{language}/{uuid}.{ext}`. The execution engine resolves the same key
//! against the shared storage root.

use async_trait::async_trait;
use execgate_core::domain::job::Language;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CodeStoreError {
    #[error("invalid code key: {0}")]
    InvalidKey(String),

    #[error("code not found: {0}")]
    NotFound(String),

    #[error("code storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait CodeStore: Send + Sync {
    /// Stores source code and returns its key
    async fn put(&self, language: Language, code: &str) -> Result<String, CodeStoreError>;

    async fn get(&self, code_key: &str) -> Result<String, CodeStoreError>;
}

/// Builds a fresh storage key for a language
pub fn new_code_key(language: Language) -> String {
    format!("{}/{}.{}", language, Uuid::new_v4(), language.extension())
}

/// Code store rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalCodeStore {
    root: PathBuf,
}

impl LocalCodeStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a key below the root, refusing anything that could escape it
    fn resolve(&self, code_key: &str) -> Result<PathBuf, CodeStoreError> {
        let relative = Path::new(code_key);
        let well_formed = !code_key.is_empty()
            && !code_key.contains('\\')
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !well_formed {
            return Err(CodeStoreError::InvalidKey(code_key.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl CodeStore for LocalCodeStore {
    async fn put(&self, language: Language, code: &str) -> Result<String, CodeStoreError> {
        let code_key = new_code_key(language);
        let path = self.resolve(&code_key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, code).await?;

        tracing::debug!("Stored code at {}", path.display());
        Ok(code_key)
    }

    async fn get(&self, code_key: &str) -> Result<String, CodeStoreError> {
        let path = self.resolve(code_key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(code) => Ok(code),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CodeStoreError::NotFound(code_key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

//! Project domain types

use serde::{Deserialize, Serialize};

/// Namespace grouping jobs
///
/// Created lazily the first time code is uploaded under a new name; the name
/// is the natural key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub project: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

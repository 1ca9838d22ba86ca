//! Shared fixtures for the router tests

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use execgate_core::domain::execution::ExecutionRequest;
use execgate_engine::{EngineError, ExecutionEngine, RunPayload, StatusPayload};
use execgate_server::api::create_router;
use execgate_server::config::Config;
use execgate_server::state::AppState;
use execgate_server::storage::LocalCodeStore;
use execgate_server::store::MemoryJobStore;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const OK_BODY: &str = r#"{"stdout": "1\n", "stderr": "", "execution_time_ms": 12}"#;

/// Engine double answering every run with a fixed body
pub struct StubEngine {
    pub body: String,
    pub delay: Duration,
    pub runs: AtomicUsize,
}

impl StubEngine {
    pub fn responding(body: &str) -> Self {
        Self {
            body: body.to_string(),
            delay: Duration::ZERO,
            runs: AtomicUsize::new(0),
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::responding(OK_BODY)
        }
    }

    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionEngine for StubEngine {
    async fn run(&self, _request: &ExecutionRequest) -> execgate_engine::Result<RunPayload> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        RunPayload::parse(&self.body)
    }

    async fn status(&self, _job_id: Uuid) -> execgate_engine::Result<Option<StatusPayload>> {
        Ok(None)
    }

    async fn cancel(&self, _job_id: Uuid) -> execgate_engine::Result<()> {
        Err(EngineError::status(404, "unknown job"))
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryJobStore>,
    pub engine: Arc<StubEngine>,
    _code_dir: TempDir,
}

pub fn app(engine: StubEngine) -> TestApp {
    app_with(engine, |_| {})
}

pub fn app_with(engine: StubEngine, configure: impl FnOnce(&mut Config)) -> TestApp {
    let code_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.engine_timeout = Duration::from_secs(5);
    config.code_storage_dir = code_dir.path().to_path_buf();
    configure(&mut config);

    let store = Arc::new(MemoryJobStore::new());
    let engine = Arc::new(engine);
    let (state, _worker) = AppState::new(
        &config,
        store.clone(),
        Arc::new(LocalCodeStore::new(code_dir.path())),
        engine.clone(),
    );

    TestApp {
        router: create_router(state),
        store,
        engine,
        _code_dir: code_dir,
    }
}

impl TestApp {
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Uploads code and returns the new job id
    pub async fn upload(&self, project: &str, code: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/upload",
                Some(serde_json::json!({
                    "project": project,
                    "code": code,
                    "language": "python",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "upload failed: {}", body);
        body["job_id"].as_str().unwrap().to_string()
    }

    /// Polls the stored job until it leaves PENDING and RUNNING
    pub async fn wait_for_terminal(&self, job_id: &str) -> Value {
        for _ in 0..200 {
            let (_, job) = self.send(Method::GET, &format!("/api/jobs/{}", job_id), None).await;
            if !matches!(job["status"].as_str(), Some("PENDING") | Some("RUNNING")) {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never finished", job_id);
    }
}

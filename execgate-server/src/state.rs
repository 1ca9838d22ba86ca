//! Shared application state
//!
//! Everything a request handler needs, injected once at startup and cloned
//! cheaply into every handler.

use execgate_engine::ExecutionEngine;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::service::job::JobLimits;
use crate::service::{DispatchSettings, Dispatcher, EngineSettings};
use crate::storage::CodeStore;
use crate::store::JobStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub code_store: Arc<dyn CodeStore>,
    pub engine: Arc<dyn ExecutionEngine>,
    pub dispatcher: Dispatcher,
    pub engine_settings: EngineSettings,
    pub limits: JobLimits,
}

impl AppState {
    /// Wires the services together and starts the dispatcher
    pub fn new(
        config: &Config,
        store: Arc<dyn JobStore>,
        code_store: Arc<dyn CodeStore>,
        engine: Arc<dyn ExecutionEngine>,
    ) -> (Self, JoinHandle<()>) {
        let (dispatcher, worker) = Dispatcher::start(
            Arc::clone(&store),
            Arc::clone(&engine),
            DispatchSettings {
                max_concurrent: config.max_concurrent_dispatches,
                queue_depth: config.dispatch_queue_depth,
                call_timeout: config.engine_timeout,
            },
        );

        let state = Self {
            store,
            code_store,
            engine,
            dispatcher,
            engine_settings: EngineSettings {
                call_timeout: config.engine_timeout,
                status_polling: config.status_polling,
            },
            limits: JobLimits {
                default_timeout_ms: config.default_job_timeout_ms,
                max_timeout_ms: config.max_job_timeout_ms,
            },
        };

        (state, worker)
    }
}

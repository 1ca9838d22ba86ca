//! Service Module
//!
//! Business logic layer for the gateway.
//! Services orchestrate between the job store, code storage and the execution
//! engine, and contain the job lifecycle rules.

pub mod cancel;
pub mod dispatch;
pub mod error;
pub mod job;
pub mod lifecycle;
pub mod reconcile;

pub use dispatch::{DispatchSettings, Dispatcher};
pub use error::JobError;

use execgate_engine::EngineError;
use std::future::Future;
use std::time::Duration;

/// How status queries and cancellations talk to the engine
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Upper bound for each engine call
    pub call_timeout: Duration,
    /// Whether status queries consult the engine at all
    pub status_polling: bool,
}

/// Runs an engine call, converting an overrun into [`EngineError::Timeout`]
pub(crate) async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = execgate_engine::Result<T>>,
) -> execgate_engine::Result<T> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(EngineError::Timeout(limit)))
}

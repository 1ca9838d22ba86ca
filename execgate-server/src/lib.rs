//! Execgate Gateway
//!
//! HTTP gateway that accepts uploaded code, tracks each execution request as a
//! job, dispatches jobs to a remote execution engine and reconciles their
//! status.

pub mod api;
pub mod config;
pub mod db;
pub mod service;
pub mod state;
pub mod storage;
pub mod store;

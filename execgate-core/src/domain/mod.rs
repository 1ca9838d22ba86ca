//! Core domain types
//!
//! These types represent the fundamental business entities and are shared between
//! the gateway server (for persistence and orchestration) and its clients.

pub mod execution;
pub mod job;
pub mod project;

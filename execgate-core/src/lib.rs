//! Execgate Core
//!
//! Core types shared by the execgate services.
//!
//! This crate contains:
//! - Domain types: Job, Project, execution attempts and the job state machine rules
//! - DTOs: Request/response shapes of the gateway HTTP API

pub mod domain;
pub mod dto;

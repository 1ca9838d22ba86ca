//! Data Transfer Objects for the gateway HTTP API
//!
//! DTOs are the wire representation of domain entities, shared between the
//! server handlers and the command-line client.

pub mod job;

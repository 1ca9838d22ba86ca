//! Configuration module
//!
//! Handles CLI configuration.

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the gateway service
    pub gateway_url: String,
}

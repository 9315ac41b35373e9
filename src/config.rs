//! Configuration management for Skybridge
//!
//! Configuration is loaded from environment variables.

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Akash Chat base URL (no trailing slash)
    pub akash_base_url: String,

    /// Timeout for each upstream HTTP request (in seconds)
    pub request_timeout_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("SKYBRIDGE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("SKYBRIDGE_PORT")
                .unwrap_or_else(|_| "16571".to_string())
                .parse()
                .context("Invalid SKYBRIDGE_PORT")?,

            akash_base_url: normalize_base_url(
                &env::var("AKASH_BASE_URL")
                    .unwrap_or_else(|_| "https://chat.akash.network".to_string()),
            ),

            request_timeout_seconds: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("Invalid REQUEST_TIMEOUT_SECS")?,
        })
    }
}

/// Strip trailing slashes so URL joins stay predictable
fn normalize_base_url(raw: &str) -> String {
    raw.trim_end_matches('/').to_string()
}

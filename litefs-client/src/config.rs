//! Client configuration and validation
//!
//! Configuration for talking to a LiteFS node: where its HTTP API lives,
//! how long to wait for a connection, and how the primary monitor paces
//! retries after repeated failures.

use std::time::Duration;

use clap::Parser;

/// Default address of the local LiteFS node's HTTP API
pub const DEFAULT_URL: &str = "http://localhost:20202";

/// Path of the event stream relative to the node URL
pub const EVENTS_PATH: &str = "/events";

/// Configuration for the LiteFS client
#[derive(Parser, Debug, Clone)]
#[command(name = "litefs-monitor", about = "Watch the primary status of a LiteFS node")]
pub struct ClientConfig {
    // === Node ===
    /// Base URL of the LiteFS node
    #[arg(long, env = "LITEFS_URL", default_value = DEFAULT_URL)]
    pub url: String,

    /// Connect timeout (ms); the stream itself has no overall timeout
    #[arg(long, env = "LITEFS_CONNECT_TIMEOUT_MS", default_value = "5000")]
    pub connect_timeout_ms: u64,

    // === Monitor retry floor ===
    /// Delay before the second consecutive failed attempt (ms)
    #[arg(long, default_value = "10")]
    pub retry_min_ms: u64,

    /// Max delay between consecutive failed attempts (ms)
    #[arg(long, default_value = "1000")]
    pub retry_max_ms: u64,
}

impl ClientConfig {
    /// Config for a node at `url`, other settings defaulted
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Validate the configuration at startup
    pub fn validate(&self) -> Result<(), String> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(format!("url must start with http:// or https://, got {}", self.url));
        }

        if self.connect_timeout_ms == 0 {
            return Err("connect_timeout_ms must be > 0".to_string());
        }

        if self.retry_min_ms == 0 {
            return Err("retry_min_ms must be > 0".to_string());
        }
        if self.retry_max_ms < self.retry_min_ms {
            return Err("retry_max_ms must be >= retry_min_ms".to_string());
        }

        Ok(())
    }

    /// Full URL of the event stream
    pub fn events_url(&self) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), EVENTS_PATH)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            connect_timeout_ms: 5000,
            retry_min_ms: 10,
            retry_max_ms: 1000,
        }
    }
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Worker configuration.
//!
//! Configuration is read from a TOML file. Only the two service URLs are
//! required; the identifiers may also come from the command line.
//!
//! ```toml
//! event_bridge_url = "wss://events.taskline.invalid/v1/wschannels"
//! api_base_url = "https://api.taskline.invalid/v1"
//! workspace_sid = "WS1"
//! worker_sid = "WK1"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tl_core::BackoffPolicy;

use crate::error::{Error, Result};
use crate::session::SessionConfig;

/// Largest page size the service accepts.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Runtime configuration for one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// WebSocket URL of the event bridge (`ws://` or `wss://`).
    pub event_bridge_url: String,
    /// Base URL of the REST API (`http://` or `https://`).
    pub api_base_url: String,
    #[serde(default)]
    pub workspace_sid: String,
    #[serde(default)]
    pub worker_sid: String,
    /// Close other sessions of this worker when connecting (default: false).
    #[serde(default)]
    pub close_existing_sessions: bool,
    /// First reconnect delay in milliseconds (default: 1000).
    #[serde(default = "default_reconnect_initial_delay_ms")]
    pub reconnect_initial_delay_ms: u64,
    /// Maximum reconnect delay in seconds (default: 30).
    #[serde(default = "default_reconnect_max_delay_secs")]
    pub reconnect_max_delay_secs: u64,
    /// Lower bound of the random delay factor, in (0, 1] (default: 0.8).
    #[serde(default = "default_reconnect_jitter_floor")]
    pub reconnect_jitter_floor: f64,
    /// Liveness check interval in milliseconds (default: 5000).
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Silence in milliseconds after which the connection is dropped
    /// (default: 30000).
    #[serde(default = "default_heartbeat_sleep_after_ms")]
    pub heartbeat_sleep_after_ms: u64,
    /// Seconds before token expiry to ask for a new token (default: 60).
    #[serde(default = "default_token_refresh_margin_secs")]
    pub token_refresh_margin_secs: u64,
    /// Records per page for bulk reads (default: 50).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// REST request timeout in seconds (default: 30).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Write logs here instead of stderr.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

fn default_reconnect_initial_delay_ms() -> u64 {
    1000
}

fn default_reconnect_max_delay_secs() -> u64 {
    30
}

fn default_reconnect_jitter_floor() -> f64 {
    0.8
}

fn default_heartbeat_interval_ms() -> u64 {
    5000
}

fn default_heartbeat_sleep_after_ms() -> u64 {
    30_000
}

fn default_token_refresh_margin_secs() -> u64 {
    60
}

fn default_page_size() -> u32 {
    50
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl WorkerConfig {
    /// Creates a configuration with defaults for everything but the URLs.
    pub fn new(event_bridge_url: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        WorkerConfig {
            event_bridge_url: event_bridge_url.into(),
            api_base_url: api_base_url.into(),
            workspace_sid: String::new(),
            worker_sid: String::new(),
            close_existing_sessions: false,
            reconnect_initial_delay_ms: default_reconnect_initial_delay_ms(),
            reconnect_max_delay_secs: default_reconnect_max_delay_secs(),
            reconnect_jitter_floor: default_reconnect_jitter_floor(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_sleep_after_ms: default_heartbeat_sleep_after_ms(),
            token_refresh_margin_secs: default_token_refresh_margin_secs(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
            log_file: None,
        }
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.event_bridge_url.starts_with("ws://")
            || self.event_bridge_url.starts_with("wss://"))
        {
            return Err(Error::Config(format!(
                "invalid event_bridge_url '{}': must start with ws:// or wss://",
                self.event_bridge_url
            )));
        }
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(Error::Config(format!(
                "invalid api_base_url '{}': must start with http:// or https://",
                self.api_base_url
            )));
        }
        if self.workspace_sid.trim().is_empty() {
            return Err(Error::Config(
                "workspace_sid is required\n  hint: set it in the config file or pass --workspace-sid"
                    .to_string(),
            ));
        }
        if self.worker_sid.trim().is_empty() {
            return Err(Error::Config(
                "worker_sid is required\n  hint: set it in the config file or pass --worker-sid"
                    .to_string(),
            ));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(Error::Config(
                "heartbeat_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.heartbeat_sleep_after_ms < self.heartbeat_interval_ms {
            return Err(Error::Config(format!(
                "heartbeat_sleep_after_ms ({}) must not be below heartbeat_interval_ms ({})",
                self.heartbeat_sleep_after_ms, self.heartbeat_interval_ms
            )));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        self.backoff()?;
        Ok(())
    }

    /// The reconnect backoff policy.
    pub fn backoff(&self) -> Result<BackoffPolicy> {
        BackoffPolicy::new(
            Duration::from_millis(self.reconnect_initial_delay_ms),
            Duration::from_secs(self.reconnect_max_delay_secs),
            self.reconnect_jitter_floor,
        )
        .map_err(|e| Error::Config(format!("reconnect settings: {}", e)))
    }

    /// The signaling session settings.
    pub fn session_config(&self) -> Result<SessionConfig> {
        Ok(SessionConfig {
            url: self.event_bridge_url.clone(),
            worker_sid: self.worker_sid.clone(),
            close_existing_sessions: self.close_existing_sessions,
            backoff: self.backoff()?,
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
            sleep_after: Duration::from_millis(self.heartbeat_sleep_after_ms),
            token_refresh_margin: Duration::from_secs(self.token_refresh_margin_secs),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

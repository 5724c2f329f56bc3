//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - config.toml (default configuration)
//! - config.local.toml (git-ignored local overrides)
//! - Environment variables (INFLUX_BRIDGE_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # config.toml
//! [client]
//! batch_actions = 1000
//! flush_interval_ms = 1000
//!
//! [schema]
//! default_schema = "sys"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! INFLUX_BRIDGE_CLIENT__REQUEST_TIMEOUT_MS=5000
//! INFLUX_BRIDGE_SCHEMA__DEFAULT_SCHEMA=metrics
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ENV_PREFIX: &str = "INFLUX_BRIDGE_";

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Per-client transport and batching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Lines buffered before the background flusher writes a batch
    #[serde(default = "default_batch_actions")]
    pub batch_actions: usize,

    /// Maximum time a buffered line waits before being flushed
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Capacity of the channel feeding the flusher. Enqueue waits when full.
    #[serde(default = "default_buffer_limit")]
    pub buffer_limit: usize,

    /// Whole-request timeout for write and query calls. 0 = no timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// TCP connect timeout. 0 = no timeout.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// Schema (database) selection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Database used when a request does not name one
    #[serde(default = "default_schema")]
    pub default_schema: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_batch_actions() -> usize {
    1000
}
fn default_flush_interval_ms() -> u64 {
    1000
}
fn default_buffer_limit() -> usize {
    10_000
}
fn default_request_timeout_ms() -> u64 {
    30_000
}
fn default_connect_timeout_ms() -> u64 {
    10_000
}
fn default_schema() -> String {
    "sys".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. config.toml (base configuration)
    /// 2. config.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (INFLUX_BRIDGE_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("config.toml"))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    /// Load configuration from specific file path
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            client: ClientConfig::default(),
            schema: SchemaConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl LoggingConfig {
    /// Whether events are written as JSON lines
    pub fn is_json(&self) -> bool {
        self.format.trim().eq_ignore_ascii_case("json")
    }

    /// `EnvFilter` directive for the configured level. Blank means "info".
    pub fn filter_directive(&self) -> &str {
        match self.level.trim() {
            "" => "info",
            level => level,
        }
    }
}

impl ClientConfig {
    /// Flush interval as a `Duration`, never zero so the flusher timer stays valid
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_ms > 0).then(|| Duration::from_millis(self.connect_timeout_ms))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            batch_actions: default_batch_actions(),
            flush_interval_ms: default_flush_interval_ms(),
            buffer_limit: default_buffer_limit(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        SchemaConfig {
            default_schema: default_schema(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

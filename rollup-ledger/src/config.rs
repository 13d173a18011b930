//! Configuration for the rollup ledger

use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Default rollup host endpoint
pub const DEFAULT_HOST_URL: &str = "http://127.0.0.1:5004";

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Rollup host connection
    pub host: HostConfig,

    /// Request loop settings
    pub polling: PollingConfig,

    /// Deposit acceptance
    pub deposit: DepositConfig,

    /// Log output
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "rollup-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            host: HostConfig::default(),
            polling: PollingConfig::default(),
            deposit: DepositConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Rollup host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Base URL of the host HTTP API
    pub url: String,

    /// Per-call timeout (milliseconds); no timeout when unset
    pub request_timeout_ms: Option<u64>,

    /// What a failed notice/report/voucher does to the request
    pub emit_failure_policy: EmitFailurePolicy,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_HOST_URL.to_string(),
            request_timeout_ms: None,
            emit_failure_policy: EmitFailurePolicy::Log,
        }
    }
}

impl HostConfig {
    /// Per-call timeout, if any
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

/// Handling of failed output calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmitFailurePolicy {
    /// Log and keep the request outcome
    Log,
    /// Reject the request and roll its writes back
    Propagate,
}

impl FromStr for EmitFailurePolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "log" => Ok(EmitFailurePolicy::Log),
            "propagate" => Ok(EmitFailurePolicy::Propagate),
            other => Err(crate::Error::Config(format!(
                "Unknown emit failure policy: {}",
                other
            ))),
        }
    }
}

/// Request loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Wait after a "no input" answer (milliseconds)
    pub backoff_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            backoff_ms: 1_000,
        }
    }
}

impl PollingConfig {
    /// Backoff as a duration
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Deposit configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DepositConfig {
    /// Only sender allowed to push binary deposits; any sender when unset
    pub trusted_sender: Option<Address>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,

    /// Filter used when `RUST_LOG` is not set
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            json: false,
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load the file named by `ROLLUP_CONFIG` if set, then apply environment overrides
    pub fn load() -> crate::Result<Self> {
        let mut config = match std::env::var("ROLLUP_CONFIG") {
            Ok(path) => Config::from_file(path)?,
            Err(_) => Config::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from environment variables
    pub fn apply_env(&mut self) -> crate::Result<()> {
        if let Ok(url) = std::env::var("ROLLUP_HTTP_SERVER_URL") {
            self.host.url = url;
        }

        if let Ok(ms) = std::env::var("ROLLUP_POLL_BACKOFF_MS") {
            self.polling.backoff_ms = ms
                .parse()
                .map_err(|e| crate::Error::Config(format!("ROLLUP_POLL_BACKOFF_MS: {}", e)))?;
        }

        if let Ok(ms) = std::env::var("ROLLUP_REQUEST_TIMEOUT_MS") {
            let ms = ms
                .parse()
                .map_err(|e| crate::Error::Config(format!("ROLLUP_REQUEST_TIMEOUT_MS: {}", e)))?;
            self.host.request_timeout_ms = Some(ms);
        }

        if let Ok(policy) = std::env::var("ROLLUP_EMIT_FAILURE_POLICY") {
            self.host.emit_failure_policy = policy.parse()?;
        }

        if let Ok(sender) = std::env::var("ROLLUP_TRUSTED_DEPOSIT_SENDER") {
            self.deposit.trusted_sender = Some(sender.parse()?);
        }

        if let Ok(json) = std::env::var("ROLLUP_LOG_JSON") {
            self.log.json = matches!(json.as_str(), "1" | "true" | "yes");
        }

        Ok(())
    }

    /// Check values the loop relies on
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.host.url.starts_with("http://") || self.host.url.starts_with("https://")) {
            return Err(crate::Error::Config(format!(
                "Host URL must be http(s): {}",
                self.host.url
            )));
        }
        if self.host.request_timeout_ms == Some(0) {
            return Err(crate::Error::Config(
                "Request timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

//! # Runtime Configuration
//!
//! Operational settings for pollers, lifecycle retry, pooled splitters, the
//! management bridge, message metrics and logging. Every field has a default,
//! so an empty configuration source yields a working runtime.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use integration_runtime::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // runtime.toml plus runtime.<env>.toml from ./config, then RUNTIME__* overrides
//! let config = ConfigLoader::load_from_directory("config")?;
//!
//! let interval = config.poller.interval();
//! let workers = config.splitter.max_threads;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::defaults;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub poller: PollerConfig,
    pub retry: RetryConfig,
    pub splitter: SplitterConfig,
    pub management: ManagementConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

impl RuntimeConfig {
    /// Check values that deserialize fine but cannot drive a runtime
    pub fn validate(&self) -> ConfigResult<()> {
        if self.poller.interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "poller.interval_ms",
                "0",
                "poll interval must be positive",
            ));
        }
        if self.retry.max_retries < defaults::INFINITE_RETRIES {
            return Err(ConfigurationError::invalid_value(
                "retry.max_retries",
                self.retry.max_retries.to_string(),
                "use -1 for unlimited retries",
            ));
        }
        if self.splitter.max_threads == 0 {
            return Err(ConfigurationError::invalid_value(
                "splitter.max_threads",
                "0",
                "a pooled splitter needs at least one worker",
            ));
        }
        if self.management.reply_poll_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "management.reply_poll_interval_ms",
                "0",
                "reply poll interval must be positive",
            ));
        }
        if self.metrics.enabled && (self.metrics.max_slices == 0 || self.metrics.slice_duration_secs == 0) {
            return Err(ConfigurationError::validation_error(
                "enabled metrics need a positive slice duration and slice count",
            ));
        }
        Ok(())
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub interval_ms: u64,
    pub initial_delay_ms: u64,
    pub shutdown_wait_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: millis(defaults::POLL_INTERVAL),
            initial_delay_ms: millis(defaults::POLL_INITIAL_DELAY),
            shutdown_wait_ms: millis(defaults::SHUTDOWN_WAIT),
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn shutdown_wait(&self) -> Duration {
        Duration::from_millis(self.shutdown_wait_ms)
    }
}

/// Settings for `WorkflowRetryAndContinue`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt; -1 retries without limit
    pub max_retries: i32,
    pub wait_between_retries_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: defaults::MAX_RETRIES,
            wait_between_retries_ms: millis(defaults::WAIT_BETWEEN_RETRIES),
        }
    }
}

impl RetryConfig {
    pub fn wait_between_retries(&self) -> Duration {
        Duration::from_millis(self.wait_between_retries_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    pub max_threads: usize,
    pub borrow_timeout_ms: u64,
    pub shutdown_wait_ms: u64,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            max_threads: defaults::SPLITTER_MAX_THREADS,
            borrow_timeout_ms: millis(defaults::POOL_BORROW_TIMEOUT),
            shutdown_wait_ms: millis(defaults::SHUTDOWN_WAIT),
        }
    }
}

impl SplitterConfig {
    pub fn borrow_timeout(&self) -> Duration {
        Duration::from_millis(self.borrow_timeout_ms)
    }

    pub fn shutdown_wait(&self) -> Duration {
        Duration::from_millis(self.shutdown_wait_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagementConfig {
    pub reply_wait_ms: u64,
    pub reply_poll_interval_ms: u64,
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self {
            reply_wait_ms: millis(defaults::MAX_REPLY_WAIT),
            reply_poll_interval_ms: millis(defaults::REPLY_POLL_INTERVAL),
        }
    }
}

impl ManagementConfig {
    pub fn reply_wait(&self) -> Duration {
        Duration::from_millis(self.reply_wait_ms)
    }

    pub fn reply_poll_interval(&self) -> Duration {
        Duration::from_millis(self.reply_poll_interval_ms)
    }
}

/// Message metrics attached to every workflow unless disabled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub slice_duration_secs: u64,
    pub max_slices: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            slice_duration_secs: defaults::METRICS_SLICE_DURATION.as_secs(),
            max_slices: defaults::METRICS_MAX_SLICES,
        }
    }
}

impl MetricsConfig {
    pub fn slice_duration(&self) -> Duration {
        Duration::from_secs(self.slice_duration_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive; the environment's default level when unset
    pub level: Option<String>,
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_runtime_constants() {
        let config = RuntimeConfig::default();
        assert_eq!(config.poller.interval(), Duration::from_secs(20));
        assert_eq!(config.poller.initial_delay(), Duration::from_millis(100));
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.wait_between_retries(), Duration::from_secs(10));
        assert_eq!(config.splitter.max_threads, 10);
        assert_eq!(config.management.reply_poll_interval(), Duration::from_millis(50));
        assert_eq!(config.metrics.slice_duration(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_workers() {
        let mut config = RuntimeConfig::default();
        config.splitter.max_threads = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validation_accepts_unlimited_retries_only() {
        let mut config = RuntimeConfig::default();
        config.retry.max_retries = -1;
        assert!(config.validate().is_ok());
        config.retry.max_retries = -2;
        assert!(config.validate().is_err());
    }
}

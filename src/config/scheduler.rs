//! Scheduler configuration structures.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::RetryPolicy;

/// Environment variable naming a JSON configuration file.
pub const CONFIG_ENV: &str = "PLUGIN_SCHEDULER_CONFIG";

const SUBSCRIBE_RETRY: RetryConfig = RetryConfig {
    attempts: 3,
    delay_secs: 5,
};

const QUERY_RETRY: RetryConfig = RetryConfig {
    attempts: 3,
    delay_secs: 2,
};

/// Bounded retry settings for store connectivity.
///
/// Fields left out of an engine section keep that section's own default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts before the process gives up.
    pub attempts: u32,
    /// Seconds to sleep between attempts.
    pub delay_secs: u64,
}

impl RetryConfig {
    /// Convert into a runtime retry policy.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.attempts, Duration::from_secs(self.delay_secs))
    }

    fn validate(&self) -> Result<(), String> {
        if self.attempts == 0 {
            return Err("attempts must be greater than 0".into());
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct PartialRetry {
    attempts: Option<u32>,
    delay_secs: Option<u64>,
}

impl PartialRetry {
    fn over(self, base: RetryConfig) -> RetryConfig {
        RetryConfig {
            attempts: self.attempts.unwrap_or(base.attempts),
            delay_secs: self.delay_secs.unwrap_or(base.delay_secs),
        }
    }
}

fn subscribe_retry<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RetryConfig, D::Error> {
    PartialRetry::deserialize(deserializer).map(|partial| partial.over(SUBSCRIBE_RETRY))
}

fn query_retry<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RetryConfig, D::Error> {
    PartialRetry::deserialize(deserializer).map(|partial| partial.over(QUERY_RETRY))
}

/// Event queue engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Queue target name this engine consumes.
    pub target: String,
    /// Seconds between regular queue checks.
    pub check_interval_secs: u64,
    /// Retry settings for the notification subscription.
    #[serde(deserialize_with = "subscribe_retry")]
    pub subscribe_retry: RetryConfig,
    /// Retry settings for queue queries.
    #[serde(deserialize_with = "query_retry")]
    pub query_retry: RetryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target: "eventEngine".into(),
            check_interval_secs: 30,
            subscribe_retry: SUBSCRIBE_RETRY,
            query_retry: QUERY_RETRY,
        }
    }
}

impl EngineConfig {
    /// Interval between regular queue checks.
    #[must_use]
    pub const fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Validate engine configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.target.trim().is_empty() {
            return Err("target must not be empty".into());
        }
        if self.check_interval_secs == 0 {
            return Err("check_interval_secs must be greater than 0".into());
        }
        self.subscribe_retry
            .validate()
            .map_err(|e| format!("subscribe_retry: {e}"))?;
        self.query_retry
            .validate()
            .map_err(|e| format!("query_retry: {e}"))
    }
}

/// Poll scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Seconds between the end of one run and the start of the next.
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_secs: 10 }
    }
}

impl PollConfig {
    /// Interval measured from end of run.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Validate poll configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.interval_secs == 0 {
            return Err("interval_secs must be greater than 0".into());
        }
        Ok(())
    }
}

/// Root scheduler configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Event engine settings.
    pub engine: EngineConfig,
    /// Poll scheduler settings.
    pub poll: PollConfig,
    /// Optional tracing filter directives, e.g. `info,plugin_scheduler=debug`.
    pub log_filter: Option<String>,
}

impl SchedulerConfig {
    /// Validate all sections.
    pub fn validate(&self) -> Result<(), String> {
        self.engine
            .validate()
            .map_err(|e| format!("engine invalid: {e}"))?;
        self.poll.validate().map_err(|e| format!("poll invalid: {e}"))
    }

    /// Parse scheduler configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and validate a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        Self::from_json_str(&raw)
    }

    /// Load `.env`, then the file named by [`CONFIG_ENV`] if set, else defaults.
    pub fn load() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_path(path),
            Err(_) => {
                let cfg = Self::default();
                cfg.validate()?;
                Ok(cfg)
            }
        }
    }
}

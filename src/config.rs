//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults. The store endpoint and credential have no
//! defaults; the agent refuses to start without them.

use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::retry::RetryPolicy;

/// Errors raised while reading configuration from the environment
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// An environment variable is set but could not be parsed
    #[error("invalid value for {var}: {value:?}")]
    Invalid {
        /// Name of the offending variable
        var: &'static str,
        /// The raw value that failed to parse
        value: String,
    },
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Backing store configuration
    pub store: StoreConfig,
    /// Identity configuration
    pub agent: AgentConfig,
    /// Polling loop configuration
    pub poll: PollConfig,
    /// Script execution configuration
    pub execution: ExecutionConfig,
    /// Retry behavior for transient store failures
    pub retry: RetryConfig,
}

/// Backing store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the store endpoint
    pub url: String,
    /// Access credential sent with every store request
    pub key: String,
    /// Per-request HTTP timeout (in seconds)
    pub http_timeout_secs: u64,
}

/// Identity configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Display name registered with the store
    pub name: String,
}

/// Polling loop configuration
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Pause between the end of one cycle and the start of the next
    /// (in seconds)
    pub interval_secs: u64,
}

/// Script execution configuration
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Upper bound on a single script execution (in seconds)
    pub script_timeout_secs: u64,
    /// How long a claim on a job remains valid before other instances may
    /// reclaim it (in seconds). Must outlive one script execution.
    pub claim_ttl_secs: u64,
}

/// Retry behavior for transient store failures
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts per store operation, including the first
    pub max_attempts: u32,
    /// Delay before the first retry (in milliseconds)
    pub base_delay_ms: u64,
    /// Cap on the backoff delay (in milliseconds)
    pub max_delay_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// `STORE_URL` and `STORE_KEY` are required; everything else has a
    /// default. The agent name falls back to the machine's `HOSTNAME`.
    ///
    /// # Errors
    /// * `ConfigError::Missing` if a required variable is absent
    /// * `ConfigError::Invalid` if a numeric variable fails to parse
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store: StoreConfig {
                url: require("STORE_URL")?,
                key: require("STORE_KEY")?,
                http_timeout_secs: parse_var("STORE_HTTP_TIMEOUT_SECS", 30)?,
            },
            agent: AgentConfig {
                name: env::var("AGENT_NAME")
                    .or_else(|_| env::var("HOSTNAME"))
                    .unwrap_or_else(|_| "outpost-agent".to_string()),
            },
            poll: PollConfig {
                interval_secs: parse_var("POLL_INTERVAL_SECS", 10)?,
            },
            execution: ExecutionConfig {
                script_timeout_secs: parse_var("SCRIPT_TIMEOUT_SECS", 300)?,
                claim_ttl_secs: parse_var("CLAIM_TTL_SECS", 600)?,
            },
            retry: RetryConfig {
                max_attempts: parse_var("STORE_RETRY_MAX_ATTEMPTS", 4)?,
                base_delay_ms: parse_var("STORE_RETRY_BASE_DELAY_MS", 250)?,
                max_delay_ms: parse_var("STORE_RETRY_MAX_DELAY_MS", 5000)?,
            },
        })
    }

    /// Pause between polling cycles
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll.interval_secs)
    }

    /// Upper bound on a single script execution
    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.execution.script_timeout_secs)
    }

    /// Lifetime of a job claim
    pub fn claim_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.execution.claim_ttl_secs as i64)
    }

    /// Retry policy derived from the retry configuration
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }
}

fn require(var: &'static str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(var)),
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

//! Retrieval configuration with layered loading.
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: hardcoded in the `Default` implementations below
//! 2. **Config file**: TOML file specified by the `VAPORMAIL_CONFIG` env var
//! 3. **Environment variables**: `VAPORMAIL_*` vars override specific fields
//!    (nested fields use `__`, e.g. `VAPORMAIL_POLL__SHORT_DELAY_MS`)
//!
//! Configuration is validated at load time; invalid combinations (zero
//! timeouts, a short poll delay longer than the long one) return errors
//! rather than failing silently at runtime.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors produced while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The underlying config source could not be read or deserialized.
    #[error(transparent)]
    Source(#[from] config::ConfigError),

    /// The configuration deserialized but fails a consistency check.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration for the retrieval layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Upstream mirror base addresses. All are functionally identical; any may
    /// be blocked independently. Defaults to the service's three public
    /// mirrors.
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// Timeout for a direct (non-relayed) call in milliseconds. Direct access
    /// is cheap when unblocked, so this is kept short. Defaults to `3000`.
    #[serde(default = "default_direct_timeout_ms")]
    pub direct_timeout_ms: u64,

    /// Per-call timeout for relayed calls in milliseconds. Relays add a hop,
    /// so this is more generous. Defaults to `10000`.
    #[serde(default = "default_relay_timeout_ms")]
    pub relay_timeout_ms: u64,

    /// Maximum concurrent outbound HTTP calls. Defaults to `16`.
    #[serde(default = "default_concurrent_limit")]
    pub concurrent_limit: usize,

    /// Health-score penalty applied when a logical request exhausts every
    /// path. Defaults to `20`.
    #[serde(default = "default_failure_penalty")]
    pub failure_penalty: u8,

    /// Poll cadence settings.
    #[serde(default)]
    pub poll: PollConfig,
}

fn default_endpoints() -> Vec<String> {
    vec![
        "https://www.1secmail.com/api/v1/".to_string(),
        "https://www.1secmail.org/api/v1/".to_string(),
        "https://www.1secmail.net/api/v1/".to_string(),
    ]
}

fn default_direct_timeout_ms() -> u64 {
    3_000
}

fn default_relay_timeout_ms() -> u64 {
    10_000
}

fn default_concurrent_limit() -> usize {
    16
}

fn default_failure_penalty() -> u8 {
    20
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            direct_timeout_ms: default_direct_timeout_ms(),
            relay_timeout_ms: default_relay_timeout_ms(),
            concurrent_limit: default_concurrent_limit(),
            failure_penalty: default_failure_penalty(),
            poll: PollConfig::default(),
        }
    }
}

impl RetrievalConfig {
    /// Loads configuration from defaults, an optional TOML file pointed at by
    /// `VAPORMAIL_CONFIG`, and `VAPORMAIL_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a source cannot be read or the resulting
    /// configuration fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Ok(path) = std::env::var("VAPORMAIL_CONFIG") {
            builder = builder.add_source(File::with_name(&path).required(false));
        }

        let loaded: Self = builder
            .add_source(Environment::with_prefix("VAPORMAIL").separator("__"))
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Checks the configuration for internally inconsistent values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first failed check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::Invalid("at least one endpoint is required".to_string()));
        }
        for endpoint in &self.endpoints {
            if !endpoint.starts_with("http") {
                return Err(ConfigError::Invalid(format!(
                    "endpoint must be an http(s) URL: {endpoint}"
                )));
            }
        }
        if self.direct_timeout_ms == 0 || self.relay_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be non-zero".to_string()));
        }
        if self.concurrent_limit == 0 {
            return Err(ConfigError::Invalid("concurrent_limit must be non-zero".to_string()));
        }
        if self.failure_penalty == 0 {
            return Err(ConfigError::Invalid("failure_penalty must be non-zero".to_string()));
        }
        self.poll.validate()
    }

    /// Timeout for direct calls.
    #[must_use]
    pub fn direct_timeout(&self) -> Duration {
        Duration::from_millis(self.direct_timeout_ms)
    }

    /// Per-call timeout for relayed calls.
    #[must_use]
    pub fn relay_timeout(&self) -> Duration {
        Duration::from_millis(self.relay_timeout_ms)
    }
}

/// Poll cadence configuration.
///
/// The delay between background inbox checks must increase monotonically with
/// the consecutive-failure streak: a streak above
/// `long_delay_failure_threshold` switches from the short to the long delay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between polls while the connection is healthy, in milliseconds.
    /// Defaults to `10000`.
    #[serde(default = "default_short_delay_ms")]
    pub short_delay_ms: u64,

    /// Delay between polls during a failure streak, in milliseconds.
    /// Defaults to `25000`.
    #[serde(default = "default_long_delay_ms")]
    pub long_delay_ms: u64,

    /// Consecutive-failure count above which the long delay applies.
    /// Defaults to `2`.
    #[serde(default = "default_long_delay_failure_threshold")]
    pub long_delay_failure_threshold: u32,

    /// Consecutive background failures required before an error is surfaced
    /// to the user. Isolated failures below this are swallowed to avoid
    /// flicker. Forced (user-initiated) failures always surface. Defaults to
    /// `2`.
    #[serde(default = "default_surface_failure_threshold")]
    pub surface_failure_threshold: u32,
}

fn default_short_delay_ms() -> u64 {
    10_000
}

fn default_long_delay_ms() -> u64 {
    25_000
}

fn default_long_delay_failure_threshold() -> u32 {
    2
}

fn default_surface_failure_threshold() -> u32 {
    2
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            short_delay_ms: default_short_delay_ms(),
            long_delay_ms: default_long_delay_ms(),
            long_delay_failure_threshold: default_long_delay_failure_threshold(),
            surface_failure_threshold: default_surface_failure_threshold(),
        }
    }
}

impl PollConfig {
    /// Picks the poll delay for the given consecutive-failure streak.
    #[must_use]
    pub fn delay_for_streak(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures > self.long_delay_failure_threshold {
            Duration::from_millis(self.long_delay_ms)
        } else {
            Duration::from_millis(self.short_delay_ms)
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.short_delay_ms == 0 || self.long_delay_ms == 0 {
            return Err(ConfigError::Invalid("poll delays must be non-zero".to_string()));
        }
        if self.long_delay_ms < self.short_delay_ms {
            return Err(ConfigError::Invalid(
                "long poll delay must not be shorter than the short delay".to_string(),
            ));
        }
        Ok(())
    }
}

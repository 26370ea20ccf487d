//! Queue configuration.
//!
//! [`Config`] is plain data: load it from TOML, from `WORKQ_*` environment
//! variables, or take the defaults. [`Options`] adds the collaborators that
//! cannot be deserialized (hooks, a custom limiter) when building a queue.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::callback::{Callback, NopCallback};
use crate::error::{Error, Result};
use crate::limiter::{DEFAULT_BURST, DEFAULT_RATE, RateLimiter};

/// Default delay heartbeat and priority sort window.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Smallest heartbeat, window or backoff accepted; shorter values are raised to it.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Default wait before a delayed item rejected as a duplicate is retried.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Delay loop wake-up interval when nothing is due sooner.
    pub heartbeat_ms: u64,
    /// Priority loop batch interval.
    pub sort_window_ms: u64,
    /// Re-push delay for delayed items that collide with a queued duplicate.
    pub retry_backoff_ms: u64,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Tokens per second.
    pub rate: f64,
    /// Bucket capacity.
    pub burst: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            heartbeat_ms: DEFAULT_INTERVAL.as_millis() as u64,
            sort_window_ms: DEFAULT_INTERVAL.as_millis() as u64,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF.as_millis() as u64,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            burst: DEFAULT_BURST,
        }
    }
}

impl Config {
    pub fn heartbeat(&self) -> Duration {
        clamp_interval(self.heartbeat_ms, DEFAULT_INTERVAL)
    }

    pub fn sort_window(&self) -> Duration {
        clamp_interval(self.sort_window_ms, DEFAULT_INTERVAL)
    }

    pub fn retry_backoff(&self) -> Duration {
        clamp_interval(self.retry_backoff_ms, DEFAULT_RETRY_BACKOFF)
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(s).map_err(|e| Error::Config(format!("bad queue config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read queue config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults overridden by whichever `WORKQ_*` variables are set.
    ///
    /// Recognized: `WORKQ_HEARTBEAT_MS`, `WORKQ_SORT_WINDOW_MS`,
    /// `WORKQ_RETRY_BACKOFF_MS`, `WORKQ_RATE`, `WORKQ_BURST`. A variable
    /// that is set but unparseable is an error, not a silent default.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(v) = optional_var("WORKQ_HEARTBEAT_MS")? {
            config.heartbeat_ms = v;
        }
        if let Some(v) = optional_var("WORKQ_SORT_WINDOW_MS")? {
            config.sort_window_ms = v;
        }
        if let Some(v) = optional_var("WORKQ_RETRY_BACKOFF_MS")? {
            config.retry_backoff_ms = v;
        }
        if let Some(v) = optional_var("WORKQ_RATE")? {
            config.rate_limit.rate = v;
        }
        if let Some(v) = optional_var("WORKQ_BURST")? {
            config.rate_limit.burst = v;
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let rate = self.rate_limit.rate;
        if !rate.is_finite() || rate < 0.0 {
            return Err(Error::Config(format!(
                "rate_limit.rate must be a non-negative number, got {rate}"
            )));
        }
        Ok(())
    }
}

/// Zero means "use the default"; anything else is raised to [`MIN_INTERVAL`].
fn clamp_interval(ms: u64, default: Duration) -> Duration {
    if ms == 0 {
        default
    } else {
        Duration::from_millis(ms).max(MIN_INTERVAL)
    }
}

fn optional_var<V>(name: &str) -> Result<Option<V>>
where
    V: FromStr,
    V::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("environment variable {name}={raw:?}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Everything a queue constructor takes.
pub struct Options<T> {
    pub config: Config,
    pub callback: Arc<dyn Callback<T>>,
    /// `None` builds a token bucket from `config.rate_limit`. Ignored by
    /// layers that do not rate-limit.
    pub limiter: Option<Arc<dyn RateLimiter<T>>>,
}

impl<T> Default for Options<T> {
    fn default() -> Self {
        Self {
            config: Config::default(),
            callback: Arc::new(NopCallback),
            limiter: None,
        }
    }
}

impl<T> From<Config> for Options<T> {
    fn from(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }
}

impl<T> std::fmt::Debug for Options<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("config", &self.config)
            .field("limiter", &self.limiter.is_some())
            .finish_non_exhaustive()
    }
}

// Configuration for the favorite synchronization layer.
//
// Sources, highest priority first:
// 1. Environment variables (FAVSYNC_*)
// 2. TOML config contents handed in by the host
// 3. Built-in defaults

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration for the synchronization layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub debounce: DebounceConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: DebounceConfig::default(),
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Debounce window applied to repeated toggles of the same product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebounceConfig {
    pub delay_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self { delay_ms: 300 }
    }
}

impl DebounceConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Expiry window for cached favorite state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
        }
    }
}

impl CacheConfig {
    pub fn ttl_ms(&self) -> i64 {
        (self.ttl_secs as i64).saturating_mul(1_000)
    }
}

/// Retry ceiling and backoff shape for favorite mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    #[serde(default = "default_jitter_ratio")]
    pub jitter_ratio: f64,
}

fn default_jitter_ratio() -> f64 {
    0.10
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter_ratio: default_jitter_ratio(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            jitter_ratio: self.jitter_ratio,
        }
    }
}

impl SyncConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Self {
        fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
            std::env::var(key).ok()?.parse().ok()
        }

        let mut config = Self::default();
        if let Some(delay_ms) = parse_env("FAVSYNC_DEBOUNCE_MS") {
            config.debounce.delay_ms = delay_ms;
        }
        if let Some(ttl_secs) = parse_env("FAVSYNC_CACHE_TTL_SECS") {
            config.cache.ttl_secs = ttl_secs;
        }
        if let Some(max_attempts) = parse_env("FAVSYNC_MAX_RETRIES") {
            config.retry.max_attempts = max_attempts;
        }
        if let Some(base_ms) = parse_env("FAVSYNC_RETRY_BASE_MS") {
            config.retry.base_delay_ms = base_ms;
        }
        if let Some(max_ms) = parse_env("FAVSYNC_RETRY_MAX_MS") {
            config.retry.max_delay_ms = max_ms;
        }
        config
    }

    /// Parse TOML contents and validate.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce.delay_ms == 0 {
            return Err(ConfigError::Invalid(
                "debounce.delay_ms must be positive".into(),
            ));
        }
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::Invalid("cache.ttl_secs must be positive".into()));
        }
        if self.retry.base_delay_ms == 0 {
            return Err(ConfigError::Invalid(
                "retry.base_delay_ms must be positive".into(),
            ));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ConfigError::Invalid(
                "retry.max_delay_ms must be >= retry.base_delay_ms".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.retry.jitter_ratio) {
            return Err(ConfigError::Invalid(
                "retry.jitter_ratio must be in [0, 1)".into(),
            ));
        }
        Ok(())
    }
}

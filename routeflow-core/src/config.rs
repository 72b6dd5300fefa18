//! Engine configuration.
//!
//! Replaces module-global settings with an explicit struct handed to the
//! optimizer at construction. All values are read-only after process
//! start. [`EngineConfig::from_env`] reads the documented environment
//! variables and falls back to defaults on malformed values, logging the
//! rejects.

use std::env;
use std::time::Duration;

/// Configuration for the optimization engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Secret for the external distance-matrix provider; required for API
    /// mode.
    pub google_maps_api_key: Option<String>,
    /// Whether matrix builds consult the external provider when the
    /// request does not say.
    pub use_api_by_default: bool,
    /// Attempts against the provider before falling back to Haversine.
    pub max_retries: u32,
    /// Multiplier applied to the retry delay after each failed attempt.
    pub backoff_factor: f64,
    /// Delay before the first retry.
    pub retry_delay: Duration,
    /// Lifetime of cached distance matrices.
    pub cache_expiry: Duration,
    /// Lifetime of cached whole-solve results.
    pub result_cache_timeout: Duration,
    /// Suppresses external API calls and uses deterministic fallbacks.
    pub testing: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            google_maps_api_key: None,
            use_api_by_default: false,
            max_retries: 3,
            backoff_factor: 2.0,
            retry_delay: Duration::from_secs(1),
            cache_expiry: Duration::from_secs(30 * 24 * 60 * 60),
            result_cache_timeout: Duration::from_secs(3600),
            testing: false,
        }
    }
}

impl EngineConfig {
    /// Reads configuration from the process environment.
    ///
    /// Recognised variables: `GOOGLE_MAPS_API_KEY`, `USE_API_BY_DEFAULT`,
    /// `MAX_RETRIES`, `BACKOFF_FACTOR`, `RETRY_DELAY_SECONDS`,
    /// `CACHE_EXPIRY_DAYS`, `OPTIMIZATION_RESULT_CACHE_TIMEOUT`, and
    /// `TESTING`.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            google_maps_api_key: env::var("GOOGLE_MAPS_API_KEY").ok().filter(|key| !key.is_empty()),
            use_api_by_default: env_bool("USE_API_BY_DEFAULT", defaults.use_api_by_default),
            max_retries: env_parsed("MAX_RETRIES", defaults.max_retries),
            backoff_factor: env_parsed("BACKOFF_FACTOR", defaults.backoff_factor),
            retry_delay: Duration::from_secs(env_parsed("RETRY_DELAY_SECONDS", 1)),
            cache_expiry: Duration::from_secs(
                env_parsed("CACHE_EXPIRY_DAYS", 30_u64) * 24 * 60 * 60,
            ),
            result_cache_timeout: Duration::from_secs(env_parsed(
                "OPTIMIZATION_RESULT_CACHE_TIMEOUT",
                3600,
            )),
            testing: env_bool("TESTING", defaults.testing),
        }
    }

    /// Enables testing mode, suppressing external API calls.
    #[must_use]
    pub fn for_testing(mut self) -> Self {
        self.testing = true;
        self
    }

    /// Whether a build may reach the external provider: an explicit
    /// request wins, then the configured default; testing mode vetoes
    /// both.
    #[must_use]
    pub fn resolve_use_api(&self, requested: Option<bool>) -> bool {
        if self.testing {
            return false;
        }
        requested.unwrap_or(self.use_api_by_default)
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(raw) => matches!(raw.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}

fn env_parsed<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("ignoring malformed {name}={raw:?}");
            default
        }),
        Err(_) => default,
    }
}

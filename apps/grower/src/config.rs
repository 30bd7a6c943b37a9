//! # Configuration
//!
//! `grower.toml` plus environment overrides.
//!
//! Precedence, lowest to highest: built-in defaults, the TOML file,
//! `GROWER_*` environment variables, CLI flags (applied by the caller).
//!
//! ```toml
//! [run]
//! max_ticks = 10000
//! max_retries = 3
//! tick_timeout_ms = 5000   # 0 disables the per-tick timeout
//! retry_backoff_ms = 100
//!
//! [handlers]
//! seed = 42                # fixed seed for the `random` handler
//! ```

use grower_core::GrowerError;
use grower_core::RunPolicy;
use grower_core::primitives::{DEFAULT_MAX_RETRIES, DEFAULT_MAX_TICKS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Default per-tick timeout.
pub const DEFAULT_TICK_TIMEOUT_MS: u64 = 5_000;

/// Default pause before retrying a failed tick.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 100;

/// Environment variable names.
pub const ENV_MAX_TICKS: &str = "GROWER_MAX_TICKS";
pub const ENV_MAX_RETRIES: &str = "GROWER_MAX_RETRIES";
pub const ENV_TICK_TIMEOUT_MS: &str = "GROWER_TICK_TIMEOUT_MS";
pub const ENV_SEED: &str = "GROWER_SEED";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GrowerConfig {
    /// Driver limits.
    pub run: RunConfig,
    /// Built-in handler settings.
    pub handlers: HandlersConfig,
}

/// `[run]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub max_ticks: u64,
    pub max_retries: u32,
    pub tick_timeout_ms: u64,
    pub retry_backoff_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_ticks: DEFAULT_MAX_TICKS,
            max_retries: DEFAULT_MAX_RETRIES,
            tick_timeout_ms: DEFAULT_TICK_TIMEOUT_MS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

/// `[handlers]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandlersConfig {
    /// Seed for the `random` handler; entropy when unset.
    pub seed: Option<u64>,
}

impl GrowerConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, GrowerError> {
        toml::from_str(text).map_err(|e| GrowerError::ConfigError(e.to_string()))
    }

    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, GrowerError> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            GrowerError::ConfigError(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply `GROWER_*` overrides from the process environment.
    pub fn with_env(self) -> Result<Self, GrowerError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, GrowerError> {
        if let Some(v) = parse_var(&lookup, ENV_MAX_TICKS)? {
            self.run.max_ticks = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_MAX_RETRIES)? {
            self.run.max_retries = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_TICK_TIMEOUT_MS)? {
            self.run.tick_timeout_ms = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_SEED)? {
            self.handlers.seed = Some(v);
        }
        Ok(self)
    }

    /// Tick and retry limits for the driver.
    #[must_use]
    pub fn run_policy(&self) -> RunPolicy {
        RunPolicy {
            max_ticks: self.run.max_ticks,
            max_retries: self.run.max_retries,
        }
    }

    /// Per-tick timeout, `None` when disabled.
    #[must_use]
    pub fn tick_timeout(&self) -> Option<Duration> {
        (self.run.tick_timeout_ms > 0).then(|| Duration::from_millis(self.run.tick_timeout_ms))
    }

    /// Pause between retries of a failed tick.
    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.run.retry_backoff_ms)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, GrowerError> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| GrowerError::ConfigError(format!("{} must be a number, got '{}'", name, raw))),
        None => Ok(None),
    }
}

// =============================================================================
// TESTS
// =============================================================================

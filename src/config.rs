//! Worker pool configuration.
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic** — values set via the `with_*` builder methods
//! 2. **Environment variables** — values from `FLOWCX_*` env vars
//! 3. **Defaults** — built-in defaults from [`PoolConfig::default()`]
//!
//! # Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | `workers` | available CPU parallelism |
//! | `max_tasks` | 65 536 |
//! | `thread_name_prefix` | `"flowcx-worker"` |
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `FLOWCX_WORKERS` | `usize` | `workers` |
//! | `FLOWCX_MAX_TASKS` | `usize` | `max_tasks` |
//! | `FLOWCX_THREAD_PREFIX` | `String` | `thread_name_prefix` |

use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};

/// Environment variable name for worker thread count.
pub const ENV_WORKERS: &str = "FLOWCX_WORKERS";
/// Environment variable name for the live task limit.
pub const ENV_MAX_TASKS: &str = "FLOWCX_MAX_TASKS";
/// Environment variable name for the worker thread name prefix.
pub const ENV_THREAD_PREFIX: &str = "FLOWCX_THREAD_PREFIX";

/// Configuration for a [`WorkerPool`](crate::runtime::WorkerPool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of worker threads (default: available parallelism).
    pub workers: usize,
    /// Maximum number of live tasks admitted at once.
    pub max_tasks: usize,
    /// Name prefix for worker threads.
    pub thread_name_prefix: String,
}

impl PoolConfig {
    /// Creates a configuration with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of worker threads.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the live task limit.
    #[must_use]
    pub fn with_max_tasks(mut self, max_tasks: usize) -> Self {
        self.max_tasks = max_tasks;
        self
    }

    /// Sets the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Creates a configuration from the defaults plus any `FLOWCX_*`
    /// environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Checks the configuration for values the pool cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.max_tasks == 0 {
            return Err(ConfigError::ZeroTaskLimit);
        }
        if self.thread_name_prefix.is_empty() {
            return Err(ConfigError::EmptyThreadPrefix);
        }
        Ok(())
    }

    pub(crate) fn default_workers() -> usize {
        std::thread::available_parallelism()
            .map_or(1, std::num::NonZeroUsize::get)
            .max(1)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: Self::default_workers(),
            max_tasks: 65_536,
            thread_name_prefix: "flowcx-worker".to_string(),
        }
    }
}

/// A rejected configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The worker count was zero.
    #[error("worker count must be at least 1")]
    ZeroWorkers,
    /// The live task limit was zero.
    #[error("live task limit must be at least 1")]
    ZeroTaskLimit,
    /// The thread name prefix was empty.
    #[error("thread name prefix must not be empty")]
    EmptyThreadPrefix,
    /// An environment variable held an unparseable value.
    #[error("invalid value for {var}: expected {expected}, got {value:?}")]
    InvalidVar {
        /// The environment variable name.
        var: &'static str,
        /// What the variable should have contained.
        expected: &'static str,
        /// The raw value found.
        value: String,
    },
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorKind::InvalidConfig)
            .with_message(err.to_string())
            .with_source(err)
    }
}

/// Apply environment variable overrides to a [`PoolConfig`].
///
/// Only variables that are set in the environment are applied.
/// Returns an error if a variable is set but contains an unparseable value.
pub fn apply_env_overrides(config: &mut PoolConfig) -> Result<(), ConfigError> {
    if let Some(val) = read_env(ENV_WORKERS) {
        config.workers = parse_usize(ENV_WORKERS, &val)?;
    }
    if let Some(val) = read_env(ENV_MAX_TASKS) {
        config.max_tasks = parse_usize(ENV_MAX_TASKS, &val)?;
    }
    if let Some(val) = read_env(ENV_THREAD_PREFIX) {
        config.thread_name_prefix = val;
    }
    Ok(())
}

/// Read an environment variable, returning `None` if unset.
fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_usize(var: &'static str, val: &str) -> Result<usize, ConfigError> {
    val.trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidVar {
            var,
            expected: "unsigned integer",
            value: val.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    fn with_clean_env<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = crate::test_utils::env_lock();
        for var in &[ENV_WORKERS, ENV_MAX_TASKS, ENV_THREAD_PREFIX] {
            std::env::remove_var(var);
        }
        f()
    }

    fn with_envs<F, R>(vars: &[(&str, &str)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        with_clean_env(|| {
            for (k, v) in vars {
                std::env::set_var(k, v);
            }
            let result = f();
            for (k, _) in vars {
                std::env::remove_var(k);
            }
            result
        })
    }

    #[test]
    fn default_config_sane() {
        init_test("default_config_sane");
        let config = PoolConfig::default();
        crate::assert_with_log!(config.workers >= 1, "workers", true, config.workers >= 1);
        crate::assert_with_log!(
            config.max_tasks == 65_536,
            "max_tasks",
            65_536,
            config.max_tasks
        );
        crate::assert_with_log!(
            config.thread_name_prefix == "flowcx-worker",
            "thread_name_prefix",
            "flowcx-worker",
            config.thread_name_prefix
        );
        assert!(config.validate().is_ok());
        crate::test_complete!("default_config_sane");
    }

    #[test]
    fn builders_override_fields() {
        let config = PoolConfig::new()
            .with_workers(2)
            .with_max_tasks(8)
            .with_thread_name_prefix("svc");
        assert_eq!(config.workers, 2);
        assert_eq!(config.max_tasks, 8);
        assert_eq!(config.thread_name_prefix, "svc");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert_eq!(
            PoolConfig::new().with_workers(0).validate(),
            Err(ConfigError::ZeroWorkers)
        );
        assert_eq!(
            PoolConfig::new().with_max_tasks(0).validate(),
            Err(ConfigError::ZeroTaskLimit)
        );
        assert_eq!(
            PoolConfig::new().with_thread_name_prefix("").validate(),
            Err(ConfigError::EmptyThreadPrefix)
        );
    }

    #[test]
    fn parse_usize_valid() {
        assert_eq!(super::parse_usize("TEST", "42").unwrap(), 42);
        assert_eq!(super::parse_usize("TEST", " 100 ").unwrap(), 100);
    }

    #[test]
    fn parse_usize_invalid() {
        assert!(super::parse_usize("TEST", "abc").is_err());
        assert!(super::parse_usize("TEST", "-1").is_err());
        assert!(super::parse_usize("TEST", "").is_err());
    }

    #[test]
    fn env_overrides_apply() {
        with_envs(
            &[
                (ENV_WORKERS, "3"),
                (ENV_MAX_TASKS, "512"),
                (ENV_THREAD_PREFIX, "svc-worker"),
            ],
            || {
                let config = PoolConfig::from_env().unwrap();
                assert_eq!(config.workers, 3);
                assert_eq!(config.max_tasks, 512);
                assert_eq!(config.thread_name_prefix, "svc-worker");
            },
        );
    }

    #[test]
    fn env_overrides_unset_vars_leave_defaults() {
        with_clean_env(|| {
            let defaults = PoolConfig::default();
            let config = PoolConfig::from_env().unwrap();
            assert_eq!(config, defaults);
        });
    }

    #[test]
    fn env_overrides_invalid_value_returns_error() {
        with_envs(&[(ENV_WORKERS, "not_a_number")], || {
            let err = PoolConfig::from_env().expect_err("expected parse failure");
            let msg = err.to_string();
            assert!(
                msg.contains(ENV_WORKERS),
                "error should mention var name: {msg}"
            );
            assert!(
                msg.contains("not_a_number"),
                "error should mention bad value: {msg}"
            );
        });
    }

    #[test]
    fn config_serializes_for_ops_dumps() {
        let config = PoolConfig::new().with_workers(2).with_max_tasks(128);
        let json = serde_json::to_value(&config).expect("serialize");
        assert_eq!(json["workers"], 2);
        assert_eq!(json["max_tasks"], 128);
        let back: PoolConfig = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, config);
    }

    #[test]
    fn config_error_converts_to_crate_error() {
        use std::error::Error as _;

        let err: Error = ConfigError::ZeroWorkers.into();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("worker count"));
    }
}

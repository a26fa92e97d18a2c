//! Configuration management for the timeout monitor.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Component-wise validation
mod dispatch;
mod wheel;
pub use dispatch::*;
pub use wheel::*;


use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::CONFIG_PATH_ENV;
use crate::constants::ENV_PREFIX;
use crate::constants::ENV_SEPARATOR;
use crate::Result;

/// Main configuration container for the timeout monitor
///
/// Combines wheel dimensions and dispatch pool settings with hierarchical
/// override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `TIMEOUT_MONITOR_CONFIG`
/// 3. Environment variables (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Timing wheel dimensions
    #[serde(default)]
    pub wheel: WheelConfig,
    /// Callback dispatch pool
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl MonitorConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `TIMEOUT_MONITOR_CONFIG` environment variable (if set)
    /// 3. Environment variables with `TIMEOUT_MONITOR__` prefix (highest priority)
    ///
    /// # Note
    /// Validation is deferred so that `with_override_config()` can still be
    /// applied. Callers MUST call `validate()` before using the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("TIMEOUT_MONITOR__WHEEL__SLOT_INTERVAL_MS", "100");
    /// let cfg = MonitorConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(environment());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    pub fn validate(self) -> Result<Self> {
        self.wheel.validate()?;
        self.dispatch.validate()?;
        Ok(self)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
        .ignore_empty(true)
        .try_parsing(true)
}

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_DISPATCH_WORKERS;
use crate::Error;
use crate::Result;

/// Callback dispatch pool settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Number of worker tasks invoking timeout handlers
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config(ConfigError::Message(
                "dispatch workers must be greater than 0".into(),
            )));
        }
        Ok(())
    }
}

fn default_workers() -> usize {
    DEFAULT_DISPATCH_WORKERS
}

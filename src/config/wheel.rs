use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_NUM_WHEELS;
use crate::constants::DEFAULT_SLOT_INTERVAL_MS;
use crate::constants::DEFAULT_WHEEL_SIZE;
use crate::Error;
use crate::Result;

/// Dimensions of the hierarchical timing wheel
///
/// Level 0 advances one slot every `slot_interval_ms`; level k spans
/// `wheel_size^k` level-0 slots per slot. The largest timeout the wheel can
/// hold is `slot_interval_ms * wheel_size^num_wheels`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WheelConfig {
    /// Slots per level
    #[serde(default = "default_wheel_size")]
    pub wheel_size: usize,

    /// Duration of one level-0 slot (milliseconds)
    #[serde(default = "default_slot_interval_ms")]
    pub slot_interval_ms: u64,

    /// Number of levels
    #[serde(default = "default_num_wheels")]
    pub num_wheels: usize,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            wheel_size: default_wheel_size(),
            slot_interval_ms: default_slot_interval_ms(),
            num_wheels: default_num_wheels(),
        }
    }
}

impl WheelConfig {
    /// Sub-millisecond parts of `slot_interval` are truncated.
    pub fn new(
        wheel_size: usize,
        slot_interval: Duration,
        num_wheels: usize,
    ) -> Self {
        Self {
            wheel_size,
            slot_interval_ms: u64::try_from(slot_interval.as_millis()).unwrap_or(u64::MAX),
            num_wheels,
        }
    }

    pub fn slot_interval(&self) -> Duration {
        Duration::from_millis(self.slot_interval_ms)
    }

    /// Number of level-0 slots the whole wheel spans, `None` on overflow
    pub fn capacity_slots(&self) -> Option<u64> {
        let levels = u32::try_from(self.num_wheels).ok()?;
        (self.wheel_size as u64).checked_pow(levels)
    }

    /// Largest timeout accepted by registration.
    ///
    /// Saturates on overflow; `validate` rejects such dimensions up front.
    pub fn max_timeout(&self) -> Duration {
        self.capacity_slots()
            .and_then(|slots| slots.checked_mul(self.slot_interval_ms))
            .map(Duration::from_millis)
            .unwrap_or(Duration::MAX)
    }

    pub fn validate(&self) -> Result<()> {
        if self.wheel_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "wheel_size must be greater than 0".into(),
            )));
        }

        if self.num_wheels == 0 {
            return Err(Error::Config(ConfigError::Message(
                "num_wheels must be greater than 0".into(),
            )));
        }

        if self.slot_interval_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "slot_interval_ms must be at least 1ms".into(),
            )));
        }

        let overflows = self
            .capacity_slots()
            .and_then(|slots| slots.checked_mul(self.slot_interval_ms))
            .is_none();
        if overflows {
            return Err(Error::Config(ConfigError::Message(format!(
                "wheel capacity {}^{} * {}ms overflows",
                self.wheel_size, self.num_wheels, self.slot_interval_ms
            ))));
        }

        Ok(())
    }
}

fn default_wheel_size() -> usize {
    DEFAULT_WHEEL_SIZE
}
// in ms
fn default_slot_interval_ms() -> u64 {
    DEFAULT_SLOT_INTERVAL_MS
}
fn default_num_wheels() -> usize {
    DEFAULT_NUM_WHEELS
}

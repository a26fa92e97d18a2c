// -
// Configuration sources

/// Environment variable prefix, e.g. `TIMEOUT_MONITOR__WHEEL__WHEEL_SIZE=120`
pub(crate) const ENV_PREFIX: &str = "TIMEOUT_MONITOR";
pub(crate) const ENV_SEPARATOR: &str = "__";

/// Optional path to a TOML file layered over the defaults
pub(crate) const CONFIG_PATH_ENV: &str = "TIMEOUT_MONITOR_CONFIG";

// -
// Wheel defaults

pub(crate) const DEFAULT_WHEEL_SIZE: usize = 60;
pub(crate) const DEFAULT_SLOT_INTERVAL_MS: u64 = 1000;
pub(crate) const DEFAULT_NUM_WHEELS: usize = 3;

// -
// Dispatch defaults

pub(crate) const DEFAULT_DISPATCH_WORKERS: usize = 4;

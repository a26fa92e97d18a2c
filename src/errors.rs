//! Timeout Monitor Error Hierarchy
//!
//! Configuration errors are fatal at construction. Validation and placement
//! errors are returned to the caller of the synchronous APIs and never leave
//! partial state behind.

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Wheel dimension or dispatch pool validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Registration and lifecycle failures
    #[error(transparent)]
    Monitor(#[from] MonitorError),
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Registration attempted before `start` or after `stop`
    #[error("Timeout monitor is not running")]
    NotRunning,

    /// Zero timeout
    #[error("Timeout must be greater than zero, got {0:?}")]
    InvalidTimeout(Duration),

    /// Timeout beyond `slot_interval * wheel_size^num_wheels`
    #[error("Timeout {timeout:?} exceeds the maximum supported range {max:?}")]
    TimeoutOutOfRange { timeout: Duration, max: Duration },

    /// A live entry already exists for this id
    #[error("Task {task_id} is already being monitored")]
    DuplicateTask { task_id: String },

    #[error(transparent)]
    Placement(#[from] PlacementError),

    /// `start` needs an ambient tokio runtime to spawn onto
    #[error("No tokio runtime available to start the timeout monitor")]
    RuntimeUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("Task {task_id} was cancelled before it could be placed on the wheel")]
    Cancelled { task_id: String },

    /// No level spans the remaining time
    #[error("Remaining {remaining_slots} slots exceed the wheel capacity of {capacity_slots} slots")]
    OutOfRange {
        remaining_slots: u64,
        capacity_slots: u64,
    },
}

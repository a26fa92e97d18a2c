//! # wheel-monitor
//!
//! Deadline detection for dispatched work. A scheduler registers each task it
//! hands to a node with a timeout; the monitor calls back exactly once if the
//! deadline passes first, without a timer per task and without polling.
//!
//! ## Data flow
//!
//! - [`TaskTimeoutMonitor::add_task_monitor`] computes the deadline, records
//!   the task in the registry and places it on a hierarchical timing wheel.
//! - One tick loop advances level 0 every `slot_interval`. Higher levels move
//!   only when the level below wraps, cascading their current slot into finer
//!   levels. Level 0's current slot is then harvested: expired tasks leave the
//!   registry and are queued, early ones are placed again.
//! - A fixed pool of dispatch workers drains the queue and calls each
//!   [`TimeoutHandler`].
//! - [`TaskTimeoutMonitor::remove_task_monitor`] only flips the task's
//!   cancellation flag; the wheel drops it when the tick loop next meets it.
//!
//! Precision is bounded by `slot_interval`. Nothing is persisted: pending
//! timeouts are lost on [`TaskTimeoutMonitor::stop`] or process exit.
//!
//! ## Example
//!
//! ```ignore
//! let monitor = TaskTimeoutMonitor::new(WheelConfig::new(60, Duration::from_secs(1), 3))?;
//! monitor.start()?;
//! monitor.add_task_monitor("task-1", "node-a", Duration::from_secs(30), |task_id: &str| {
//!     tracing::warn!("{task_id} missed its deadline");
//!     Ok(())
//! })?;
//! ```

mod config;
mod constants;
mod dispatch;
mod errors;
mod handler;
mod monitor;
mod registry;
mod wheel;

pub use config::*;
pub use errors::*;
pub use handler::*;
pub use monitor::*;
pub(crate) use wheel::TimeoutTask;

//-----------------------------------------------------------
// Test utils

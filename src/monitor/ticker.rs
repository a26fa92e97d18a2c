use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::error;
use tracing::warn;

use super::MonitorShared;
use crate::dispatch::invoke_handler;
use crate::PlacementError;

/// Drives the wheel at a fixed absolute cadence.
///
/// Deadlines are `first_tick + n * slot_interval`; a late wake-up is followed
/// by immediate catch-up ticks rather than shifting every later deadline.
pub(crate) async fn run_tick_loop(
    shared: Arc<MonitorShared>,
    first_tick: Instant,
    mut shutdown_signal: watch::Receiver<()>,
) {
    let mut interval = tokio::time::interval_at(first_tick, shared.config.slot_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

    loop {
        tokio::select! {
            biased;
            // P0: shutdown received;
            _ = shutdown_signal.changed() => {
                debug!("[TickLoop] shutdown signal received.");
                return;
            }

            _ = interval.tick() => {
                if !shared.running.load(Ordering::SeqCst) {
                    return;
                }
                shared.tick();
            }
        }
    }
}

impl MonitorShared {
    /// Advances the wheel one slot and settles everything harvested from it.
    ///
    /// Expired tasks go to the dispatch queue, early ones are re-placed, and
    /// a task that cannot be re-placed has its handler invoked right here
    /// rather than being lost.
    pub(crate) fn tick(&self) {
        let harvested = self.wheel.advance();
        if harvested.is_empty() {
            return;
        }

        let now = Instant::now();
        let mut stranded = Vec::new();

        for task in harvested {
            if task.is_cancelled() {
                continue;
            }

            if task.is_expired_at(now) {
                // Losing this race means the task was removed meanwhile
                if !self.registry.remove(&task) {
                    continue;
                }
                warn!(
                    "Task {} timed out, node: {}",
                    task.task_id(),
                    task.node_id()
                );
                self.queue.push(task);
                continue;
            }

            match self.wheel.place(Arc::clone(&task)) {
                Ok(_) | Err(PlacementError::Cancelled { .. }) => {}
                Err(e) => {
                    error!("Failed to re-place task {} on the wheel: {}", task.task_id(), e);
                    stranded.push(task);
                }
            }
        }

        for task in stranded {
            if !self.registry.remove(&task) {
                continue;
            }
            error!(
                "Forcing timeout of task {} on node {} from the tick loop",
                task.task_id(),
                task.node_id()
            );
            invoke_handler(&task);
        }
    }
}

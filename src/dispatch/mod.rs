//! Callback dispatch pool.
//!
//! The tick loop only detects expiry; a fixed set of worker tasks drains a
//! shared queue and runs each handler on tokio's blocking pool, so a slow or
//! failing handler cannot delay the next tick.


use std::any::Any;
use std::collections::VecDeque;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::sync::Notify;
use tracing::debug;
use tracing::error;
use tracing::trace;

use crate::TimeoutTask;

/// Harvested tasks waiting for a worker
#[derive(Debug, Default)]
pub(crate) struct DispatchQueue {
    tasks: Mutex<VecDeque<Arc<TimeoutTask>>>,
    notify: Notify,
}

impl DispatchQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Enqueues and wakes one worker.
    pub(crate) fn push(
        &self,
        task: Arc<TimeoutTask>,
    ) {
        self.tasks.lock().push_back(task);
        self.notify.notify_one();
    }

    pub(crate) fn pop(&self) -> Option<Arc<TimeoutTask>> {
        let mut tasks = self.tasks.lock();
        let task = tasks.pop_front();
        if task.is_some() && !tasks.is_empty() {
            // More work left: hand it to a peer instead of draining alone
            self.notify.notify_one();
        }
        task
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Discards pending work, returns how much was dropped.
    pub(crate) fn clear(&self) -> usize {
        let mut tasks = self.tasks.lock();
        let dropped = tasks.len();
        tasks.clear();
        dropped
    }
}

/// Worker loop: waits for work or shutdown, invokes handlers of tasks that
/// were not cancelled in the meantime.
///
/// One handler at a time per worker, so `workers` bounds how many handlers
/// run concurrently.
pub(crate) async fn run_dispatch_worker(
    worker_id: usize,
    queue: Arc<DispatchQueue>,
    mut shutdown_signal: watch::Receiver<()>,
) {
    trace!("[DispatchWorker-{}] started", worker_id);
    loop {
        while still_running(&shutdown_signal) {
            let Some(task) = queue.pop() else {
                break;
            };
            if task.is_cancelled() {
                trace!("[DispatchWorker-{}] skip cancelled task {}", worker_id, task.task_id());
                continue;
            }
            // Handlers may block; keep them off the threads driving the tick loop
            if let Err(e) = tokio::task::spawn_blocking(move || invoke_handler(&task)).await {
                error!("[DispatchWorker-{}] handler thread failed: {:?}", worker_id, e);
            }
        }

        tokio::select! {
            biased;
            _ = shutdown_signal.changed() => {
                debug!("[DispatchWorker-{}] shutdown signal received.", worker_id);
                return;
            }
            _ = queue.notify.notified() => {}
        }
    }
}

/// False once shutdown has been signalled or the sender is gone.
fn still_running(shutdown_signal: &watch::Receiver<()>) -> bool {
    matches!(shutdown_signal.has_changed(), Ok(false))
}

/// Calls the task's handler inside a failure boundary.
///
/// Errors and panics are logged and swallowed so the calling worker or tick
/// loop keeps running. Returns whether the handler succeeded.
pub(crate) fn invoke_handler(task: &TimeoutTask) -> bool {
    match catch_unwind(AssertUnwindSafe(|| task.handler().on_timeout(task.task_id()))) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!(
                "timeout handler of task {} (node {}) failed: {}",
                task.task_id(),
                task.node_id(),
                e
            );
            false
        }
        Err(panic) => {
            error!(
                "timeout handler of task {} (node {}) panicked: {}",
                task.task_id(),
                task.node_id(),
                panic_message(panic.as_ref())
            );
            false
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic payload"
    }
}

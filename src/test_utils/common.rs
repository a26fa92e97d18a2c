use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::CallbackResult;
use crate::TaskTimeoutMonitor;
use crate::TimeoutHandler;
use crate::WheelConfig;

/// Task ids in the order their handler ran
pub(crate) type FiredLog = Arc<Mutex<Vec<String>>>;

pub(crate) fn noop_handler() -> Arc<dyn TimeoutHandler> {
    Arc::new(|_: &str| -> CallbackResult { Ok(()) })
}

/// A cloneable handler appending every task id it is called with.
pub(crate) fn recording_handler() -> (
    FiredLog,
    impl Fn(&str) -> CallbackResult + Clone + Send + Sync + 'static,
) {
    let fired: FiredLog = Arc::new(Mutex::new(Vec::new()));
    let log = fired.clone();
    let handler = move |task_id: &str| -> CallbackResult {
        log.lock().push(task_id.to_string());
        Ok(())
    };
    (fired, handler)
}

/// Polls `condition` until it holds, panics after `limit`.
pub(crate) async fn wait_for(
    limit: Duration,
    condition: impl Fn() -> bool,
) {
    let deadline = tokio::time::Instant::now() + limit;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("condition not met within {limit:?}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Stopped monitor with a small wheel: `wheel_size` slots per level,
/// `slot_interval_ms` per slot, `num_wheels` levels.
pub(crate) fn test_monitor(
    wheel_size: usize,
    slot_interval_ms: u64,
    num_wheels: usize,
) -> TaskTimeoutMonitor {
    TaskTimeoutMonitor::new(WheelConfig::new(
        wheel_size,
        Duration::from_millis(slot_interval_ms),
        num_wheels,
    ))
    .expect("test wheel should be valid")
}

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use wheel_monitor::CallbackResult;
use wheel_monitor::TaskTimeoutMonitor;
use wheel_monitor::TimeoutHandler;
use wheel_monitor::WheelConfig;

/// Upper bound for polling helpers on the real clock
pub const WAIT_LIMIT_IN_MS: u64 = 5000;

/// Handler recording how often and when each task id fired, relative to the
/// instant the handler was created.
#[derive(Clone)]
pub struct RecordingHandler {
    started_at: Instant,
    fired: Arc<Mutex<HashMap<String, Vec<Duration>>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            fired: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn fire_count(
        &self,
        task_id: &str,
    ) -> usize {
        self.fired.lock().get(task_id).map_or(0, Vec::len)
    }

    pub fn total_fired(&self) -> usize {
        self.fired.lock().values().map(Vec::len).sum()
    }

    /// Elapsed time of the first invocation for `task_id`
    pub fn fired_after(
        &self,
        task_id: &str,
    ) -> Option<Duration> {
        self.fired.lock().get(task_id).and_then(|at| at.first().copied())
    }
}

impl TimeoutHandler for RecordingHandler {
    fn on_timeout(
        &self,
        task_id: &str,
    ) -> CallbackResult {
        let elapsed = self.started_at.elapsed();
        self.fired
            .lock()
            .entry(task_id.to_string())
            .or_default()
            .push(elapsed);
        Ok(())
    }
}

pub fn start_monitor(
    wheel_size: usize,
    slot_interval: Duration,
    num_wheels: usize,
) -> TaskTimeoutMonitor {
    let monitor = TaskTimeoutMonitor::new(WheelConfig::new(wheel_size, slot_interval, num_wheels))
        .expect("valid wheel config");
    monitor.start().expect("monitor should start inside a runtime");
    monitor
}

/// Polls `condition` every 10ms until it holds or `WAIT_LIMIT_IN_MS` passes.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(WAIT_LIMIT_IN_MS);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

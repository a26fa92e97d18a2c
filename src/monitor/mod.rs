//! Task timeout monitor.
//!
//! Callers register a task id with a timeout and a [`TimeoutHandler`]; the
//! monitor reports expiry asynchronously through the handler, at most once,
//! without a timer per task. See the crate docs for the overall data flow.

mod ticker;


use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::dispatch::run_dispatch_worker;
use crate::dispatch::DispatchQueue;
use crate::registry::TaskRegistry;
use crate::wheel::TimeWheel;
use crate::MonitorConfig;
use crate::MonitorError;
use crate::Result;
use crate::TimeoutHandler;
use crate::TimeoutTask;
use crate::WheelConfig;

/// State shared with the tick loop and dispatch workers
pub(crate) struct MonitorShared {
    pub(crate) config: WheelConfig,
    pub(crate) wheel: TimeWheel,
    pub(crate) registry: TaskRegistry,
    pub(crate) queue: Arc<DispatchQueue>,
    pub(crate) running: AtomicBool,
}

/// Background tasks of one `start`..`stop` cycle
struct BackgroundTasks {
    shutdown_tx: watch::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

pub struct TaskTimeoutMonitor {
    shared: Arc<MonitorShared>,
    dispatch_workers: usize,
    background: Mutex<Option<BackgroundTasks>>,
}

impl TaskTimeoutMonitor {
    /// Builds a stopped monitor with the default dispatch pool.
    ///
    /// Fails with a configuration error on zero-sized dimensions.
    pub fn new(config: WheelConfig) -> Result<Self> {
        Self::from_config(MonitorConfig {
            wheel: config,
            ..Default::default()
        })
    }

    pub fn from_config(config: MonitorConfig) -> Result<Self> {
        let MonitorConfig { wheel, dispatch } = config.validate()?;
        let time_wheel = TimeWheel::new(&wheel)?;

        info!(
            "Timeout monitor initialized: {} levels, {} slots per level, {}ms per slot, max timeout {:?}",
            wheel.num_wheels,
            wheel.wheel_size,
            wheel.slot_interval_ms,
            wheel.max_timeout()
        );

        Ok(Self {
            shared: Arc::new(MonitorShared {
                config: wheel,
                wheel: time_wheel,
                registry: TaskRegistry::new(),
                queue: Arc::new(DispatchQueue::new()),
                running: AtomicBool::new(false),
            }),
            dispatch_workers: dispatch.workers,
            background: Mutex::new(None),
        })
    }

    /// Spawns the tick loop and the dispatch pool onto the current tokio
    /// runtime. A no-op while already running.
    pub fn start(&self) -> Result<()> {
        let runtime = Handle::try_current().map_err(|_| MonitorError::RuntimeUnavailable)?;

        let mut background = self.background.lock();
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.shared.wheel.reset();

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let mut handles = Vec::with_capacity(self.dispatch_workers + 1);
        for worker_id in 0..self.dispatch_workers {
            handles.push(runtime.spawn(run_dispatch_worker(
                worker_id,
                self.shared.queue.clone(),
                shutdown_rx.clone(),
            )));
        }

        let first_tick = Instant::now() + self.shared.config.slot_interval();
        handles.push(runtime.spawn(ticker::run_tick_loop(
            self.shared.clone(),
            first_tick,
            shutdown_rx,
        )));

        *background = Some(BackgroundTasks { shutdown_tx, handles });

        info!(
            "Timeout monitor started with {} dispatch workers",
            self.dispatch_workers
        );
        Ok(())
    }

    /// Stops ticking and dispatching, then discards every pending timeout.
    ///
    /// No handler runs once this returns. A no-op while stopped.
    pub async fn stop(&self) {
        let handles = {
            let mut background = self.background.lock();
            let Some(BackgroundTasks { shutdown_tx, handles }) = background.take() else {
                return;
            };
            // Workers stop picking up tasks before registrations start failing
            if shutdown_tx.send(()).is_err() {
                warn!("background tasks already gone before shutdown signal");
            }
            self.shared.running.store(false, Ordering::SeqCst);
            handles
        };

        for result in join_all(handles).await {
            if let Err(e) = result {
                error!("timeout monitor background task failed: {:?}", e);
            }
        }

        let dropped_callbacks = self.shared.queue.clear();
        let dropped_tasks = self.shared.registry.clear();
        self.shared.wheel.clear();

        info!(
            "Timeout monitor stopped, discarded {} pending tasks and {} queued callbacks",
            dropped_tasks, dropped_callbacks
        );
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Starts watching `task_id` for `timeout`.
    ///
    /// `handler` is invoked with the task id once the deadline passes, unless
    /// the task is removed first. Fails without side effects when the monitor
    /// is stopped, the timeout is zero or beyond [`Self::max_timeout`], or the
    /// id is already monitored.
    pub fn add_task_monitor(
        &self,
        task_id: impl Into<String>,
        node_id: impl Into<String>,
        timeout: Duration,
        handler: impl TimeoutHandler,
    ) -> Result<()> {
        if !self.is_running() {
            return Err(MonitorError::NotRunning.into());
        }

        if timeout.is_zero() {
            return Err(MonitorError::InvalidTimeout(timeout).into());
        }

        let max = self.max_timeout();
        if timeout > max {
            return Err(MonitorError::TimeoutOutOfRange { timeout, max }.into());
        }

        let task = Arc::new(TimeoutTask::new(
            task_id.into(),
            node_id.into(),
            Instant::now() + timeout,
            Arc::new(handler),
        ));

        self.shared.registry.register(task.clone())?;

        let position = match self.shared.wheel.place(task.clone()) {
            Ok(position) => position,
            Err(e) => {
                self.rollback(&task);
                warn!("failed to place task {} on the wheel: {}", task.task_id(), e);
                return Err(MonitorError::from(e).into());
            }
        };

        // stop() may have cleared state between the first check and here
        if !self.is_running() {
            self.rollback(&task);
            self.shared.wheel.remove(position, &task);
            return Err(MonitorError::NotRunning.into());
        }

        debug!(
            "Monitoring task {} on node {}, timeout {:?}",
            task.task_id(),
            task.node_id(),
            timeout
        );
        Ok(())
    }

    fn rollback(
        &self,
        task: &Arc<TimeoutTask>,
    ) {
        self.shared.registry.remove(task);
        task.cancel();
    }

    /// Stops watching `task_id`. Returns false if it is not monitored.
    ///
    /// The task stays in its wheel slot until the tick loop reaches it and
    /// drops it; its handler will not be invoked.
    pub fn remove_task_monitor(
        &self,
        task_id: &str,
    ) -> bool {
        match self.shared.registry.cancel(task_id) {
            Some(task) => {
                info!(
                    "Removed timeout monitor of task {} on node {}",
                    task.task_id(),
                    task.node_id()
                );
                true
            }
            None => false,
        }
    }

    /// Tasks registered and neither expired nor removed yet
    pub fn monitored_task_count(&self) -> usize {
        self.shared.registry.len()
    }

    pub fn is_monitored(
        &self,
        task_id: &str,
    ) -> bool {
        self.shared.registry.contains(task_id)
    }

    /// Expired tasks whose handler has not been picked up by a worker yet
    pub fn pending_dispatch_count(&self) -> usize {
        self.shared.queue.len()
    }

    /// `slot_interval * wheel_size^num_wheels`
    pub fn max_timeout(&self) -> Duration {
        self.shared.config.max_timeout()
    }

    pub fn config(&self) -> &WheelConfig {
        &self.shared.config
    }
}

impl Drop for TaskTimeoutMonitor {
    /// Background tasks cannot be awaited here; they observe the signal and
    /// exit on their own.
    fn drop(&mut self) {
        if let Some(background) = self.background.get_mut().take() {
            let _ = background.shutdown_tx.send(());
            self.shared.running.store(false, Ordering::SeqCst);
            self.shared.queue.clear();
            self.shared.registry.clear();
            self.shared.wheel.clear();
        }
    }
}

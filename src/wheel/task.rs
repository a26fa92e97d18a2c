use std::fmt::Debug;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::time::Instant;

use crate::TimeoutHandler;

/// One registered deadline.
///
/// Shared by `Arc` between the registry and whichever slot currently holds
/// it. Relocation between slots moves the `Arc`, never the record, so the
/// cancellation flag is seen by every holder.
pub struct TimeoutTask {
    task_id: String,
    node_id: String,
    expire_at: Instant,
    handler: Arc<dyn TimeoutHandler>,
    /// Set once, never cleared
    cancelled: AtomicBool,
}

impl Debug for TimeoutTask {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TimeoutTask")
            .field("task_id", &self.task_id)
            .field("node_id", &self.node_id)
            .field("expire_at", &self.expire_at)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl TimeoutTask {
    pub(crate) fn new(
        task_id: String,
        node_id: String,
        expire_at: Instant,
        handler: Arc<dyn TimeoutHandler>,
    ) -> Self {
        Self {
            task_id,
            node_id,
            expire_at,
            handler,
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn expire_at(&self) -> Instant {
        self.expire_at
    }

    pub(crate) fn handler(&self) -> &dyn TimeoutHandler {
        self.handler.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns true only for the call that flipped the flag.
    pub(crate) fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    pub fn is_expired_at(
        &self,
        now: Instant,
    ) -> bool {
        now >= self.expire_at
    }
}

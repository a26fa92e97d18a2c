use std::sync::Arc;

use parking_lot::Mutex;

use super::TimeoutTask;

/// One bucket of the wheel, guarded by its own lock only.
#[derive(Debug, Default)]
pub(crate) struct TimeSlot {
    tasks: Mutex<Vec<Arc<TimeoutTask>>>,
}

impl TimeSlot {
    pub(crate) fn push(
        &self,
        task: Arc<TimeoutTask>,
    ) {
        self.tasks.lock().push(task);
    }

    /// Takes every task out of the slot in one critical section.
    pub(crate) fn detach(&self) -> Vec<Arc<TimeoutTask>> {
        std::mem::take(&mut *self.tasks.lock())
    }

    pub(crate) fn remove(
        &self,
        task: &Arc<TimeoutTask>,
    ) -> bool {
        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|resident| !Arc::ptr_eq(resident, task));
        tasks.len() != before
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.tasks.lock().len()
    }
}

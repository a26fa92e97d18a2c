use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::MonitorError;
use crate::TimeoutTask;


/// Live registrations by task id.
///
/// An entry leaves the registry the moment its task is harvested as expired
/// or cancelled, even if the task still sits in a wheel slot.
#[derive(Debug, Default)]
pub(crate) struct TaskRegistry {
    tasks: DashMap<String, Arc<TimeoutTask>>,
}

impl TaskRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fails without touching the existing entry if the id is taken.
    pub(crate) fn register(
        &self,
        task: Arc<TimeoutTask>,
    ) -> std::result::Result<(), MonitorError> {
        match self.tasks.entry(task.task_id().to_string()) {
            Entry::Occupied(occupied) => Err(MonitorError::DuplicateTask {
                task_id: occupied.key().clone(),
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(task);
                Ok(())
            }
        }
    }

    /// Erases the entry, then flags the task so the wheel drops it lazily.
    pub(crate) fn cancel(
        &self,
        task_id: &str,
    ) -> Option<Arc<TimeoutTask>> {
        let (_, task) = self.tasks.remove(task_id)?;
        task.cancel();
        Some(task)
    }

    /// Removes the entry only if it still refers to `task`.
    ///
    /// Returns false when the task was cancelled or replaced meanwhile, which
    /// makes this call the point that decides between expiry and cancellation.
    pub(crate) fn remove(
        &self,
        task: &Arc<TimeoutTask>,
    ) -> bool {
        self.tasks
            .remove_if(task.task_id(), |_, current| Arc::ptr_eq(current, task))
            .is_some()
    }

    pub(crate) fn contains(
        &self,
        task_id: &str,
    ) -> bool {
        self.tasks.contains_key(task_id)
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Cancels and drops every entry, returns how many there were.
    pub(crate) fn clear(&self) -> usize {
        let mut cleared = 0;
        self.tasks.retain(|_, task| {
            task.cancel();
            cleared += 1;
            false
        });
        cleared
    }
}

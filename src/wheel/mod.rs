//! Hierarchical timing wheel.
//!
//! `num_wheels` levels of `wheel_size` slots. Level 0 advances one slot per
//! tick; a level advances only when the level below wraps to slot 0, and the
//! slot it lands on is cascaded: its tasks are re-placed against the current
//! pointers, which moves them into finer levels as their deadline nears.
//!
//! Locking: one mutex per slot, plus the `cursor` read-write lock over the
//! level pointers. Placement holds the cursor for reading while it locks a
//! single slot. The tick path write-locks the cursor only while moving the
//! pointers. No path ever holds two slot locks.

mod slot;
mod task;

pub(crate) use slot::*;
pub use task::*;


use std::sync::Arc;

use parking_lot::RwLock;
use parking_lot::RwLockWriteGuard;
use tokio::time::Instant;
use tracing::trace;
use tracing::warn;

use crate::PlacementError;
use crate::Result;
use crate::WheelConfig;

/// Coordinate of a slot on the wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub level: usize,
    pub slot: usize,
}

pub(crate) struct TimeWheel {
    wheel_size: usize,
    slot_interval_ms: u64,
    capacity_slots: u64,
    levels: Vec<Vec<TimeSlot>>,
    /// Current pointer of every level
    cursor: RwLock<Vec<usize>>,
}

impl TimeWheel {
    pub(crate) fn new(config: &WheelConfig) -> Result<Self> {
        config.validate()?;

        let levels = (0..config.num_wheels)
            .map(|_| (0..config.wheel_size).map(|_| TimeSlot::default()).collect())
            .collect();

        Ok(Self {
            wheel_size: config.wheel_size,
            slot_interval_ms: config.slot_interval_ms,
            // validate() guarantees the capacity fits
            capacity_slots: config.capacity_slots().unwrap_or(u64::MAX),
            levels,
            cursor: RwLock::new(vec![0; config.num_wheels]),
        })
    }

    #[cfg(test)]
    pub(crate) fn num_wheels(&self) -> usize {
        self.levels.len()
    }

    #[cfg(test)]
    pub(crate) fn pointers(&self) -> Vec<usize> {
        self.cursor.read().clone()
    }

    /// Points every level back at slot 0.
    pub(crate) fn reset(&self) {
        self.cursor.write().iter_mut().for_each(|p| *p = 0);
    }

    /// Drops every resident task, returns how many were dropped.
    pub(crate) fn clear(&self) -> usize {
        self.levels
            .iter()
            .flatten()
            .map(|slot| slot.detach().len())
            .sum()
    }

    /// Tasks resident in any slot, cancelled ones included.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.levels.iter().flatten().map(TimeSlot::len).sum()
    }

    /// Maps an absolute deadline to a slot, relative to `cursor` at `now`.
    ///
    /// A deadline that has passed, or is less than 1ms away, lands in the
    /// next level-0 slot so it fires on the next tick.
    pub(crate) fn calculate_position(
        &self,
        cursor: &[usize],
        expire_at: Instant,
        now: Instant,
    ) -> std::result::Result<Position, PlacementError> {
        let remaining_ms = u64::try_from(expire_at.saturating_duration_since(now).as_millis()).unwrap_or(u64::MAX);
        if remaining_ms == 0 {
            return Ok(Position {
                level: 0,
                slot: (cursor[0] + 1) % self.wheel_size,
            });
        }

        let remaining_slots = remaining_ms.div_ceil(self.slot_interval_ms);
        let wheel_size = self.wheel_size as u64;

        // span: level-0 slots covered by one slot of `level`
        let mut span: u64 = 1;
        for (level, pointer) in cursor.iter().enumerate() {
            let range = span.saturating_mul(wheel_size);
            if remaining_slots <= range {
                let offset = (remaining_slots / span) % wheel_size;
                return Ok(Position {
                    level,
                    slot: (*pointer + offset as usize) % self.wheel_size,
                });
            }
            span = range;
        }

        Err(PlacementError::OutOfRange {
            remaining_slots,
            capacity_slots: self.capacity_slots,
        })
    }

    /// Places `task` relative to the current pointers.
    pub(crate) fn place(
        &self,
        task: Arc<TimeoutTask>,
    ) -> std::result::Result<Position, PlacementError> {
        let cursor = self.cursor.read();
        self.place_with(&cursor, task, Instant::now())
    }

    fn place_with(
        &self,
        cursor: &[usize],
        task: Arc<TimeoutTask>,
        now: Instant,
    ) -> std::result::Result<Position, PlacementError> {
        if task.is_cancelled() {
            return Err(PlacementError::Cancelled {
                task_id: task.task_id().to_string(),
            });
        }

        let position = self.calculate_position(cursor, task.expire_at(), now)?;
        trace!(
            "place task {} at level {} slot {}, pointers: {:?}",
            task.task_id(),
            position.level,
            position.slot,
            cursor
        );
        self.push_to(position, task);
        Ok(position)
    }

    pub(crate) fn push_to(
        &self,
        position: Position,
        task: Arc<TimeoutTask>,
    ) {
        self.levels[position.level][position.slot].push(task);
    }

    /// Detaches `task` from the slot at `position`.
    ///
    /// Only exact while nothing advanced the wheel since `task` was placed
    /// there. Returns false if it had already moved on.
    pub(crate) fn remove(
        &self,
        position: Position,
        task: &Arc<TimeoutTask>,
    ) -> bool {
        self.levels[position.level][position.slot].remove(task)
    }

    /// Advances the wheel by one tick.
    ///
    /// Level 0 always moves one slot; every level that wraps to 0 moves the
    /// next level by one, whose new current slot is then cascaded. Returns
    /// the detached contents of level 0's new current slot. Tasks a cascade
    /// could not re-place are appended to the result so the caller decides
    /// their fate instead of them vanishing here.
    pub(crate) fn advance(&self) -> Vec<Arc<TimeoutTask>> {
        let mut cursor = self.cursor.write();
        let advanced = Self::advance_pointers(&mut cursor, self.wheel_size);
        let cursor = RwLockWriteGuard::downgrade(cursor);
        trace!("tick, pointers: {:?}", *cursor);

        let now = Instant::now();
        let mut stranded = Vec::new();

        // Outer levels first, so tasks dropping several levels settle in one tick.
        for level in (1..advanced).rev() {
            for task in self.levels[level][cursor[level]].detach() {
                if task.is_cancelled() {
                    continue;
                }
                match self.place_with(&cursor, Arc::clone(&task), now) {
                    Ok(_) | Err(PlacementError::Cancelled { .. }) => {}
                    Err(e) => {
                        warn!("cascade of task {} from level {} failed: {}", task.task_id(), level, e);
                        stranded.push(task);
                    }
                }
            }
        }

        let mut harvested = self.levels[0][cursor[0]].detach();
        harvested.extend(stranded);
        harvested
    }

    /// Returns the number of levels whose pointer moved.
    fn advance_pointers(
        cursor: &mut [usize],
        wheel_size: usize,
    ) -> usize {
        let mut advanced = 0;
        for pointer in cursor.iter_mut() {
            *pointer = (*pointer + 1) % wheel_size;
            advanced += 1;
            if *pointer != 0 {
                break;
            }
        }
        advanced
    }
}

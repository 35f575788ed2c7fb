//! 6LoWPAN context id allocation with deferred reuse.
//!
//! Each assignable id is in one of three states. An id released by the last
//! Border Router of its prefix is not reusable immediately: peers keep
//! compressing against it until the network converges, so the slot parks in
//! `PendingRemoval` until its deadline elapses.

use crate::error::NetDataError;
use crate::types::{MAX_CONTEXT_ID, MIN_CONTEXT_ID};
use alloc::vec::Vec;
use log::debug;

const NUM_SLOTS: usize = (MAX_CONTEXT_ID - MIN_CONTEXT_ID + 1) as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Unallocated,
    InUse,
    PendingRemoval(u64),
}

#[derive(Clone)]
pub(crate) struct ContextIds {
    slots: [Slot; NUM_SLOTS],
    reuse_delay_ms: u64,
    is_clone: bool,
}

impl ContextIds {
    pub fn new(reuse_delay_ms: u64) -> Self {
        ContextIds { slots: [Slot::Unallocated; NUM_SLOTS], reuse_delay_ms, is_clone: false }
    }

    pub fn clear(&mut self) {
        self.slots = [Slot::Unallocated; NUM_SLOTS];
    }

    pub fn mark_as_clone(&mut self) {
        self.is_clone = true;
    }

    fn slot(&self, id: u8) -> Slot {
        self.slots[(id - MIN_CONTEXT_ID) as usize]
    }

    fn set_slot(&mut self, id: u8, slot: Slot) {
        self.slots[(id - MIN_CONTEXT_ID) as usize] = slot;
    }

    /// Returns the lowest-numbered unallocated id. The id stays unallocated
    /// until `mark_in_use` commits it. A clone always reports the lowest id
    /// since its allocations are never published.
    pub fn get_unallocated_id(&self) -> Result<u8, NetDataError> {
        if self.is_clone {
            return Ok(MIN_CONTEXT_ID);
        }
        (MIN_CONTEXT_ID..=MAX_CONTEXT_ID)
            .find(|&id| self.slot(id) == Slot::Unallocated)
            .ok_or(NetDataError::NotFound)
    }

    /// Forces `id` into use, cancelling any pending removal.
    pub fn mark_in_use(&mut self, id: u8) {
        self.set_slot(id, Slot::InUse);
    }

    /// Parks an in-use id for deferred reclamation and returns the removal
    /// deadline so the caller can re-arm its timer. No-op (returning `None`)
    /// unless the id is currently in use, or on a clone.
    pub fn schedule_to_remove(&mut self, id: u8, now_ms: u64) -> Option<u64> {
        if self.is_clone || self.slot(id) != Slot::InUse {
            return None;
        }
        let deadline = now_ms + self.reuse_delay_ms;
        debug!("Context id {} scheduled for removal at {}ms", id, deadline);
        self.set_slot(id, Slot::PendingRemoval(deadline));
        Some(deadline)
    }

    /// Releases every id whose removal deadline has passed, in ascending id
    /// order. Returns the released ids and the earliest deadline still
    /// pending (for the caller to re-arm the timer).
    pub fn handle_timer(&mut self, now_ms: u64) -> (Vec<u8>, Option<u64>) {
        let mut released = Vec::new();
        let mut next_deadline = None;

        for id in MIN_CONTEXT_ID..=MAX_CONTEXT_ID {
            let Slot::PendingRemoval(deadline) = self.slot(id) else {
                continue;
            };
            if now_ms >= deadline {
                self.set_slot(id, Slot::Unallocated);
                released.push(id);
            } else {
                next_deadline = Some(match next_deadline {
                    Some(t) if t < deadline => t,
                    _ => deadline,
                });
            }
        }

        (released, next_deadline)
    }

    pub fn is_in_use(&self, id: u8) -> bool {
        self.slot(id) == Slot::InUse
    }

    pub fn is_unallocated(&self, id: u8) -> bool {
        self.slot(id) == Slot::Unallocated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocates_lowest_free_id() {
        let mut ids = ContextIds::new(1000);
        assert_eq!(ids.get_unallocated_id(), Ok(1));
        ids.mark_in_use(1);
        ids.mark_in_use(2);
        assert_eq!(ids.get_unallocated_id(), Ok(3));
    }

    #[test]
    fn test_exhaustion_reports_not_found() {
        let mut ids = ContextIds::new(1000);
        for id in MIN_CONTEXT_ID..=MAX_CONTEXT_ID {
            ids.mark_in_use(id);
        }
        assert_eq!(ids.get_unallocated_id(), Err(NetDataError::NotFound));
    }

    #[test]
    fn test_mark_in_use_cancels_pending_removal() {
        let mut ids = ContextIds::new(1000);
        ids.mark_in_use(4);
        assert_eq!(ids.schedule_to_remove(4, 10), Some(1010));

        ids.mark_in_use(4);
        let (released, next) = ids.handle_timer(2000);
        assert!(released.is_empty());
        assert_eq!(next, None);
        assert!(ids.is_in_use(4));
    }

    #[test]
    fn test_timer_releases_expired_slots_in_id_order() {
        let mut ids = ContextIds::new(1000);
        ids.mark_in_use(2);
        ids.mark_in_use(5);
        ids.mark_in_use(9);
        ids.schedule_to_remove(5, 0);
        ids.schedule_to_remove(2, 0);
        ids.schedule_to_remove(9, 500);

        let (released, next) = ids.handle_timer(1000);
        assert_eq!(released, [2, 5]);
        assert_eq!(next, Some(1500));

        let (released, next) = ids.handle_timer(1500);
        assert_eq!(released, [9]);
        assert_eq!(next, None);
        assert!(ids.is_unallocated(9));
    }

    #[test]
    fn test_schedule_is_noop_unless_in_use() {
        let mut ids = ContextIds::new(1000);
        assert_eq!(ids.schedule_to_remove(3, 0), None);
        ids.mark_in_use(3);
        assert_eq!(ids.schedule_to_remove(3, 0), Some(1000));
        // Already pending: no re-arm.
        assert_eq!(ids.schedule_to_remove(3, 400), None);
    }

    #[test]
    fn test_clone_allocation_is_synthetic() {
        let mut ids = ContextIds::new(1000);
        for id in MIN_CONTEXT_ID..=MAX_CONTEXT_ID {
            ids.mark_in_use(id);
        }
        ids.mark_as_clone();
        assert_eq!(ids.get_unallocated_id(), Ok(MIN_CONTEXT_ID));
        assert_eq!(ids.schedule_to_remove(2, 0), None);
    }
}

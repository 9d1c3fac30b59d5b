//! The fixed-size ring of slots and the active-slot handoff.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::engine::slot::Slot;
use crate::error::Result;

/// Sentinel meaning "no active slot" — only reachable before `init` runs or
/// in non-consolidated mode, where the engine never installs one.
pub(crate) const NO_ACTIVE: usize = usize::MAX;

pub struct SlotPool {
    pub(crate) slots: Box<[Slot]>,
    active_idx: AtomicUsize,
}

impl SlotPool {
    /// Allocate `count` slots. If any allocation fails partway through, the
    /// slots built so far are dropped (freeing their buffers) as the partial
    /// `Vec` unwinds, so there is no separate manual cleanup path here.
    pub(crate) fn try_new(count: usize, buf_size: u32) -> Result<Self> {
        let mut slots = Vec::with_capacity(count);
        for _ in 0..count {
            slots.push(Slot::try_new(buf_size)?);
        }
        Ok(Self { slots: slots.into_boxed_slice(), active_idx: AtomicUsize::new(NO_ACTIVE) })
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, idx: usize) -> &Slot {
        &self.slots[idx]
    }

    /// Load the current active slot, if any. Re-checking is always done by
    /// CAS-ing the slot's own state word, not by trusting this index stays
    /// current past the load.
    pub fn active(&self) -> Option<(usize, &Slot)> {
        let idx = self.active_idx.load(Ordering::Acquire);
        if idx == NO_ACTIVE {
            None
        } else {
            Some((idx, &self.slots[idx]))
        }
    }

    /// Install `idx` as the active slot. Caller must hold the pool's
    /// exclusive (write-side) slot lock.
    pub(crate) fn set_active(&self, idx: usize) {
        self.active_idx.store(idx, Ordering::Release);
    }

    /// Find the first `FREE` slot, if any. Linear scan, as in the original:
    /// pools are small (tens of slots) so this is cheap and avoids the extra
    /// bookkeeping a free-list would need under concurrent `free_slot`.
    pub(crate) fn find_free(&self) -> Option<usize> {
        self.slots.iter().position(|s| s.is_free())
    }
}

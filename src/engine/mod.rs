//! The group-commit slot engine: packed state word, slot, pool, and the
//! join/release/close/switch/promote/free protocol that ties them together.

pub mod my_slot;
pub mod pool;
pub mod slot;
pub(crate) mod state;

pub use my_slot::MySlot;
pub use pool::SlotPool;
pub use slot::Slot;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::EngineConfig;
use crate::constants::SLOT_MAX;
use crate::error::{Result, SlotError};
use crate::insights;
use crate::log_core::LogCore;
use crate::metrics::{SlotStats, SlotStatsSnapshot};

/// A running group-commit slot engine.
///
/// Owns the slot pool and the readers-writer lock that arbitrates between
/// joiners (readers) and close/switch/promote (the single writer). Does not
/// own the log file, the record encoder, or the background writer thread —
/// those live on the other side of the `LogCore` trait.
pub struct SlotEngine {
    pool: SlotPool,
    slot_lock: RwLock<()>,
    log_core: Arc<dyn LogCore>,
    config: EngineConfig,
    stats: SlotStats,
}

impl SlotEngine {
    /// Allocate the pool, enable consolidation on `log_core`, and bootstrap
    /// slot 0 as the initial active slot.
    pub fn new(config: EngineConfig, log_core: Arc<dyn LogCore>) -> Result<Self> {
        let buf_size = config.slot_buf_size(log_core.log_file_max());
        let pool = SlotPool::try_new(config.pool_size, buf_size)?;
        // The engine always runs consolidated once constructed; `log_core`
        // starts out in whatever mode it was built with.
        log_core.enable_force_consolidate();

        let engine = Self { pool, slot_lock: RwLock::new(()), log_core, config, stats: SlotStats::new() };

        let _write = engine.slot_lock.write();
        let bootstrap = &engine.pool.slots[0];
        bootstrap.set_release_lsn(engine.log_core.alloc_lsn());
        let space = engine.log_core.acquire(buf_size)?;
        bootstrap.activate(space.start_lsn, space.start_offset, space.fh);
        engine.pool.set_active(0);
        drop(_write);

        Ok(engine)
    }

    pub fn stats(&self) -> SlotStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn pool(&self) -> &SlotPool {
        &self.pool
    }

    pub fn log_core(&self) -> &Arc<dyn LogCore> {
        &self.log_core
    }

    /// Reserve `size` bytes in the active slot. Returns `Ok(None)` only for
    /// the zero-size background-writer probe when there is no active slot
    /// (non-consolidated mode); any other null-active-slot call is a caller
    /// bug and trips a debug assertion.
    pub fn join(&self, size: u32, commit_flags: u8) -> Result<Option<MySlot<'_>>> {
        if size >= SLOT_MAX {
            return Err(SlotError::record_too_large(size, SLOT_MAX));
        }

        let _read = self.slot_lock.read();
        loop {
            let (slot, old) = match self.pool.active() {
                None => {
                    debug_assert_eq!(size, 0, "join with no active slot must be the zero-size writer probe");
                    return Ok(None);
                }
                Some((_, slot)) => {
                    let old = slot.state.load(Ordering::Acquire);
                    (slot, old)
                }
            };

            if !state::is_open(old) {
                self.stats.record_race();
                std::hint::spin_loop();
                continue;
            }

            let joined = state::joined_of(old);
            let released = state::released_of(old);
            let flags = state::flags_of(old);
            let new_join = joined + size;
            let new = state::pack(new_join, released, flags);

            match slot.state.compare_exchange(old, new, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => {
                    slot.set_sync_flags(commit_flags);
                    self.stats.record_join();
                    insights::record_join(size);
                    return Ok(Some(MySlot { slot, offset: joined, end_offset: new_join }));
                }
                Err(_) => {
                    self.stats.record_race();
                    std::hint::spin_loop();
                }
            }
        }
    }

    /// Signal that `myslot`'s writer has finished copying its payload.
    /// Lock-free: does not touch `slot_lock`. Returns the post-add state, so
    /// callers can check `slotlog::engine::state` predicates... in practice
    /// via `SlotEngine::is_done_state`.
    pub fn release(&self, myslot: &MySlot<'_>, size: u32) -> u64 {
        let my_start = myslot.slot.start_offset() + myslot.offset as u64;
        loop {
            let cur = myslot.slot.last_offset.load(Ordering::Relaxed);
            if cur >= my_start {
                break;
            }
            if myslot.slot.last_offset.compare_exchange(cur, my_start, Ordering::Relaxed, Ordering::Relaxed).is_ok() {
                break;
            }
        }

        let delta = state::pack(0, size, 0);
        let prev = myslot.slot.state.fetch_add(delta, Ordering::AcqRel);
        prev + delta
    }

    /// Whether a state word returned by `release` indicates every joiner of
    /// a closed slot has finished releasing.
    pub fn is_done_state(state: u64) -> bool {
        self::state::is_done(state)
    }

    /// Finalize the slot at `idx` (if any): stop accepting joins, compute
    /// its end LSN, and advance `alloc_lsn`. The `bool` reports whether the
    /// caller itself observed `DONE` and is now responsible for writing the
    /// slot out and freeing it. Idempotent: closing an already-closed or
    /// already-reserved slot reports `release_now = false`.
    pub fn close(&self, idx: Option<usize>) -> (bool, Result<()>) {
        let _write = self.slot_lock.write();
        self.close_locked(idx)
    }

    fn close_locked(&self, idx: Option<usize>) -> (bool, Result<()>) {
        let idx = match idx {
            Some(idx) => idx,
            None => return (false, Ok(())),
        };
        let slot = &self.pool.slots[idx];

        loop {
            let old = slot.state.load(Ordering::Acquire);
            if state::is_closed(old) || state::is_reserved(old) {
                return (false, Ok(()));
            }

            let new = Slot::close_bits(old);
            match slot.state.compare_exchange(old, new, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => {
                    let joined = state::joined_of(old);
                    let end_lsn = slot.start_lsn().advance(joined as u64);
                    slot.set_end_lsn(end_lsn);
                    self.log_core.set_alloc_lsn(end_lsn);
                    debug_assert!(end_lsn.file_id >= self.log_core.write_lsn().file_id);

                    self.stats.record_close(joined as u64);
                    insights::record_close(joined);

                    return (state::is_done(new), Ok(()));
                }
                Err(_) => continue,
            }
        }
    }

    /// Close `idx` if it is still the active slot, then promote a fresh
    /// free slot in its place. A no-op if some other thread already raced
    /// ahead and switched this slot out.
    ///
    /// The caller must itself be mid-join on `idx` (its own join not yet
    /// released), so `close` can never observe `DONE` here — asserted
    /// below, matching the original engine's debug-only diagnostic checks.
    pub fn switch(&self, idx: usize) -> Result<()> {
        let _write = self.slot_lock.write();

        match self.pool.active() {
            Some((active_idx, _)) if active_idx == idx => {}
            _ => return Ok(()),
        }

        insights::record_switch();
        let (release_now, result) = self.close_locked(Some(idx));
        result?;
        debug_assert!(!release_now, "switch caller must still be mid-join; its own release has not happened yet");

        self.promote_locked()
    }

    /// Ensure the active slot refers to an `OPEN` slot, promoting a free one
    /// if necessary. A no-op in non-consolidated mode.
    pub fn promote(&self) -> Result<()> {
        let _write = self.slot_lock.write();
        self.promote_locked()
    }

    fn promote_locked(&self) -> Result<()> {
        if !self.log_core.force_consolidate() {
            return Ok(());
        }

        if let Some((_, slot)) = self.pool.active() {
            if slot.is_open() {
                return Ok(());
            }
        }

        loop {
            if let Some(idx) = self.pool.find_free() {
                let slot = &self.pool.slots[idx];
                let buf_size = self.config.slot_buf_size(self.log_core.log_file_max());
                let space = self.log_core.acquire(buf_size)?;
                slot.activate(space.start_lsn, space.start_offset, space.fh);
                self.pool.set_active(idx);
                self.stats.record_transition();
                insights::record_promote();
                return Ok(());
            }

            self.log_core.signal_writer();
            insights::record_pool_exhausted();
            std::thread::yield_now();
        }
    }

    /// Return a finished slot to the pool. Caller must have already written
    /// `slot.filled()` to disk; this is the single point at which the slot
    /// becomes reusable by `promote`.
    ///
    /// Deliberately lock-free, like `release`: `promote` may be spinning on
    /// `slot_lock`'s write side waiting for a free slot to appear, so this
    /// must not need that same lock to make progress.
    pub fn free_slot(&self, idx: usize) {
        let slot = &self.pool.slots[idx];
        slot.free(self.log_core.alloc_lsn());
    }

    /// Mark a slot as fully processed so a lingering `close` on it is a
    /// guaranteed no-op, independent of `free_slot`. Lock-free for the same
    /// reason as `free_slot`.
    pub fn mark_reserved(&self, idx: usize) {
        self.pool.slots[idx].mark_reserved();
    }

    /// Flush any residual buffered bytes for every non-reserved slot and
    /// free its buffer. Called once at shutdown.
    pub fn destroy(&self) -> Result<()> {
        let _write = self.slot_lock.write();
        let mut first_err: Option<std::io::Error> = None;

        for slot in self.pool.slots.iter() {
            let state = slot.state.load(Ordering::Acquire);
            if state::is_reserved(state) {
                continue;
            }

            let released = state::released_of(state);
            let unbuffered = slot.unbuffered.load(Ordering::Relaxed);
            let write_size = released.saturating_sub(unbuffered);
            if write_size == 0 {
                continue;
            }

            let Some(fh) = slot.fh() else { continue };
            let bytes = &slot.filled()[..write_size as usize];
            match fh.0.write_at(slot.start_offset(), bytes) {
                Ok(()) => self.stats.record_destroy_flush(),
                Err(e) => {
                    if first_err.is_none() {
                        first_err = Some(std::io::Error::new(e.kind(), e.to_string()));
                    }
                    slot.set_error(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(SlotError::Io(e)),
            None => Ok(()),
        }
    }
}

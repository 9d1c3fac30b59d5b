//! A single staging slot.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};

use crate::constants::{sync_flags, FLAG_CLOSE, FLAG_RESERVED, FREE};
use crate::engine::state::{self, OPEN_STATE};
use crate::error::{Result, SlotError};
use crate::log_core::AcquiredFile;
use crate::lsn::Lsn;

/// Per-use flags reset every time a slot is freed back to the pool.
pub(crate) const INIT_FLAGS: u8 = 0;

/// Fields only ever mutated by `activate`/`free`, both of which run under
/// the engine's exclusive slot lock, and otherwise only read by code that
/// the protocol guarantees runs after activation has completed and before
/// the next free (see `SlotMut` accessors below for the exact contract).
struct SlotMut {
    start_lsn: Lsn,
    end_lsn: Lsn,
    release_lsn: Lsn,
    start_offset: u64,
    fh: Option<AcquiredFile>,
    error: Option<std::io::Error>,
}

/// A reusable staging region: a byte buffer, its packed state word, and the
/// bookkeeping needed to eventually write it out and re-home it in the log.
///
/// Cache-line aligned so that two neighboring slots' hot atomics (`state`,
/// `last_offset`) never share a line.
#[repr(align(64))]
pub struct Slot {
    pub(crate) state: AtomicU64,
    buf: Box<[u8]>,
    mutable: UnsafeCell<SlotMut>,
    pub(crate) last_offset: AtomicU64,
    pub(crate) unbuffered: AtomicU32,
    flags: AtomicU8,
}

// SAFETY:
// - `buf` is only ever written through disjoint `[offset, offset+size)`
//   ranges handed out by the join CAS, and read only after every joiner in
//   that range has released (observed via the `DONE` predicate on `state`).
// - `mutable`'s fields are only written by `activate`/`free`, which the
//   engine only calls while holding the exclusive (write-side) slot lock;
//   all other readers run at points in the protocol (post-join release,
//   post-close statistics, destroy) that are sequenced after the matching
//   `activate` and before the next `free` by the state machine itself, not
//   by the lock.
unsafe impl Send for Slot {}
unsafe impl Sync for Slot {}

impl Slot {
    /// Allocate a slot's buffer, surfacing allocation failure as `SlotError`
    /// instead of aborting the process the way `vec![0; n]` would.
    pub(crate) fn try_new(buf_size: u32) -> Result<Self> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(buf_size as usize).map_err(|_| SlotError::Oom)?;
        buf.resize(buf_size as usize, 0);

        Ok(Self {
            state: AtomicU64::new(FREE),
            buf: buf.into_boxed_slice(),
            mutable: UnsafeCell::new(SlotMut {
                start_lsn: Lsn::default(),
                end_lsn: Lsn::default(),
                release_lsn: Lsn::default(),
                start_offset: 0,
                fh: None,
                error: None,
            }),
            last_offset: AtomicU64::new(0),
            unbuffered: AtomicU32::new(0),
            flags: AtomicU8::new(INIT_FLAGS),
        })
    }

    #[allow(clippy::mut_from_ref)]
    fn mutable_mut(&self) -> &mut SlotMut {
        unsafe { &mut *self.mutable.get() }
    }

    fn mutable(&self) -> &SlotMut {
        unsafe { &*self.mutable.get() }
    }

    pub fn state(&self) -> u64 {
        self.state.load(Ordering::Acquire)
    }

    pub fn is_free(&self) -> bool {
        state::is_free(self.state())
    }

    pub fn is_open(&self) -> bool {
        state::is_open(self.state())
    }

    pub fn is_closed(&self) -> bool {
        state::is_closed(self.state())
    }

    pub fn is_done(&self) -> bool {
        state::is_done(self.state())
    }

    pub fn start_lsn(&self) -> Lsn {
        self.mutable().start_lsn
    }

    pub fn end_lsn(&self) -> Lsn {
        self.mutable().end_lsn
    }

    pub fn release_lsn(&self) -> Lsn {
        self.mutable().release_lsn
    }

    pub fn start_offset(&self) -> u64 {
        self.mutable().start_offset
    }

    pub fn last_offset(&self) -> u64 {
        self.last_offset.load(Ordering::Acquire)
    }

    pub fn buffer_len(&self) -> usize {
        self.buf.len()
    }

    /// Cumulative bytes reserved by joiners of the current activation.
    /// Callers use this alongside `buffer_len` to decide when to stop
    /// joining and switch to a fresh slot — the engine itself does not
    /// reject a join that would push `JOINED` past `buffer_len`.
    pub fn joined_len(&self) -> u32 {
        state::joined_of(self.state())
    }

    /// The writer's exclusive view of `buf[range]`.
    ///
    /// # Safety
    /// The caller must own a `MySlot` reservation covering exactly this
    /// range (handed out by a successful `join`), and must not retain the
    /// slice past its own `release` call.
    pub(crate) unsafe fn buf_mut(&self, range: std::ops::Range<usize>) -> &mut [u8] {
        debug_assert!(range.end <= self.buf.len());
        let ptr = self.buf.as_ptr() as *mut u8;
        std::slice::from_raw_parts_mut(ptr.add(range.start), range.len())
    }

    /// A read-only view of the bytes written so far. Only meaningful once
    /// the slot is `DONE` or during `destroy`, when no joiner can still be
    /// writing into it concurrently.
    pub fn filled(&self) -> &[u8] {
        let n = state::released_of(self.state());
        &self.buf[..n as usize]
    }

    /// Reset to a fresh `OPEN` activation. Caller (the engine) must already
    /// hold the exclusive slot lock and have obtained file space via
    /// `LogCore::acquire`.
    pub(crate) fn activate(&self, start_lsn: Lsn, start_offset: u64, fh: AcquiredFile) {
        let m = self.mutable_mut();
        m.start_lsn = start_lsn;
        m.end_lsn = start_lsn;
        m.start_offset = start_offset;
        m.fh = Some(fh);
        m.error = None;
        // release_lsn intentionally untouched: set only by free / init.
        self.last_offset.store(start_offset, Ordering::Relaxed);
        self.unbuffered.store(0, Ordering::Relaxed);
        self.state.store(OPEN_STATE, Ordering::Release);
    }

    pub(crate) fn set_sync_flags(&self, commit_flags: u8) {
        // `flags` only grows monotonically across joiners sharing one slot,
        // so a plain fetch_or from any joiner is enough; the upgrade is
        // never reverted within one activation.
        if commit_flags & crate::constants::commit_flags::FSYNC != 0 {
            self.flags.fetch_or(sync_flags::SYNC | sync_flags::SYNC_DIR, Ordering::Relaxed);
        } else if commit_flags & crate::constants::commit_flags::DSYNC != 0 {
            self.flags.fetch_or(sync_flags::SYNC_DIR, Ordering::Relaxed);
        }
    }

    pub(crate) fn set_end_lsn(&self, end_lsn: Lsn) {
        self.mutable_mut().end_lsn = end_lsn;
    }

    pub(crate) fn set_error(&self, err: std::io::Error) {
        let m = self.mutable_mut();
        if m.error.is_none() {
            m.error = Some(err);
        }
    }

    pub fn fh(&self) -> Option<AcquiredFile> {
        self.mutable().fh.clone()
    }

    pub(crate) fn close_bits(old: u64) -> u64 {
        old | FLAG_CLOSE
    }

    /// Return this slot to the pool. Lock-free, like `release`: called
    /// exactly once by whichever thread's `close` or `release` observed
    /// `DONE`, after it has written `filled()` out to disk.
    pub(crate) fn free(&self, release_lsn: Lsn) {
        self.flags.store(INIT_FLAGS, Ordering::Relaxed);
        self.mutable_mut().error = None;
        self.mutable_mut().release_lsn = release_lsn;
        self.state.store(FREE, Ordering::Release);
    }

    pub(crate) fn mark_reserved(&self) {
        let old = self.state.load(Ordering::Acquire);
        self.state.store(old | FLAG_RESERVED, Ordering::Release);
    }

    /// Set `release_lsn` directly, without otherwise touching the state
    /// machine. Used once, to bootstrap slot 0 before its first `activate`.
    pub(crate) fn set_release_lsn(&self, release_lsn: Lsn) {
        self.mutable_mut().release_lsn = release_lsn;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_slot_starts_free() {
        let slot = Slot::try_new(1024).unwrap();
        assert!(slot.is_free());
        assert_eq!(slot.buffer_len(), 1024);
    }

    #[test]
    fn activate_opens_slot_and_resets_high_water_mark() {
        let slot = Slot::try_new(64).unwrap();
        let fh = AcquiredFile(crate::log_core::InMemoryLogCore::new(1_000).current_file());
        slot.activate(Lsn::new(0, 0), 0, fh);
        assert!(slot.is_open());
        assert_eq!(slot.last_offset(), 0);
    }

    #[test]
    fn buf_mut_disjoint_ranges_do_not_alias() {
        let slot = Slot::try_new(16).unwrap();
        unsafe {
            let a = slot.buf_mut(0..4);
            let b = slot.buf_mut(4..8);
            a.copy_from_slice(&[1, 2, 3, 4]);
            b.copy_from_slice(&[5, 6, 7, 8]);
        }
        unsafe {
            assert_eq!(slot.buf_mut(0..8), &[1, 2, 3, 4, 5, 6, 7, 8]);
        }
    }
}

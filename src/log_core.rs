//! The `LogCore` collaborator.
//!
//! Everything the slot engine needs from "the rest of the WAL" — the log
//! file itself, the next-to-allocate and last-written LSNs, and the
//! background writer's wakeup signal — is expressed as a trait so the engine
//! can be built and tested without a real log file abstraction. `slotlog`
//! does not implement file rotation, fsync policy, or record encoding; those
//! stay on the other side of this seam.

use std::fmt;
use std::io;
use std::sync::{Arc, Condvar, Mutex};

use crate::error::Result;
use crate::lsn::Lsn;

/// A handle to an open log file, abstracted down to the one operation the
/// slot engine's destroy path needs: writing residual bytes at a known
/// offset.
pub trait LogFile: Send + Sync + fmt::Debug {
    fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()>;
}

/// File space handed back by `LogCore::acquire` for a newly-activated slot.
#[derive(Debug, Clone, Copy)]
pub struct FileSpace {
    pub start_lsn: Lsn,
    pub start_offset: u64,
    pub fh: AcquiredFile,
}

/// An opaque, cloneable reference to whichever file `acquire` assigned.
/// Concrete `LogCore` implementations decide what this wraps.
#[derive(Clone)]
pub struct AcquiredFile(pub Arc<dyn LogFile>);

impl fmt::Debug for AcquiredFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

/// The external collaborator: owns `alloc_lsn`/`write_lsn`, the current log
/// file, the background writer's condition variable, and the consolidation
/// configuration.
pub trait LogCore: Send + Sync {
    /// Next-to-allocate LSN. Read/write, but only ever mutated by a caller
    /// holding the engine's exclusive slot lock.
    fn alloc_lsn(&self) -> Lsn;

    /// Publish a new `alloc_lsn`. Called by `SlotEngine::close` and, when
    /// rotating files, by `acquire` itself.
    fn set_alloc_lsn(&self, lsn: Lsn);

    /// Last LSN durably written to disk. Read-only from the engine's side;
    /// used only for the `alloc_lsn.file >= write_lsn.file` assertion.
    fn write_lsn(&self) -> Lsn;

    /// Maximum configured size of a single log file.
    fn log_file_max(&self) -> u64;

    /// Whether consolidation (the slot engine) is currently enabled.
    fn force_consolidate(&self) -> bool;

    /// Turn consolidation on. Called once, from `SlotEngine::new`.
    fn enable_force_consolidate(&self);

    /// Reserve `nbytes` of file space for a slot about to be activated. May
    /// rotate to a new log file, in which case it also advances `alloc_lsn`
    /// itself (the one exception to "only `close` advances `alloc_lsn`").
    fn acquire(&self, nbytes: u32) -> Result<FileSpace>;

    /// Wake the background writer thread (called when the pool is exhausted).
    fn signal_writer(&self);
}

/// An in-memory reference `LogCore`, sufficient for tests, doctests, and
/// examples. Not a production log file implementation — no fsync, no real
/// rotation boundaries beyond the configured `log_file_max`.
pub struct InMemoryLogCore {
    inner: Mutex<InMemoryState>,
    writer_cond: Condvar,
    writer_lock: Mutex<()>,
    log_file_max: u64,
}

struct InMemoryState {
    alloc_lsn: Lsn,
    write_lsn: Lsn,
    force_consolidate: bool,
    current_file: Arc<InMemoryFile>,
}

/// A single append-only in-memory "file."
#[derive(Debug)]
pub struct InMemoryFile {
    data: Mutex<Vec<u8>>,
}

impl InMemoryFile {
    fn new() -> Self {
        Self { data: Mutex::new(Vec::new()) }
    }

    /// Snapshot of everything written so far, for test assertions.
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }
}

impl LogFile for InMemoryFile {
    fn write_at(&self, offset: u64, buf: &[u8]) -> io::Result<()> {
        let mut data = self.data.lock().unwrap();
        let end = offset as usize + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[offset as usize..end].copy_from_slice(buf);
        Ok(())
    }
}

impl InMemoryLogCore {
    pub fn new(log_file_max: u64) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(InMemoryState {
                alloc_lsn: Lsn::new(0, 0),
                write_lsn: Lsn::new(0, 0),
                force_consolidate: false,
                current_file: Arc::new(InMemoryFile::new()),
            }),
            writer_cond: Condvar::new(),
            writer_lock: Mutex::new(()),
            log_file_max,
        })
    }

    /// Block until `signal_writer` is called or the timeout elapses. Used by
    /// test background-writer threads to avoid busy-polling.
    pub fn wait_for_signal(&self, timeout: std::time::Duration) {
        let guard = self.writer_lock.lock().unwrap();
        let _ = self.writer_cond.wait_timeout(guard, timeout);
    }

    /// Advance `write_lsn` to match `alloc_lsn` (simulating the background
    /// writer having caught up).
    pub fn mark_written_up_to(&self, lsn: Lsn) {
        let mut state = self.inner.lock().unwrap();
        if lsn > state.write_lsn {
            state.write_lsn = lsn;
        }
    }

    pub fn current_file(&self) -> Arc<InMemoryFile> {
        self.inner.lock().unwrap().current_file.clone()
    }
}

impl LogCore for InMemoryLogCore {
    fn alloc_lsn(&self) -> Lsn {
        self.inner.lock().unwrap().alloc_lsn
    }

    fn set_alloc_lsn(&self, lsn: Lsn) {
        let mut state = self.inner.lock().unwrap();
        state.alloc_lsn = lsn;
    }

    fn write_lsn(&self) -> Lsn {
        self.inner.lock().unwrap().write_lsn
    }

    fn log_file_max(&self) -> u64 {
        self.log_file_max
    }

    fn force_consolidate(&self) -> bool {
        self.inner.lock().unwrap().force_consolidate
    }

    fn enable_force_consolidate(&self) {
        self.inner.lock().unwrap().force_consolidate = true;
    }

    fn acquire(&self, nbytes: u32) -> Result<FileSpace> {
        let mut state = self.inner.lock().unwrap();
        let would_exceed = state.alloc_lsn.offset + nbytes as u64 > self.log_file_max;
        if would_exceed {
            // Rotate: new file, offset resets, file_id advances. This is the
            // one path other than `close` that is allowed to move `alloc_lsn`.
            state.current_file = Arc::new(InMemoryFile::new());
            state.alloc_lsn = Lsn::new(state.alloc_lsn.file_id + 1, 0);
        }
        let start_lsn = state.alloc_lsn;
        Ok(FileSpace {
            start_lsn,
            start_offset: start_lsn.offset,
            fh: AcquiredFile(state.current_file.clone()),
        })
    }

    fn signal_writer(&self) {
        let _guard = self.writer_lock.lock().unwrap();
        self.writer_cond.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_hands_back_current_file_without_rotation() {
        let core = InMemoryLogCore::new(1_000_000);
        let space = core.acquire(100).unwrap();
        assert_eq!(space.start_lsn, Lsn::new(0, 0));
        assert_eq!(space.start_offset, 0);
    }

    #[test]
    fn acquire_rotates_when_request_exceeds_file_max() {
        let core = InMemoryLogCore::new(100);
        core.set_alloc_lsn(Lsn::new(0, 90));
        let space = core.acquire(50).unwrap();
        assert_eq!(space.start_lsn.file_id, 1);
        assert_eq!(space.start_offset, 0);
    }

    #[test]
    fn signal_writer_wakes_waiter() {
        let core = InMemoryLogCore::new(1_000_000);
        let core2 = core.clone();
        let handle = std::thread::spawn(move || {
            core2.wait_for_signal(std::time::Duration::from_secs(5));
        });
        std::thread::sleep(std::time::Duration::from_millis(10));
        core.signal_writer();
        handle.join().unwrap();
    }
}

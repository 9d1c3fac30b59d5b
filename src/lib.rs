//! `slotlog`: a lock-free group-commit slot engine for write-ahead logs.
//!
//! A `SlotEngine` consolidates many concurrent writers' log records into a
//! small pool of shared buffers so that a burst of commits pays for one
//! `fsync` instead of one each. Writers `join` a slot to reserve a byte
//! range, copy their record into it, then `release`; the slot lock's write
//! side (`close`/`switch`/`promote`) is held only by whichever thread
//! discovers it must roll the active slot over, never by a joiner.
//!
//! This crate owns the slot state machine and buffer pool. It does not own
//! the log file, record encoding, or fsync policy — those are expressed as
//! the [`log_core::LogCore`] trait so the engine can be exercised without a
//! real WAL underneath it.
//!
//! ```
//! use slotlog::config::EngineConfig;
//! use slotlog::engine::SlotEngine;
//! use slotlog::log_core::InMemoryLogCore;
//!
//! let log_core = InMemoryLogCore::new(1_000_000);
//! let engine = SlotEngine::new(EngineConfig::default(), log_core).unwrap();
//!
//! let my_slot = engine.join(5, 0).unwrap().unwrap();
//! my_slot.buf_mut().copy_from_slice(b"hello");
//! let idx = engine.pool().active().unwrap().0;
//! engine.release(&my_slot, 5);
//! let (release_now, result) = engine.close(Some(idx));
//! result.unwrap();
//! if release_now {
//!     engine.free_slot(idx);
//! }
//! ```

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod insights;
pub mod log_core;
pub mod lsn;
pub mod metrics;

pub use config::EngineConfig;
pub use engine::{MySlot, SlotEngine};
pub use error::{Result, SlotError};
pub use lsn::Lsn;

//! Slotlog tunables.
//!
//! Bit layout of the packed slot state word (see `engine::state`):
//!
//! ```text
//! 63            48 47            24 23             0
//! +----------------+----------------+----------------+
//! |     FLAGS      |    RELEASED    |     JOINED     |
//! +----------------+----------------+----------------+
//! ```

/// Number of slots kept in a pool. WiredTiger fixes this at 16; there is no
/// strong reason to make it configurable.
pub const SLOT_POOL_SIZE: usize = 16;

/// Default slot buffer capacity: 256 KiB.
pub const DEFAULT_SLOT_BUF: u32 = 256 * 1024;

/// Width in bits of the `JOINED` and `RELEASED` fields.
pub const COUNTER_BITS: u32 = 24;

/// Largest single join size representable in the `JOINED` field.
pub const SLOT_MAX: u32 = (1 << COUNTER_BITS) - 1;

pub(crate) const JOINED_SHIFT: u32 = 0;
pub(crate) const RELEASED_SHIFT: u32 = COUNTER_BITS;
pub(crate) const FLAGS_SHIFT: u32 = COUNTER_BITS * 2;

pub(crate) const COUNTER_MASK: u64 = (1u64 << COUNTER_BITS) - 1;

/// Slot no longer accepts joins; its end LSN has been computed.
pub(crate) const FLAG_CLOSE: u64 = 1 << FLAGS_SHIFT;

/// Slot has been fully drained and freed; a lingering `close` call on it is a no-op.
pub(crate) const FLAG_RESERVED: u64 = 1 << (FLAGS_SHIFT + 1);

/// Sentinel state meaning "in the pool, available." Distinct from every
/// reachable `(joined, released, flags)` triple because real operation never
/// sets any of the flag bits above `FLAG_RESERVED`.
pub(crate) const FREE: u64 = u64::MAX;

/// Per-slot sync flags, OR-ed in as joiners request stronger durability.
pub mod sync_flags {
    pub const SYNC: u8 = 1 << 0;
    pub const SYNC_DIR: u8 = 1 << 1;
}

/// Per-commit flags a caller passes to `SlotEngine::join`.
pub mod commit_flags {
    pub const DSYNC: u8 = 1 << 0;
    pub const FSYNC: u8 = 1 << 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_max_fits_in_joined_field() {
        assert!(SLOT_MAX < (1 << COUNTER_BITS));
        assert!(DEFAULT_SLOT_BUF < (1 << COUNTER_BITS));
    }

    #[test]
    fn free_sentinel_has_reserved_and_close_bits_set() {
        assert_ne!(FREE & FLAG_CLOSE, 0);
        assert_ne!(FREE & FLAG_RESERVED, 0);
    }
}

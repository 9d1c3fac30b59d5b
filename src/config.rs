//! Engine configuration.

use crate::constants::{DEFAULT_SLOT_BUF, SLOT_POOL_SIZE};
use crate::error::{Result, SlotError};

/// Configuration for a `SlotEngine`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of slots in the pool. Must be at least 2 (one active, one free
    /// to promote into while the active one drains).
    pub pool_size: usize,
    /// Upper bound on a slot's buffer before capping by `log_file_max / 10`.
    pub default_slot_buf: u32,
    /// Start the engine with consolidation already enabled.
    pub force_consolidate: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_size: SLOT_POOL_SIZE,
            default_slot_buf: DEFAULT_SLOT_BUF,
            force_consolidate: true,
        }
    }
}

impl EngineConfig {
    pub fn new(pool_size: usize) -> Result<Self> {
        if pool_size < 2 {
            return Err(SlotError::config("pool_size must be at least 2"));
        }
        Ok(Self { pool_size, ..Default::default() })
    }

    pub fn with_default_slot_buf(mut self, bytes: u32) -> Result<Self> {
        if bytes == 0 {
            return Err(SlotError::config("default_slot_buf must be greater than 0"));
        }
        self.default_slot_buf = bytes;
        Ok(self)
    }

    /// The buffer size a slot is actually allocated with, capped by a
    /// fraction of the configured log file size so a single slot cannot
    /// exceed it and destabilize file rotation.
    pub fn slot_buf_size(&self, log_file_max: u64) -> u32 {
        let capped = (log_file_max / 10).min(self.default_slot_buf as u64);
        capped as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_too_small_pool() {
        assert!(EngineConfig::new(1).is_err());
        assert!(EngineConfig::new(0).is_err());
    }

    #[test]
    fn slot_buf_size_caps_to_log_file_fraction() {
        let config = EngineConfig::default();
        assert_eq!(config.slot_buf_size(1_000_000), 100_000);
        assert_eq!(config.slot_buf_size(10_000_000_000), DEFAULT_SLOT_BUF);
    }

    #[test]
    fn with_default_slot_buf_rejects_zero() {
        assert!(EngineConfig::default().with_default_slot_buf(0).is_err());
    }
}

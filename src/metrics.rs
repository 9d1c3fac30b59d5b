//! Statistics for the slot engine.
//!
//! Lightweight counters for observability.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global-per-engine statistics counters.
pub struct SlotStats {
    pub joins: AtomicU64,
    pub races: AtomicU64,
    pub closes: AtomicU64,
    pub consolidated_bytes: AtomicU64,
    pub transitions: AtomicU64,
    pub destroys_flushed: AtomicU64,
}

impl SlotStats {
    pub const fn new() -> Self {
        Self {
            joins: AtomicU64::new(0),
            races: AtomicU64::new(0),
            closes: AtomicU64::new(0),
            consolidated_bytes: AtomicU64::new(0),
            transitions: AtomicU64::new(0),
            destroys_flushed: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_join(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_race(&self) {
        self.races.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_close(&self, consolidated_bytes: u64) {
        self.closes.fetch_add(1, Ordering::Relaxed);
        self.consolidated_bytes.fetch_add(consolidated_bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_transition(&self) {
        self.transitions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_destroy_flush(&self) {
        self.destroys_flushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SlotStatsSnapshot {
        SlotStatsSnapshot {
            joins: self.joins.load(Ordering::Relaxed),
            races: self.races.load(Ordering::Relaxed),
            closes: self.closes.load(Ordering::Relaxed),
            consolidated_bytes: self.consolidated_bytes.load(Ordering::Relaxed),
            transitions: self.transitions.load(Ordering::Relaxed),
            destroys_flushed: self.destroys_flushed.load(Ordering::Relaxed),
        }
    }
}

impl Default for SlotStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SlotStatsSnapshot {
    pub joins: u64,
    pub races: u64,
    pub closes: u64,
    pub consolidated_bytes: u64,
    pub transitions: u64,
    pub destroys_flushed: u64,
}

impl std::fmt::Display for SlotStatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "joins={} races={} closes={} consolidated_bytes={} transitions={} destroys_flushed={}",
            self.joins,
            self.races,
            self.closes,
            self.consolidated_bytes,
            self.transitions,
            self.destroys_flushed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_events() {
        let stats = SlotStats::new();
        stats.record_join();
        stats.record_join();
        stats.record_race();
        stats.record_close(128);
        stats.record_transition();

        let snap = stats.snapshot();
        assert_eq!(snap.joins, 2);
        assert_eq!(snap.races, 1);
        assert_eq!(snap.closes, 1);
        assert_eq!(snap.consolidated_bytes, 128);
        assert_eq!(snap.transitions, 1);
    }
}

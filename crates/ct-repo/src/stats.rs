//! Repository statistics with atomic counters.
//!
//! Counters use relaxed ordering; they are informational only.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters describing a repository's activity.
#[derive(Debug, Default)]
pub struct RepositoryStats {
    added: AtomicU64,
    removed: AtomicU64,
    dropped_aliases: AtomicU64,
    reloads: AtomicU64,
    watch_errors: AtomicU64,
}

impl RepositoryStats {
    /// Creates zeroed statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records commands inserted by `add`.
    #[inline]
    pub fn record_added(&self, n: usize) {
        self.added.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Records commands deleted by `remove`.
    #[inline]
    pub fn record_removed(&self, n: usize) {
        self.removed.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Records aliases whose target could not be resolved.
    #[inline]
    pub fn record_dropped_aliases(&self, n: usize) {
        self.dropped_aliases.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Records a file reloaded by the watcher.
    #[inline]
    pub fn increment_reloads(&self) {
        self.reloads.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed watch callback.
    #[inline]
    pub fn increment_watch_errors(&self) {
        self.watch_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            added: self.added.load(Ordering::Relaxed),
            removed: self.removed.load(Ordering::Relaxed),
            dropped_aliases: self.dropped_aliases.load(Ordering::Relaxed),
            reloads: self.reloads.load(Ordering::Relaxed),
            watch_errors: self.watch_errors.load(Ordering::Relaxed),
        }
    }
}

/// A serializable view of [`RepositoryStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Commands inserted, aliases included.
    pub added: u64,
    /// Commands removed.
    pub removed: u64,
    /// Aliases dropped because their target was missing.
    pub dropped_aliases: u64,
    /// Files reloaded by the watcher.
    pub reloads: u64,
    /// Watch callbacks that failed.
    pub watch_errors: u64,
}

impl StatsSnapshot {
    /// Net number of commands currently attributable to adds.
    #[must_use]
    pub const fn net(&self) -> u64 {
        self.added.saturating_sub(self.removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = RepositoryStats::new();
        stats.record_added(3);
        stats.record_removed(1);
        stats.record_dropped_aliases(2);
        stats.increment_reloads();
        stats.increment_watch_errors();

        let snap = stats.snapshot();
        assert_eq!(snap.added, 3);
        assert_eq!(snap.removed, 1);
        assert_eq!(snap.dropped_aliases, 2);
        assert_eq!(snap.reloads, 1);
        assert_eq!(snap.watch_errors, 1);
        assert_eq!(snap.net(), 2);
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_value(StatsSnapshot::default()).unwrap();
        assert_eq!(json["added"], 0);
        assert_eq!(json["watch_errors"], 0);
    }
}

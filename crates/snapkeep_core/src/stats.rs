//! Snapshot statistics.
//!
//! Counters describing how the snapshot deletion policy has been used.
//!
//! # Usage
//!
//! ```rust,ignore
//! let stats = policy.stats();
//! println!("held back: {}", stats.deletions_deferred);
//! println!("reclaimed on release: {}", stats.deferred_reclaimed);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot policy statistics.
///
/// All counters are atomic and can be read while operations are in progress.
/// Values are monotonically increasing.
#[derive(Debug, Default)]
pub struct SnapshotStats {
    /// Commit notifications processed.
    commits_observed: AtomicU64,
    /// Holds acquired.
    snapshots_acquired: AtomicU64,
    /// Releases that dropped a hold.
    releases: AtomicU64,
    /// Releases of a version with no hold.
    redundant_releases: AtomicU64,
    /// Deletions postponed because the commit was held.
    deletions_deferred: AtomicU64,
    /// Postponed deletions carried out when the last hold went away.
    deferred_reclaimed: AtomicU64,
    /// Postponed deletions that failed on release.
    reclaim_failures: AtomicU64,
    /// Empty reference entries removed during a commit cycle.
    swept_entries: AtomicU64,
}

impl SnapshotStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    // === Increment methods (internal use) ===

    pub(crate) fn record_commit(&self) {
        self.commits_observed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_acquire(&self) {
        self.snapshots_acquired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_release(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_redundant_release(&self) {
        self.redundant_releases.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_deferred(&self) {
        self.deletions_deferred.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reclaimed(&self) {
        self.deferred_reclaimed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reclaim_failure(&self) {
        self.reclaim_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_swept(&self, count: u64) {
        self.swept_entries.fetch_add(count, Ordering::Relaxed);
    }

    // === Getter methods (public API) ===

    /// Returns the number of commit notifications processed.
    pub fn commits_observed(&self) -> u64 {
        self.commits_observed.load(Ordering::Relaxed)
    }

    /// Returns the number of holds acquired.
    pub fn snapshots_acquired(&self) -> u64 {
        self.snapshots_acquired.load(Ordering::Relaxed)
    }

    /// Returns the number of effective releases.
    pub fn releases(&self) -> u64 {
        self.releases.load(Ordering::Relaxed)
    }

    /// Returns the number of releases that found no hold.
    pub fn redundant_releases(&self) -> u64 {
        self.redundant_releases.load(Ordering::Relaxed)
    }

    /// Returns the number of deletions postponed by a hold.
    pub fn deletions_deferred(&self) -> u64 {
        self.deletions_deferred.load(Ordering::Relaxed)
    }

    /// Returns the number of postponed deletions completed on release.
    pub fn deferred_reclaimed(&self) -> u64 {
        self.deferred_reclaimed.load(Ordering::Relaxed)
    }

    /// Returns the number of postponed deletions that failed on release.
    pub fn reclaim_failures(&self) -> u64 {
        self.reclaim_failures.load(Ordering::Relaxed)
    }

    /// Returns the number of empty reference entries swept.
    ///
    /// Anything other than zero points at a bookkeeping bug.
    pub fn swept_entries(&self) -> u64 {
        self.swept_entries.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all stats.
    pub fn snapshot(&self) -> SnapshotStatsSnapshot {
        SnapshotStatsSnapshot {
            commits_observed: self.commits_observed(),
            snapshots_acquired: self.snapshots_acquired(),
            releases: self.releases(),
            redundant_releases: self.redundant_releases(),
            deletions_deferred: self.deletions_deferred(),
            deferred_reclaimed: self.deferred_reclaimed(),
            reclaim_failures: self.reclaim_failures(),
            swept_entries: self.swept_entries(),
        }
    }
}

/// A point-in-time copy of [`SnapshotStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SnapshotStatsSnapshot {
    /// Commit notifications processed.
    pub commits_observed: u64,
    /// Holds acquired.
    pub snapshots_acquired: u64,
    /// Effective releases.
    pub releases: u64,
    /// Releases that found no hold.
    pub redundant_releases: u64,
    /// Deletions postponed by a hold.
    pub deletions_deferred: u64,
    /// Postponed deletions completed on release.
    pub deferred_reclaimed: u64,
    /// Postponed deletions that failed on release.
    pub reclaim_failures: u64,
    /// Empty reference entries swept.
    pub swept_entries: u64,
}

impl SnapshotStatsSnapshot {
    /// Returns holds acquired but not yet released.
    pub fn outstanding(&self) -> u64 {
        self.snapshots_acquired.saturating_sub(self.releases)
    }
}

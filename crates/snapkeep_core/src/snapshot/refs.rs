//! Per-version snapshot reference counts.

use crate::commit::IndexCommit;
use crate::types::CommitVersion;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Holds on one commit version.
#[derive(Debug, Default)]
struct Holder {
    count: usize,
    /// Raw commit whose physical deletion was postponed by the holds.
    pending: Option<Arc<dyn IndexCommit>>,
}

/// Outcome of dropping one hold.
#[derive(Debug)]
pub(crate) enum Release {
    /// No hold existed for the version.
    Unknown,
    /// Other holds remain.
    Held {
        /// Holds left after this release.
        remaining: usize,
    },
    /// That was the last hold; the entry is gone.
    Freed {
        /// Commit whose deletion had been postponed, if any.
        pending: Option<Arc<dyn IndexCommit>>,
    },
}

/// Concurrent version -> hold count table.
///
/// Every compound operation runs inside a single map entry, so operations
/// on one version are linearizable while unrelated versions land on
/// different shards and do not contend. Entries never hold a zero count.
#[derive(Debug, Default)]
pub(crate) struct RefTable {
    holders: DashMap<CommitVersion, Holder>,
}

impl RefTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a hold, creating the entry if needed. Returns the new count.
    pub(crate) fn acquire(&self, version: CommitVersion) -> usize {
        let mut holder = self.holders.entry(version).or_default();
        holder.count += 1;
        holder.count
    }

    /// Adds a hold only if the version is already held.
    pub(crate) fn acquire_if_held(&self, version: CommitVersion) -> Option<usize> {
        let mut holder = self.holders.get_mut(&version)?;
        if holder.count == 0 {
            return None;
        }
        holder.count += 1;
        Some(holder.count)
    }

    /// Drops one hold, removing the entry when it was the last.
    pub(crate) fn release(&self, version: CommitVersion) -> Release {
        match self.holders.entry(version) {
            Entry::Vacant(_) => Release::Unknown,
            Entry::Occupied(mut entry) => {
                let holder = entry.get_mut();
                if holder.count == 0 {
                    entry.remove();
                    return Release::Unknown;
                }
                holder.count -= 1;
                if holder.count > 0 {
                    return Release::Held {
                        remaining: holder.count,
                    };
                }
                let holder = entry.remove();
                Release::Freed {
                    pending: holder.pending,
                }
            }
        }
    }

    pub(crate) fn count(&self, version: CommitVersion) -> usize {
        self.holders.get(&version).map_or(0, |holder| holder.count)
    }

    /// Records `commit` for deletion once the version's last hold goes.
    ///
    /// Returns false, recording nothing, if the version is not held; the
    /// caller must then delete the commit itself.
    pub(crate) fn defer_if_held(&self, version: CommitVersion, commit: &Arc<dyn IndexCommit>) -> bool {
        match self.holders.get_mut(&version) {
            Some(mut holder) if holder.count > 0 => {
                holder.pending = Some(Arc::clone(commit));
                true
            }
            _ => false,
        }
    }

    /// Forgets a postponed deletion for a version that is live again.
    pub(crate) fn clear_pending(&self, version: CommitVersion) {
        if let Some(mut holder) = self.holders.get_mut(&version) {
            holder.pending = None;
        }
    }

    pub(crate) fn has_pending(&self, version: CommitVersion) -> bool {
        self.holders
            .get(&version)
            .is_some_and(|holder| holder.pending.is_some())
    }

    /// Removes entries whose count is zero. Returns how many were removed.
    pub(crate) fn sweep(&self) -> usize {
        let before = self.holders.len();
        self.holders.retain(|_, holder| holder.count > 0);
        before.saturating_sub(self.holders.len())
    }

    /// Returns held versions in ascending order.
    pub(crate) fn versions(&self) -> Vec<CommitVersion> {
        let mut versions: Vec<CommitVersion> = self
            .holders
            .iter()
            .filter(|entry| entry.count > 0)
            .map(|entry| *entry.key())
            .collect();
        versions.sort_unstable();
        versions
    }

    pub(crate) fn len(&self) -> usize {
        self.holders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u64) -> CommitVersion {
        CommitVersion::new(n)
    }

    #[test]
    fn acquire_and_release_counts() {
        let table = RefTable::new();
        assert_eq!(table.acquire(v(5)), 1);
        assert_eq!(table.acquire(v(5)), 2);
        assert_eq!(table.count(v(5)), 2);

        assert!(matches!(table.release(v(5)), Release::Held { remaining: 1 }));
        assert_eq!(table.count(v(5)), 1);
        assert!(matches!(table.release(v(5)), Release::Freed { pending: None }));
        assert_eq!(table.count(v(5)), 0);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn release_unknown_version() {
        let table = RefTable::new();
        assert!(matches!(table.release(v(1)), Release::Unknown));
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn acquire_if_held_requires_hold() {
        let table = RefTable::new();
        assert_eq!(table.acquire_if_held(v(1)), None);
        assert_eq!(table.len(), 0);
        table.acquire(v(1));
        assert_eq!(table.acquire_if_held(v(1)), Some(2));
    }

    #[test]
    fn sweep_on_clean_table_removes_nothing() {
        let table = RefTable::new();
        table.acquire(v(1));
        table.acquire(v(2));
        assert_eq!(table.sweep(), 0);
        assert_eq!(table.versions(), vec![v(1), v(2)]);
    }

    #[test]
    fn unrelated_versions_are_independent() {
        let table = RefTable::new();
        table.acquire(v(1));
        table.acquire(v(2));
        table.release(v(1));
        assert_eq!(table.count(v(1)), 0);
        assert_eq!(table.count(v(2)), 1);
    }

    #[test]
    fn concurrent_acquire_release_balances() {
        use std::thread;

        let table = Arc::new(RefTable::new());
        let threads: Vec<_> = (0..8)
            .map(|t| {
                let table = Arc::clone(&table);
                thread::spawn(move || {
                    for i in 0..500u64 {
                        let version = v((i + t) % 4);
                        table.acquire(version);
                        assert!(!matches!(table.release(version), Release::Unknown));
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(table.len(), 0);
    }
}

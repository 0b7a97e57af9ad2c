//! Snapshot retention on top of a primary deletion policy.
//!
//! [`SnapshotDeletionPolicy`] sits between the commit writer and the
//! engine's own deletion policy. Consumers (backups, replica recovery,
//! exports) take snapshots of commit points; a snapshotted commit is never
//! physically deleted until every snapshot of it has been released, no
//! matter how many commit cycles pass in the meantime.
//!
//! ## Invariants
//!
//! - A commit with an unreleased snapshot keeps all of its artifacts
//! - Releasing the last snapshot of a superseded commit makes it reclaimable
//! - Hold counts never go negative; a version with no holds has no entry
//! - A snapshot bundle comes from exactly one published commit list
//!
//! ## Example
//!
//! ```rust
//! use snapkeep_core::{KeepOnlyLastCommit, SnapshotDeletionPolicy};
//!
//! let policy = SnapshotDeletionPolicy::new(Box::new(KeepOnlyLastCommit));
//! // Nothing committed yet.
//! assert!(policy.snapshot_current().is_err());
//! ```

mod commit;
mod handle;
mod policy;
mod refs;

pub use commit::SnapshotCommit;
pub use handle::{SnapshotCommits, SnapshotHandle};
pub use policy::{LiveCommits, SnapshotDeletionPolicy};

use crate::commit::IndexCommit;
use crate::stats::SnapshotStats;
use crate::types::CommitVersion;
use refs::{RefTable, Release};
use tracing::{debug, trace, warn};

/// State shared by the policy, its commit wrappers and the handles it
/// gives out.
#[derive(Debug)]
pub(crate) struct SnapshotState {
    pub(crate) refs: RefTable,
    pub(crate) stats: SnapshotStats,
    reclaim_on_release: bool,
}

impl SnapshotState {
    pub(crate) fn new(reclaim_on_release: bool) -> Self {
        Self {
            refs: RefTable::new(),
            stats: SnapshotStats::new(),
            reclaim_on_release,
        }
    }

    pub(crate) fn acquire(&self, version: CommitVersion) {
        let count = self.refs.acquire(version);
        self.stats.record_acquire();
        trace!(version = %version, count, "snapshot acquired");
    }

    /// Drops one hold on `version`.
    ///
    /// Returns false if there was none. When the last hold of a commit with
    /// a postponed deletion goes away, the deletion runs here (if enabled)
    /// after the entry is gone, with no lock held.
    pub(crate) fn release(&self, version: CommitVersion) -> bool {
        match self.refs.release(version) {
            Release::Unknown => {
                self.stats.record_redundant_release();
                debug!(version = %version, "release of a version with no snapshot");
                false
            }
            Release::Held { remaining } => {
                self.stats.record_release();
                trace!(version = %version, remaining, "snapshot released");
                true
            }
            Release::Freed { pending } => {
                self.stats.record_release();
                trace!(version = %version, "last snapshot released");
                if let Some(commit) = pending {
                    self.reclaim(version, commit.as_ref());
                }
                true
            }
        }
    }

    fn reclaim(&self, version: CommitVersion, commit: &dyn IndexCommit) {
        if !self.reclaim_on_release {
            debug!(version = %version, "released commit left for the next commit cycle");
            return;
        }
        match commit.delete() {
            Ok(()) => {
                self.stats.record_reclaimed();
                debug!(version = %version, "reclaimed released commit");
            }
            Err(e) => {
                self.stats.record_reclaim_failure();
                warn!(version = %version, error = %e, "reclaiming released commit failed");
            }
        }
    }
}

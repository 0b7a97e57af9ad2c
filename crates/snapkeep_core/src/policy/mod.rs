//! Primary deletion policies.
//!
//! A deletion policy is told about the full, ordered commit history (oldest
//! first, newest last) at startup and after every commit, and calls
//! [`IndexCommit::delete`] on the commits the engine no longer needs.
//!
//! Policies must leave at least the newest commit alive.

mod retention;

pub use retention::{ExpireCommitsOlderThan, KeepAllCommits, KeepLastCommits, KeepOnlyLastCommit};

use crate::commit::IndexCommit;
use crate::error::CoreResult;
use std::sync::Arc;

/// Decides which commits may be deleted.
pub trait DeletionPolicy: Send + Sync {
    /// Called once when the writer opens an existing store.
    ///
    /// Defaults to [`on_commit`](Self::on_commit).
    ///
    /// # Errors
    ///
    /// Propagates errors raised while deleting commits.
    fn on_init(&self, commits: &[Arc<dyn IndexCommit>]) -> CoreResult<()> {
        self.on_commit(commits)
    }

    /// Called after every successful commit with the whole history.
    ///
    /// # Errors
    ///
    /// Propagates errors raised while deleting commits.
    fn on_commit(&self, commits: &[Arc<dyn IndexCommit>]) -> CoreResult<()>;
}

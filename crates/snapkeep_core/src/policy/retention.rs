//! Stock retention policies.

use crate::commit::IndexCommit;
use crate::error::CoreResult;
use crate::policy::DeletionPolicy;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Deletes every commit except the newest.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeepOnlyLastCommit;

impl DeletionPolicy for KeepOnlyLastCommit {
    fn on_commit(&self, commits: &[Arc<dyn IndexCommit>]) -> CoreResult<()> {
        delete_all_but_last(commits, 1)
    }
}

/// Never deletes anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeepAllCommits;

impl DeletionPolicy for KeepAllCommits {
    fn on_commit(&self, _commits: &[Arc<dyn IndexCommit>]) -> CoreResult<()> {
        Ok(())
    }
}

/// Keeps the `count` newest commits.
#[derive(Debug, Clone, Copy)]
pub struct KeepLastCommits {
    count: usize,
}

impl KeepLastCommits {
    /// Creates a policy keeping `count` commits. A count of zero is treated
    /// as one.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            count: count.max(1),
        }
    }

    /// Returns how many commits are kept.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }
}

impl DeletionPolicy for KeepLastCommits {
    fn on_commit(&self, commits: &[Arc<dyn IndexCommit>]) -> CoreResult<()> {
        delete_all_but_last(commits, self.count)
    }
}

/// Deletes commits written more than `max_age` before the newest commit.
///
/// Age is measured against the newest commit's timestamp rather than the
/// wall clock, so an idle engine keeps its history.
#[derive(Debug, Clone, Copy)]
pub struct ExpireCommitsOlderThan {
    max_age: Duration,
}

impl ExpireCommitsOlderThan {
    /// Creates a policy with the given maximum age.
    #[must_use]
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }
}

impl DeletionPolicy for ExpireCommitsOlderThan {
    fn on_commit(&self, commits: &[Arc<dyn IndexCommit>]) -> CoreResult<()> {
        let Some((newest, older)) = commits.split_last() else {
            return Ok(());
        };
        let max_age = u64::try_from(self.max_age.as_millis()).unwrap_or(u64::MAX);
        let cutoff = newest.timestamp_millis().saturating_sub(max_age);
        for commit in older {
            if commit.timestamp_millis() < cutoff {
                trace!(version = %commit.version(), "commit expired");
                commit.delete()?;
            }
        }
        Ok(())
    }
}

fn delete_all_but_last(commits: &[Arc<dyn IndexCommit>], keep: usize) -> CoreResult<()> {
    let doomed = commits.len().saturating_sub(keep);
    for commit in &commits[..doomed] {
        commit.delete()?;
    }
    Ok(())
}

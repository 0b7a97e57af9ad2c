//! Commit lifecycle configuration.

use crate::error::{CoreError, CoreResult};
use crate::policy::{
    DeletionPolicy, ExpireCommitsOlderThan, KeepAllCommits, KeepLastCommits, KeepOnlyLastCommit,
};
use std::time::Duration;

/// Which primary deletion policy the engine uses for its own needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryPolicy {
    /// Delete every commit except the most recent one.
    KeepOnlyLast,
    /// Never delete commits.
    KeepAll,
    /// Keep the given number of most recent commits.
    KeepLast(usize),
    /// Delete commits older than this relative to the newest commit.
    ExpireAfter(Duration),
}

impl PrimaryPolicy {
    /// Builds the deletion policy this variant describes.
    #[must_use]
    pub fn build(self) -> Box<dyn DeletionPolicy> {
        match self {
            Self::KeepOnlyLast => Box::new(KeepOnlyLastCommit),
            Self::KeepAll => Box::new(KeepAllCommits),
            Self::KeepLast(count) => Box::new(KeepLastCommits::new(count)),
            Self::ExpireAfter(max_age) => Box::new(ExpireCommitsOlderThan::new(max_age)),
        }
    }
}

/// Configuration for the commit writer and snapshot deletion policy.
#[derive(Debug, Clone)]
pub struct Config {
    /// Physically delete a deferred commit as soon as its last snapshot
    /// is released, instead of waiting for the next commit cycle.
    pub reclaim_on_release: bool,

    /// The primary deletion policy wrapped by the snapshot policy.
    pub primary: PrimaryPolicy,

    /// Whether to sync the artifact store after every commit.
    pub sync_on_commit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reclaim_on_release: true,
            primary: PrimaryPolicy::KeepOnlyLast,
            sync_on_commit: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether releasing the last hold reclaims inline.
    #[must_use]
    pub const fn reclaim_on_release(mut self, value: bool) -> Self {
        self.reclaim_on_release = value;
        self
    }

    /// Sets the primary deletion policy.
    #[must_use]
    pub const fn primary(mut self, policy: PrimaryPolicy) -> Self {
        self.primary = policy;
        self
    }

    /// Sets whether to sync the store on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Checks the configuration for values that cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] for `KeepLast(0)` and a zero
    /// expiry age; both would delete the newest commit.
    pub fn validate(&self) -> CoreResult<()> {
        match self.primary {
            PrimaryPolicy::KeepLast(0) => Err(CoreError::invalid_config(
                "KeepLast must keep at least one commit",
            )),
            PrimaryPolicy::ExpireAfter(age) if age.is_zero() => Err(CoreError::invalid_config(
                "ExpireAfter requires a non-zero age",
            )),
            _ => Ok(()),
        }
    }
}

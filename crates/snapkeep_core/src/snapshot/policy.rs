//! The snapshot deletion policy.

use crate::commit::IndexCommit;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::policy::DeletionPolicy;
use crate::snapshot::refs::Release;
use crate::snapshot::{SnapshotCommit, SnapshotCommits, SnapshotHandle, SnapshotState};
use crate::stats::SnapshotStatsSnapshot;
use crate::types::CommitVersion;
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// One published list of live commits.
///
/// Lists are immutable; every commit cycle publishes a new one. The last
/// element is the current commit.
#[derive(Debug)]
pub struct LiveCommits {
    generation: u64,
    commits: Vec<Arc<SnapshotCommit>>,
}

impl LiveCommits {
    /// Returns the list's generation; it increases by one per commit cycle.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the live commits, oldest first.
    pub fn commits(&self) -> &[Arc<SnapshotCommit>] {
        &self.commits
    }

    /// Returns the current (newest) commit.
    pub fn last(&self) -> Option<&Arc<SnapshotCommit>> {
        self.commits.last()
    }

    /// Finds a live commit by version.
    pub fn get(&self, version: CommitVersion) -> Option<&Arc<SnapshotCommit>> {
        self.commits.iter().find(|commit| commit.version() == version)
    }

    /// Returns the number of live commits.
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// Returns true if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}

/// A deletion policy that lets consumers pin commits.
///
/// Wraps a primary policy. On every commit cycle the raw commits are
/// wrapped in [`SnapshotCommit`]s before the primary sees them, so any
/// deletion the primary asks for on a snapshotted commit is postponed until
/// the snapshot is released.
///
/// # Concurrency
///
/// One writer drives `on_init`/`on_commit`; any number of threads may
/// snapshot and release concurrently.
///
/// - A structural mutex serializes commit cycles against `snapshot*`, so a
///   bundle never mixes two cycles.
/// - The live list is published through an atomic pointer; [`commits`]
///   reads it without locking.
/// - Hold counts live in a sharded map with per-version atomicity; releases
///   never take the structural mutex.
///
/// [`commits`]: Self::commits
pub struct SnapshotDeletionPolicy {
    primary: Box<dyn DeletionPolicy>,
    state: Arc<SnapshotState>,
    live: ArcSwapOption<LiveCommits>,
    mutex: Mutex<()>,
}

impl SnapshotDeletionPolicy {
    /// Wraps `primary`, reclaiming released commits inline.
    pub fn new(primary: Box<dyn DeletionPolicy>) -> Self {
        Self::with_primary(primary, true)
    }

    /// Builds the policy and its primary from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_config(config: &Config) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self::with_primary(
            config.primary.build(),
            config.reclaim_on_release,
        ))
    }

    fn with_primary(primary: Box<dyn DeletionPolicy>, reclaim_on_release: bool) -> Self {
        Self {
            primary,
            state: Arc::new(SnapshotState::new(reclaim_on_release)),
            live: ArcSwapOption::empty(),
            mutex: Mutex::new(()),
        }
    }

    /// Snapshots every live commit.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotInitialized`] before the first commit cycle.
    pub fn snapshot(&self) -> CoreResult<SnapshotCommits> {
        let _guard = self.mutex.lock();
        let live = self.live.load_full().ok_or(CoreError::NotInitialized)?;
        let handles = live
            .commits
            .iter()
            .map(|commit| self.acquire(commit))
            .collect();
        Ok(SnapshotCommits::new(live.generation, handles))
    }

    /// Snapshots the current commit.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotInitialized`] before the first commit cycle.
    pub fn snapshot_current(&self) -> CoreResult<SnapshotHandle> {
        let _guard = self.mutex.lock();
        let live = self.live.load_full().ok_or(CoreError::NotInitialized)?;
        let last = live.last().ok_or(CoreError::NotInitialized)?;
        Ok(self.acquire(last))
    }

    /// Snapshots a specific commit.
    ///
    /// The commit may come from an older live list. It can be snapshotted
    /// as long as it is still live, or still held by another snapshot.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotInitialized`] before the first commit cycle
    /// - [`CoreError::CommitReleased`] if the commit is neither live nor held
    pub fn snapshot_commit(&self, commit: &Arc<SnapshotCommit>) -> CoreResult<SnapshotHandle> {
        let _guard = self.mutex.lock();
        let live = self.live.load_full().ok_or(CoreError::NotInitialized)?;
        let version = commit.version();
        if let Some(current) = live.get(version) {
            return Ok(self.acquire(current));
        }
        if self.state.refs.acquire_if_held(version).is_some() {
            self.state.stats.record_acquire();
            return Ok(SnapshotHandle::new(
                Arc::clone(commit),
                Arc::clone(&self.state),
            ));
        }
        Err(CoreError::CommitReleased { version })
    }

    fn acquire(&self, commit: &Arc<SnapshotCommit>) -> SnapshotHandle {
        self.state.acquire(commit.version());
        SnapshotHandle::new(Arc::clone(commit), Arc::clone(&self.state))
    }

    /// Returns the currently published live list, without locking.
    pub fn commits(&self) -> Option<Arc<LiveCommits>> {
        self.live.load_full()
    }

    /// Returns the versions that currently have snapshots, ascending.
    pub fn held_versions(&self) -> Vec<CommitVersion> {
        self.state.refs.versions()
    }

    /// Returns the number of snapshots holding `version`.
    pub fn hold_count(&self, version: CommitVersion) -> usize {
        self.state.refs.count(version)
    }

    /// Returns true if `version` has a deletion waiting on its snapshots.
    pub fn is_deletion_pending(&self, version: CommitVersion) -> bool {
        self.state.refs.has_pending(version)
    }

    /// Returns usage statistics.
    pub fn stats(&self) -> SnapshotStatsSnapshot {
        self.state.stats.snapshot()
    }

    fn wrap(&self, commits: &[Arc<dyn IndexCommit>]) -> Vec<Arc<SnapshotCommit>> {
        commits
            .iter()
            .map(|commit| {
                Arc::new(SnapshotCommit::new(
                    Arc::clone(commit),
                    Arc::clone(&self.state),
                ))
            })
            .collect()
    }
}

impl DeletionPolicy for SnapshotDeletionPolicy {
    fn on_commit(&self, commits: &[Arc<dyn IndexCommit>]) -> CoreResult<()> {
        let _guard = self.mutex.lock();

        let wrapped = self.wrap(commits);
        let Some(newest) = wrapped.last().map(|commit| commit.version()) else {
            debug!("commit cycle without commits");
            return Ok(());
        };
        let delegated: Vec<Arc<dyn IndexCommit>> = wrapped
            .iter()
            .map(|commit| Arc::clone(commit) as Arc<dyn IndexCommit>)
            .collect();

        // Pin the newest commit while the primary decides
        self.state.refs.acquire(newest);
        let decided = self.primary.on_commit(&delegated);
        let unpinned = self.state.refs.release(newest);

        // Entries at zero should never survive a release
        let swept = self.state.refs.sweep();
        if swept > 0 {
            self.state.stats.record_swept(swept as u64);
            warn!(swept, "removed snapshot entries without holds");
        }

        let mut live: Vec<Arc<SnapshotCommit>> = wrapped
            .into_iter()
            .filter(|commit| !commit.is_deleted())
            .collect();
        let generation = self
            .live
            .load_full()
            .map_or(1, |previous| previous.generation + 1);

        let exhausted = live.is_empty();
        let mut reclaimed = Ok(());
        if let Release::Freed {
            pending: Some(inner),
        } = unpinned
        {
            if !exhausted {
                reclaimed = inner.delete();
            }
        }
        if exhausted {
            if let Some(inner) = commits.last().filter(|commit| !commit.is_deleted()) {
                warn!(version = %newest, "primary policy deleted every commit, keeping the newest");
                live.push(Arc::new(SnapshotCommit::new(
                    Arc::clone(inner),
                    Arc::clone(&self.state),
                )));
            }
        }
        if live.is_empty() {
            self.live.store(None);
            decided?;
            return Err(CoreError::NoLiveCommits { generation });
        }

        for commit in &live {
            self.state.refs.clear_pending(commit.version());
        }
        let count = live.len();
        self.live.store(Some(Arc::new(LiveCommits {
            generation,
            commits: live,
        })));
        self.state.stats.record_commit();
        debug!(generation, live = count, current = %newest, "published live commits");

        // A primary that failed partway is reported only after the
        // survivors replace a list that may name commits it removed
        decided?;
        reclaimed?;
        if exhausted {
            return Err(CoreError::NoLiveCommits { generation });
        }
        Ok(())
    }
}

impl std::fmt::Debug for SnapshotDeletionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotDeletionPolicy")
            .field("live", &self.live.load_full().map(|live| live.len()))
            .field("held", &self.state.refs.len())
            .finish()
    }
}

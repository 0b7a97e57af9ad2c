//! Shard lifecycle gate.
//!
//! An [`IndexShard`] couples a commit writer with its snapshot deletion
//! policy and only lets commits and snapshots through in the lifecycle
//! states where they make sense.

use crate::commit::StoredCommit;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::policy::DeletionPolicy;
use crate::snapshot::{SnapshotCommits, SnapshotDeletionPolicy, SnapshotHandle};
use crate::stats::SnapshotStatsSnapshot;
use crate::types::CommitVersion;
use crate::writer::{CommitChanges, CommitWriter};
use parking_lot::RwLock;
use snapkeep_storage::ArtifactStore;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Lifecycle state of a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ShardState {
    /// Created, no store attached yet.
    Created = 0,
    /// Existing commits loaded; the shard is catching up.
    Recovering = 1,
    /// Serving.
    Started = 2,
    /// Handed off to another node, still readable.
    Relocated = 3,
    /// Closed.
    Closed = 4,
}

impl ShardState {
    /// Returns the state's numeric id.
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Converts a numeric id to a state.
    ///
    /// # Errors
    ///
    /// Returns an error for ids that name no state.
    pub fn from_id(id: u8) -> CoreResult<Self> {
        match id {
            0 => Ok(Self::Created),
            1 => Ok(Self::Recovering),
            2 => Ok(Self::Started),
            3 => Ok(Self::Relocated),
            4 => Ok(Self::Closed),
            _ => Err(CoreError::invalid_operation(format!(
                "no shard state for id [{id}]"
            ))),
        }
    }

    /// Returns true if commits may be written in this state.
    #[must_use]
    pub const fn allows_commit(self) -> bool {
        matches!(self, Self::Recovering | Self::Started | Self::Relocated)
    }

    /// Returns true if snapshots may be taken in this state.
    #[must_use]
    pub const fn allows_snapshot(self) -> bool {
        matches!(self, Self::Started | Self::Relocated)
    }

    /// Returns true if the shard may move from this state to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Recovering)
                | (Self::Recovering, Self::Started)
                | (Self::Started, Self::Relocated)
                | (
                    Self::Created | Self::Recovering | Self::Started | Self::Relocated,
                    Self::Closed
                )
        )
    }
}

impl fmt::Display for ShardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "CREATED",
            Self::Recovering => "RECOVERING",
            Self::Started => "STARTED",
            Self::Relocated => "RELOCATED",
            Self::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// A writer, its snapshot policy and a lifecycle state.
pub struct IndexShard {
    config: Config,
    policy: Arc<SnapshotDeletionPolicy>,
    writer: RwLock<Option<Arc<CommitWriter>>>,
    state: RwLock<ShardState>,
}

impl IndexShard {
    /// Creates a shard in the [`ShardState::Created`] state.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: Config) -> CoreResult<Self> {
        let policy = Arc::new(SnapshotDeletionPolicy::with_config(&config)?);
        Ok(Self {
            config,
            policy,
            writer: RwLock::new(None),
            state: RwLock::new(ShardState::Created),
        })
    }

    /// Opens the commit writer over `store` and enters recovery.
    ///
    /// # Errors
    ///
    /// Returns an error if the shard is not in the created state, or if
    /// the writer fails to open. A failed open leaves the shard created.
    pub fn recover(&self, store: Arc<dyn ArtifactStore>) -> CoreResult<()> {
        let mut state = self.state.write();
        Self::check_transition(*state, ShardState::Recovering)?;
        let policy: Arc<dyn DeletionPolicy> = self.policy.clone();
        let writer = CommitWriter::open(store, policy, &self.config)?;
        *self.writer.write() = Some(Arc::new(writer));
        *state = ShardState::Recovering;
        info!(state = %*state, "shard recovering");
        Ok(())
    }

    /// Marks recovery as finished.
    ///
    /// # Errors
    ///
    /// Returns an error unless the shard is recovering.
    pub fn start(&self) -> CoreResult<()> {
        self.transition(ShardState::Started)
    }

    /// Marks the shard as relocated.
    ///
    /// # Errors
    ///
    /// Returns an error unless the shard is started.
    pub fn relocated(&self) -> CoreResult<()> {
        self.transition(ShardState::Relocated)
    }

    /// Closes the shard. Closing a closed shard does nothing.
    ///
    /// Outstanding snapshot handles stay valid and can still be released.
    pub fn close(&self) {
        let mut state = self.state.write();
        if *state == ShardState::Closed {
            return;
        }
        *self.writer.write() = None;
        *state = ShardState::Closed;
        info!("shard closed");
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> ShardState {
        *self.state.read()
    }

    /// Writes a commit.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IllegalShardState`] unless the shard is
    /// recovering, started or relocated, and otherwise propagates writer
    /// errors.
    pub fn commit(&self, changes: CommitChanges) -> CoreResult<Arc<StoredCommit>> {
        let state = self.state.read();
        if !state.allows_commit() {
            return Err(CoreError::illegal_shard_state(*state, "commit"));
        }
        let writer = self.writer.read().clone();
        let writer = writer.ok_or_else(|| CoreError::illegal_shard_state(*state, "commit"))?;
        writer.commit(changes)
    }

    /// Snapshots every live commit.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IllegalShardState`] unless the shard is started
    /// or relocated.
    pub fn snapshot(&self) -> CoreResult<SnapshotCommits> {
        let state = self.state.read();
        if !state.allows_snapshot() {
            return Err(CoreError::illegal_shard_state(*state, "snapshot"));
        }
        self.policy.snapshot()
    }

    /// Snapshots the current commit.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IllegalShardState`] unless the shard is started
    /// or relocated.
    pub fn snapshot_current(&self) -> CoreResult<SnapshotHandle> {
        let state = self.state.read();
        if !state.allows_snapshot() {
            return Err(CoreError::illegal_shard_state(*state, "snapshot"));
        }
        self.policy.snapshot_current()
    }

    /// Returns the versions currently held by snapshots, ascending.
    ///
    /// Readable in every state; snapshots themselves go through
    /// [`snapshot`](Self::snapshot) and [`snapshot_current`](Self::snapshot_current).
    pub fn held_versions(&self) -> Vec<CommitVersion> {
        self.policy.held_versions()
    }

    /// Returns the snapshot policy's usage statistics.
    pub fn stats(&self) -> SnapshotStatsSnapshot {
        self.policy.stats()
    }

    /// Returns the commit writer, if the shard has one.
    pub fn writer(&self) -> Option<Arc<CommitWriter>> {
        self.writer.read().clone()
    }

    fn transition(&self, next: ShardState) -> CoreResult<()> {
        let mut state = self.state.write();
        Self::check_transition(*state, next)?;
        *state = next;
        info!(state = %next, "shard state changed");
        Ok(())
    }

    fn check_transition(current: ShardState, next: ShardState) -> CoreResult<()> {
        if current.can_transition_to(next) {
            Ok(())
        } else {
            Err(CoreError::invalid_operation(format!(
                "cannot move shard from {current} to {next}"
            )))
        }
    }
}

impl fmt::Debug for IndexShard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexShard")
            .field("state", &self.state())
            .field("policy", &self.policy)
            .finish()
    }
}

//! Snapshot handles given to consumers.

use crate::commit::IndexCommit;
use crate::error::CoreResult;
use crate::snapshot::{SnapshotCommit, SnapshotState};
use crate::types::{CommitVersion, Generation};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One hold on one commit.
///
/// Releasing takes effect at most once, however many times `release` is
/// called. A handle that is dropped without being released releases
/// itself.
///
/// The handle is itself an [`IndexCommit`] forwarding to the snapshotted
/// commit, so it can be handed to anything that reads commits.
///
/// A hold can only be dropped through its handle:
///
/// ```compile_fail
/// use snapkeep_core::{CommitVersion, KeepOnlyLastCommit, SnapshotDeletionPolicy};
///
/// let policy = SnapshotDeletionPolicy::new(Box::new(KeepOnlyLastCommit));
/// policy.release(CommitVersion::new(1));
/// ```
pub struct SnapshotHandle {
    commit: Arc<SnapshotCommit>,
    state: Arc<SnapshotState>,
    released: AtomicBool,
}

impl SnapshotHandle {
    pub(crate) fn new(commit: Arc<SnapshotCommit>, state: Arc<SnapshotState>) -> Self {
        Self {
            commit,
            state,
            released: AtomicBool::new(false),
        }
    }

    /// Releases the hold.
    ///
    /// Returns false if this handle was already released, or if the policy
    /// had no hold for the version.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.state.release(self.commit.version())
    }

    /// Returns true once [`release`](Self::release) has been called.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Returns the snapshotted commit.
    pub fn commit(&self) -> &Arc<SnapshotCommit> {
        &self.commit
    }
}

impl IndexCommit for SnapshotHandle {
    fn version(&self) -> CommitVersion {
        self.commit.version()
    }

    fn generation(&self) -> Generation {
        self.commit.generation()
    }

    fn timestamp_millis(&self) -> u64 {
        self.commit.timestamp_millis()
    }

    fn manifest_name(&self) -> &str {
        self.commit.manifest_name()
    }

    fn file_names(&self) -> &[String] {
        self.commit.file_names()
    }

    fn delete(&self) -> CoreResult<()> {
        self.commit.delete()
    }

    fn is_deleted(&self) -> bool {
        self.commit.is_deleted()
    }
}

impl Drop for SnapshotHandle {
    fn drop(&mut self) {
        if !self.is_released() {
            self.release();
        }
    }
}

impl fmt::Debug for SnapshotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotHandle")
            .field("version", &self.commit.version())
            .field("released", &self.is_released())
            .finish()
    }
}

/// Holds on every commit of one live commit list, oldest first.
#[derive(Debug)]
pub struct SnapshotCommits {
    generation: u64,
    handles: Vec<SnapshotHandle>,
}

impl SnapshotCommits {
    pub(crate) fn new(generation: u64, handles: Vec<SnapshotHandle>) -> Self {
        Self {
            generation,
            handles,
        }
    }

    /// Returns the generation of the live list this bundle was taken from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the handles, oldest commit first.
    pub fn handles(&self) -> &[SnapshotHandle] {
        &self.handles
    }

    /// Returns the newest commit's handle.
    pub fn last(&self) -> Option<&SnapshotHandle> {
        self.handles.last()
    }

    /// Returns the snapshotted versions, oldest first.
    pub fn versions(&self) -> Vec<CommitVersion> {
        self.handles.iter().map(IndexCommit::version).collect()
    }

    /// Returns the number of snapshotted commits.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns true if the bundle is empty.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Iterates over the handles, oldest commit first.
    pub fn iter(&self) -> std::slice::Iter<'_, SnapshotHandle> {
        self.handles.iter()
    }

    /// Releases every handle.
    ///
    /// Returns true only if every release took effect.
    pub fn release(&self) -> bool {
        let mut all = true;
        for handle in &self.handles {
            all &= handle.release();
        }
        all
    }
}

impl<'a> IntoIterator for &'a SnapshotCommits {
    type Item = &'a SnapshotHandle;
    type IntoIter = std::slice::Iter<'a, SnapshotHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.handles.iter()
    }
}

impl IntoIterator for SnapshotCommits {
    type Item = SnapshotHandle;
    type IntoIter = std::vec::IntoIter<SnapshotHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.handles.into_iter()
    }
}

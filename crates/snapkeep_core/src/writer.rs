//! Reference single-writer commit pipeline.
//!
//! The writer turns batches of artifact changes into commit points and
//! tells its deletion policy about the history after each one. It has no
//! merge or flush logic of its own; callers decide which artifacts a
//! commit adds and which it drops.

use crate::commit::{CommitManifest, FileDeleter, IndexCommit, StoredCommit, MANIFEST_PREFIX};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::policy::DeletionPolicy;
use crate::types::{CommitVersion, Generation};
use parking_lot::Mutex;
use snapkeep_storage::ArtifactStore;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Artifact changes making up one commit.
///
/// The new commit references the current commit's artifacts, minus the
/// removed ones, plus the added ones.
#[derive(Debug, Clone, Default)]
pub struct CommitChanges {
    add: Vec<(String, Vec<u8>)>,
    remove: Vec<String>,
    timestamp_millis: Option<u64>,
}

impl CommitChanges {
    /// Creates an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new artifact.
    #[must_use]
    pub fn add(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.add.push((name.into(), data.into()));
        self
    }

    /// Stops referencing an artifact of the current commit.
    #[must_use]
    pub fn remove(mut self, name: impl Into<String>) -> Self {
        self.remove.push(name.into());
        self
    }

    /// Overrides the commit timestamp (Unix milliseconds).
    #[must_use]
    pub fn at(mut self, timestamp_millis: u64) -> Self {
        self.timestamp_millis = Some(timestamp_millis);
        self
    }

    /// Returns true if the change set neither adds nor removes anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

struct WriterState {
    /// Commits not yet deleted, oldest first.
    history: Vec<Arc<StoredCommit>>,
    next_version: CommitVersion,
    next_generation: Generation,
    last_timestamp: u64,
}

/// Writes commit points to an artifact store.
///
/// Only one commit runs at a time. The deletion policy is called with the
/// whole undeleted history after every commit, and once with the existing
/// history when the writer opens a non-empty store.
pub struct CommitWriter {
    store: Arc<dyn ArtifactStore>,
    deleter: Arc<FileDeleter>,
    policy: Arc<dyn DeletionPolicy>,
    sync_on_commit: bool,
    state: Mutex<WriterState>,
}

impl CommitWriter {
    /// Reads every commit manifest in `store`, oldest first.
    ///
    /// Does not modify the store.
    ///
    /// # Errors
    ///
    /// Returns an error if a manifest cannot be read or decoded, or if
    /// versions do not increase with generations.
    pub fn read_commits(store: &dyn ArtifactStore) -> CoreResult<Vec<CommitManifest>> {
        let mut generations: Vec<Generation> = store
            .list()?
            .iter()
            .filter_map(|name| CommitManifest::parse_file_name(name))
            .collect();
        generations.sort_unstable();

        let mut manifests: Vec<CommitManifest> = Vec::with_capacity(generations.len());
        for generation in generations {
            let data = store.read(&CommitManifest::file_name(generation))?;
            let manifest = CommitManifest::decode(&data)?;
            if manifest.generation != generation {
                return Err(CoreError::invalid_format(format!(
                    "manifest {generation} claims {}",
                    manifest.generation
                )));
            }
            if let Some(previous) = manifests.last() {
                if manifest.version <= previous.version {
                    return Err(CoreError::OutOfOrder { generation });
                }
            }
            manifests.push(manifest);
        }
        Ok(manifests)
    }

    /// Opens a writer over `store`.
    ///
    /// Existing commits are loaded and handed to `policy.on_init`.
    /// Artifacts no commit references are deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if existing commits cannot be read, or if the
    /// policy fails to apply its initial deletions.
    pub fn open(
        store: Arc<dyn ArtifactStore>,
        policy: Arc<dyn DeletionPolicy>,
        config: &Config,
    ) -> CoreResult<Self> {
        let manifests = Self::read_commits(store.as_ref())?;
        let deleter = Arc::new(FileDeleter::new(Arc::clone(&store)));

        let history: Vec<Arc<StoredCommit>> = manifests
            .into_iter()
            .map(|manifest| {
                let commit = StoredCommit::new(manifest, Arc::clone(&deleter));
                deleter.incref(commit.file_names());
                Arc::new(commit)
            })
            .collect();

        for name in store.list()? {
            if !deleter.is_referenced(&name) {
                debug!(file = %name, "deleting unreferenced artifact");
                store.delete(&name)?;
            }
        }

        let (next_version, next_generation, last_timestamp) = match history.last() {
            Some(last) => (
                last.version().next(),
                last.generation().next(),
                last.timestamp_millis(),
            ),
            None => (CommitVersion::new(1), Generation::new(1), 0),
        };

        let writer = Self {
            store,
            deleter,
            policy,
            sync_on_commit: config.sync_on_commit,
            state: Mutex::new(WriterState {
                history,
                next_version,
                next_generation,
                last_timestamp,
            }),
        };

        {
            let mut state = writer.state.lock();
            if !state.history.is_empty() {
                let decided = writer.policy.on_init(&as_index_commits(&state.history));
                state.history.retain(|commit| !commit.is_deleted());
                decided?;
            }
            info!(commits = state.history.len(), "opened commit writer");
        }

        Ok(writer)
    }

    /// Writes a new commit and runs the deletion policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the changes are inconsistent with the current
    /// commit, if the store fails, or if the deletion policy fails. In the
    /// last case the new commit is already durable.
    pub fn commit(&self, changes: CommitChanges) -> CoreResult<Arc<StoredCommit>> {
        let mut state = self.state.lock();

        if let Err(e) = self.deleter.retry_pending() {
            warn!(error = %e, "artifact deletions still failing");
        }
        state.history.retain(|commit| !commit.is_deleted());

        let mut files: BTreeSet<String> = state
            .history
            .last()
            .map(|commit| commit.data_files().iter().cloned().collect())
            .unwrap_or_default();
        for name in &changes.remove {
            if !files.remove(name) {
                return Err(CoreError::invalid_operation(format!(
                    "{name} is not part of the current commit"
                )));
            }
        }
        for (name, _) in &changes.add {
            if name.starts_with(MANIFEST_PREFIX) {
                return Err(CoreError::invalid_operation(format!(
                    "{name} uses the reserved manifest prefix"
                )));
            }
            if !files.insert(name.clone()) {
                return Err(CoreError::invalid_operation(format!(
                    "{name} is already part of the commit"
                )));
            }
        }

        for (name, data) in &changes.add {
            self.store.write(name, data)?;
        }

        let timestamp_millis = changes
            .timestamp_millis
            .unwrap_or_else(now_millis)
            .max(state.last_timestamp);
        let manifest = CommitManifest {
            version: state.next_version,
            generation: state.next_generation,
            timestamp_millis,
            files: files.into_iter().collect(),
        };
        self.store.write(&manifest.name(), &manifest.encode()?)?;
        if self.sync_on_commit {
            self.store.sync()?;
        }

        let commit = Arc::new(StoredCommit::new(manifest, Arc::clone(&self.deleter)));
        self.deleter.incref(commit.file_names());
        state.history.push(Arc::clone(&commit));
        state.next_version = state.next_version.next();
        state.next_generation = state.next_generation.next();
        state.last_timestamp = timestamp_millis;

        let decided = self.policy.on_commit(&as_index_commits(&state.history));
        state.history.retain(|commit| !commit.is_deleted());
        decided?;

        debug!(
            version = %commit.version(),
            generation = %commit.generation(),
            files = commit.data_files().len(),
            retained = state.history.len(),
            "committed"
        );
        Ok(commit)
    }

    /// Returns the undeleted commits, oldest first.
    ///
    /// Commits reclaimed by a snapshot release since the last commit are
    /// skipped.
    pub fn commits(&self) -> Vec<Arc<StoredCommit>> {
        self.state
            .lock()
            .history
            .iter()
            .filter(|commit| !commit.is_deleted())
            .cloned()
            .collect()
    }

    /// Returns the newest commit.
    pub fn current(&self) -> Option<Arc<StoredCommit>> {
        self.state
            .lock()
            .history
            .iter()
            .rev()
            .find(|commit| !commit.is_deleted())
            .cloned()
    }

    /// Returns the artifact store.
    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Returns the artifact reference tracker.
    pub fn deleter(&self) -> &Arc<FileDeleter> {
        &self.deleter
    }
}

impl std::fmt::Debug for CommitWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CommitWriter")
            .field("commits", &state.history.len())
            .field("next_version", &state.next_version)
            .finish()
    }
}

fn as_index_commits(history: &[Arc<StoredCommit>]) -> Vec<Arc<dyn IndexCommit>> {
    history
        .iter()
        .map(|commit| Arc::clone(commit) as Arc<dyn IndexCommit>)
        .collect()
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

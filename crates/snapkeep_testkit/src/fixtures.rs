//! Test fixtures and engine helpers.
//!
//! Provides a commit writer wired to a snapshot deletion policy over a
//! throwaway store.

use snapkeep_core::{
    CommitChanges, CommitWriter, Config, IndexCommit, SnapshotDeletionPolicy, StoredCommit,
};
use snapkeep_storage::{ArtifactStore, DirectoryStore, InMemoryStore};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// A writer and snapshot policy over a test store.
pub struct TestEngine {
    /// The artifact store.
    pub store: Arc<dyn ArtifactStore>,
    /// The snapshot deletion policy the writer reports to.
    pub policy: Arc<SnapshotDeletionPolicy>,
    /// The commit writer.
    pub writer: CommitWriter,
    config: Config,
    next_segment: AtomicUsize,
    _temp_dir: Option<TempDir>,
}

impl TestEngine {
    /// Creates an in-memory engine with the default configuration.
    pub fn memory() -> Self {
        Self::memory_with(Config::default())
    }

    /// Creates an in-memory engine.
    pub fn memory_with(config: Config) -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()), config)
    }

    /// Creates an engine over a temporary directory.
    pub fn directory() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = DirectoryStore::open(temp_dir.path()).expect("Failed to open directory store");
        let mut engine = Self::with_store(Arc::new(store), Config::default());
        engine._temp_dir = Some(temp_dir);
        engine
    }

    /// Creates an engine over an existing store.
    pub fn with_store(store: Arc<dyn ArtifactStore>, config: Config) -> Self {
        let policy = Arc::new(
            SnapshotDeletionPolicy::with_config(&config).expect("Invalid test configuration"),
        );
        let writer = CommitWriter::open(Arc::clone(&store), policy.clone(), &config)
            .expect("Failed to open commit writer");
        let next_segment = writer
            .current()
            .map_or(0, |commit| commit.version().as_u64() as usize);
        Self {
            store,
            policy,
            writer,
            config,
            next_segment: AtomicUsize::new(next_segment),
            _temp_dir: None,
        }
    }

    /// Reopens the writer over the same store with a fresh policy.
    ///
    /// Snapshots taken from the old policy do not carry over.
    pub fn reopen(self) -> Self {
        let Self {
            store,
            config,
            _temp_dir,
            ..
        } = self;
        let mut engine = Self::with_store(store, config);
        engine._temp_dir = _temp_dir;
        engine
    }

    /// Commits one new artifact on top of the current commit.
    pub fn commit_file(&self, name: &str) -> Arc<StoredCommit> {
        self.writer
            .commit(CommitChanges::new().add(name, name.as_bytes()))
            .expect("Failed to commit")
    }

    /// Commits a fresh segment that replaces every current artifact, the
    /// way a full merge would.
    pub fn commit_segment(&self) -> Arc<StoredCommit> {
        self.try_commit_segment().expect("Failed to commit")
    }

    /// Like [`commit_segment`](Self::commit_segment), but returns errors.
    pub fn try_commit_segment(&self) -> snapkeep_core::CoreResult<Arc<StoredCommit>> {
        let n = self.next_segment.fetch_add(1, Ordering::SeqCst);
        let mut changes = CommitChanges::new();
        if let Some(current) = self.writer.current() {
            for name in current.data_files() {
                changes = changes.remove(name.clone());
            }
        }
        let name = format!("_{n}.seg");
        let data = name.clone().into_bytes();
        self.writer.commit(changes.add(name, data))
    }

    /// Returns true if every artifact of `commit` is in the store.
    pub fn files_exist(&self, commit: &dyn IndexCommit) -> bool {
        commit
            .file_names()
            .iter()
            .all(|name| self.store.exists(name).unwrap_or(false))
    }

    /// Returns the directory backing the store, if any.
    pub fn path(&self) -> Option<&Path> {
        self._temp_dir.as_ref().map(TempDir::path)
    }
}

impl std::fmt::Debug for TestEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestEngine")
            .field("writer", &self.writer)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Runs a test with a temporary in-memory engine.
///
/// # Example
///
/// ```rust
/// use snapkeep_testkit::with_engine;
///
/// with_engine(|engine| {
///     let commit = engine.commit_segment();
///     assert!(engine.files_exist(&*commit));
/// });
/// ```
pub fn with_engine<F, R>(f: F) -> R
where
    F: FnOnce(&TestEngine) -> R,
{
    let engine = TestEngine::memory();
    f(&engine)
}

/// Runs a test with an engine over a temporary directory.
pub fn with_directory_engine<F, R>(f: F) -> R
where
    F: FnOnce(&TestEngine, &Path) -> R,
{
    let engine = TestEngine::directory();
    let path = engine
        .path()
        .expect("Directory engine should have a path")
        .to_path_buf();
    f(&engine, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates an engine that has already written `commits` segment
    /// commits.
    pub fn engine_with_commits(commits: usize, config: Config) -> TestEngine {
        let engine = TestEngine::memory_with(config);
        for _ in 0..commits {
            engine.commit_segment();
        }
        engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapkeep_core::{CommitVersion, PrimaryPolicy};

    #[test]
    fn test_memory_engine() {
        let engine = TestEngine::memory();
        assert!(engine.policy.commits().is_none());
        let commit = engine.commit_segment();
        assert_eq!(commit.version(), CommitVersion::new(1));
        assert_eq!(commit.data_files(), ["_0.seg"]);
    }

    #[test]
    fn test_segments_replace_each_other() {
        with_engine(|engine| {
            engine.commit_segment();
            let second = engine.commit_segment();
            assert_eq!(second.data_files(), ["_1.seg"]);
            assert!(!engine.store.exists("_0.seg").unwrap());
        });
    }

    #[test]
    fn test_directory_engine() {
        with_directory_engine(|engine, path| {
            let commit = engine.commit_file("a.seg");
            assert!(path.join("a.seg").exists());
            assert!(path.join(commit.manifest_name()).exists());
        });
    }

    #[test]
    fn test_reopen_keeps_commits() {
        let engine = scenarios::engine_with_commits(
            3,
            Config::default().primary(PrimaryPolicy::KeepAll),
        );
        let engine = engine.reopen();
        assert_eq!(engine.writer.commits().len(), 3);
        assert_eq!(engine.commit_segment().data_files(), ["_3.seg"]);
    }
}

//! Cross-crate integration test helpers.
//!
//! Provides a harness that drives a real writer and snapshot policy while
//! tracking the expected hold counts, and checks retention invariants
//! after every step.

use crate::fixtures::TestEngine;
use crate::generators::SnapshotOp;
use snapkeep_core::{CommitVersion, Config, CoreError, CoreResult, IndexCommit, SnapshotHandle};
use std::collections::{BTreeMap, BTreeSet};

/// A test harness checking snapshot retention against a model.
pub struct RetentionHarness {
    /// The engine under test.
    pub engine: TestEngine,
    handles: Vec<SnapshotHandle>,
    model: BTreeMap<CommitVersion, usize>,
}

impl RetentionHarness {
    /// Creates a harness over an in-memory engine.
    pub fn new(config: Config) -> Self {
        Self {
            engine: TestEngine::memory_with(config),
            handles: Vec::new(),
            model: BTreeMap::new(),
        }
    }

    /// Applies one operation and updates the model.
    pub fn apply(&mut self, op: &SnapshotOp) -> CoreResult<()> {
        match op {
            SnapshotOp::Commit => {
                self.engine.try_commit_segment()?;
            }
            SnapshotOp::SnapshotCurrent => match self.engine.policy.snapshot_current() {
                Ok(handle) => self.track(handle),
                Err(CoreError::NotInitialized) => {
                    assert!(self.engine.writer.current().is_none());
                }
                Err(e) => return Err(e),
            },
            SnapshotOp::SnapshotAll => match self.engine.policy.snapshot() {
                Ok(bundle) => {
                    for handle in bundle {
                        self.track(handle);
                    }
                }
                Err(CoreError::NotInitialized) => {
                    assert!(self.engine.writer.current().is_none());
                }
                Err(e) => return Err(e),
            },
            SnapshotOp::Release { index } => {
                if let Some(handle) = self.take(*index) {
                    assert!(handle.release(), "first release must take effect");
                }
            }
            SnapshotOp::ReleaseTwice { index } => {
                if let Some(handle) = self.take(*index) {
                    assert!(handle.release());
                    assert!(!handle.release(), "second release must be a no-op");
                }
            }
            SnapshotOp::Drop { index } => {
                drop(self.take(*index));
            }
        }
        Ok(())
    }

    /// Releases every outstanding handle.
    pub fn release_all(&mut self) {
        for handle in self.handles.drain(..) {
            assert!(handle.release());
        }
        self.model.clear();
    }

    /// Returns the number of outstanding handles.
    pub fn outstanding(&self) -> usize {
        self.handles.len()
    }

    /// Checks every retention invariant.
    ///
    /// # Panics
    ///
    /// Panics with a description of the first violated invariant.
    pub fn verify(&self) {
        let policy = &self.engine.policy;

        let held: Vec<CommitVersion> = self.model.keys().copied().collect();
        assert_eq!(policy.held_versions(), held, "held versions diverged");
        for (version, count) in &self.model {
            assert_eq!(policy.hold_count(*version), *count, "hold count of {version}");
        }

        for handle in &self.handles {
            assert!(
                !handle.commit().inner().is_deleted(),
                "held commit {} was deleted",
                handle.version()
            );
            assert!(
                self.engine.files_exist(handle),
                "held commit {} lost artifacts",
                handle.version()
            );
        }

        if let Some(live) = policy.commits() {
            assert!(!live.is_empty(), "published an empty live list");
            for commit in live.commits() {
                assert!(self.engine.files_exist(&**commit));
            }
        }

        // Artifacts on the store are exactly those of undeleted commits
        let referenced: BTreeSet<String> = self
            .engine
            .writer
            .commits()
            .iter()
            .flat_map(|commit| commit.file_names().to_vec())
            .collect();
        let stored: BTreeSet<String> = self
            .engine
            .store
            .list()
            .expect("Failed to list store")
            .into_iter()
            .collect();
        assert_eq!(stored, referenced, "store holds unreferenced artifacts");

        assert_eq!(policy.stats().swept_entries, 0);
    }

    fn track(&mut self, handle: SnapshotHandle) {
        *self.model.entry(handle.version()).or_insert(0) += 1;
        self.handles.push(handle);
    }

    fn take(&mut self, index: usize) -> Option<SnapshotHandle> {
        if self.handles.is_empty() {
            return None;
        }
        let handle = self.handles.swap_remove(index % self.handles.len());
        let version = handle.version();
        if let Some(count) = self.model.get_mut(&version) {
            *count -= 1;
            if *count == 0 {
                self.model.remove(&version);
            }
        }
        Some(handle)
    }
}

impl std::fmt::Debug for RetentionHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetentionHarness")
            .field("outstanding", &self.handles.len())
            .field("model", &self.model)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failing::FailingStore;
    use crate::generators::{
        primary_policy_strategy, snapshot_op_sequence_strategy, PropTestConfig,
    };
    use proptest::prelude::*;
    use snapkeep_core::{
        CommitChanges, IndexShard, PrimaryPolicy, ShardState, StoredCommit,
    };
    use snapkeep_storage::ArtifactStore;
    use std::sync::Arc;

    fn v(n: u64) -> CommitVersion {
        CommitVersion::new(n)
    }

    #[test]
    fn test_held_commit_reclaimed_at_next_commit() {
        let engine = TestEngine::memory_with(Config::default().reclaim_on_release(false));
        let first = engine.commit_segment();
        let backup = engine.policy.snapshot_current().unwrap();

        engine.commit_segment();
        assert!(engine.files_exist(&*first));
        assert!(engine.store.exists("_0.seg").unwrap());

        assert!(backup.release());
        assert!(engine.policy.held_versions().is_empty());
        assert!(engine.store.exists("_0.seg").unwrap());

        engine.commit_segment();
        assert!(!engine.store.exists("_0.seg").unwrap());
        assert!(!engine.store.exists(first.manifest_name()).unwrap());
        assert!(first.is_deleted());
    }

    #[test]
    fn test_held_commit_reclaimed_on_release() {
        let engine = TestEngine::memory();
        let first = engine.commit_segment();
        let backup = engine.policy.snapshot_current().unwrap();
        engine.commit_segment();
        engine.commit_segment();
        assert!(engine.files_exist(&*first));

        drop(backup);
        assert!(first.is_deleted());
        assert!(!engine.store.exists("_0.seg").unwrap());
        assert_eq!(engine.policy.stats().deferred_reclaimed, 1);
    }

    #[test]
    fn test_two_backups_of_one_commit() {
        let engine = TestEngine::memory();
        for _ in 0..5 {
            engine.commit_segment();
        }
        let a = engine.policy.snapshot_current().unwrap();
        let b = engine.policy.snapshot_current().unwrap();
        assert_eq!(a.version(), v(5));
        engine.commit_segment();

        a.release();
        assert!(engine.store.exists("_4.seg").unwrap());
        b.release();
        assert!(!engine.store.exists("_4.seg").unwrap());
    }

    #[test]
    fn test_artifacts_shared_with_held_commit_survive() {
        let engine = TestEngine::memory();
        engine.commit_file("a.seg");
        let backup = engine.policy.snapshot_current().unwrap();
        engine.commit_file("b.seg");
        engine
            .writer
            .commit(CommitChanges::new().remove("a.seg"))
            .unwrap();

        assert!(engine.store.exists("a.seg").unwrap());
        backup.release();
        assert!(!engine.store.exists("a.seg").unwrap());
        assert!(engine.store.exists("b.seg").unwrap());
    }

    #[test]
    fn test_delete_failure_propagates_and_recovers() {
        let store = Arc::new(FailingStore::new());
        let engine = TestEngine::with_store(store.clone(), Config::default());
        engine.commit_segment();

        store.fail_deletes(true);
        let result = engine.try_commit_segment();
        assert!(matches!(result, Err(CoreError::Storage(_))));
        assert!(store.failed_deletes() > 0);
        assert!(engine.writer.deleter().pending_count() > 0);

        store.fail_deletes(false);
        engine.commit_segment();
        assert_eq!(engine.writer.deleter().pending_count(), 0);
        assert!(!store.exists("_0.seg").unwrap());
        assert!(!store.exists("commit_1").unwrap());
    }

    #[test]
    fn test_reclaim_failure_on_release_is_retried() {
        let store = Arc::new(FailingStore::new());
        let engine = TestEngine::with_store(store.clone(), Config::default());
        engine.commit_segment();
        let backup = engine.policy.snapshot_current().unwrap();
        engine.commit_segment();

        store.fail_deletes(true);
        assert!(backup.release());
        assert_eq!(engine.policy.stats().reclaim_failures, 1);
        assert!(store.exists("_0.seg").unwrap());

        store.fail_deletes(false);
        engine.commit_segment();
        assert!(!store.exists("_0.seg").unwrap());
    }

    #[test]
    fn test_write_failure_leaves_history_untouched() {
        let store = Arc::new(FailingStore::new());
        let engine = TestEngine::with_store(store.clone(), Config::default());
        engine.commit_segment();

        store.fail_writes(true);
        assert!(engine.try_commit_segment().is_err());
        assert_eq!(engine.writer.commits().len(), 1);
        assert_eq!(engine.policy.commits().unwrap().generation(), 1);
    }

    #[test]
    fn test_reopen_presents_commits_through_on_init() {
        let engine = crate::fixtures::scenarios::engine_with_commits(
            4,
            Config::default().primary(PrimaryPolicy::KeepAll),
        );
        let store = Arc::clone(&engine.store);
        drop(engine);

        let engine = TestEngine::with_store(store, Config::default());
        let live = engine.policy.commits().unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live.last().unwrap().version(), v(4));
        assert_eq!(engine.store.list().unwrap(), vec!["_3.seg", "commit_4"]);
    }

    #[test]
    fn test_bundle_snapshot_holds_every_live_commit() {
        let engine = crate::fixtures::scenarios::engine_with_commits(
            3,
            Config::default().primary(PrimaryPolicy::KeepLast(2)),
        );
        let bundle = engine.policy.snapshot().unwrap();
        assert_eq!(bundle.versions(), vec![v(2), v(3)]);

        for _ in 0..3 {
            engine.commit_segment();
        }
        for handle in &bundle {
            assert!(engine.files_exist(handle));
        }
        assert!(bundle.release());
        assert_eq!(engine.store.list().unwrap().len(), 4);
    }

    #[test]
    fn test_directory_engine_keeps_held_files() {
        let engine = TestEngine::directory();
        engine.commit_segment();
        let backup = engine.policy.snapshot_current().unwrap();
        engine.commit_segment();

        let path = engine.path().unwrap();
        assert!(path.join("_0.seg").exists());
        backup.release();
        assert!(!path.join("_0.seg").exists());
        assert!(path.join("_1.seg").exists());
    }

    #[test]
    fn test_shard_gate() {
        let shard = IndexShard::new(Config::default()).unwrap();
        let store: Arc<dyn ArtifactStore> = Arc::new(snapkeep_storage::InMemoryStore::new());
        assert!(shard.snapshot().is_err());

        shard.recover(Arc::clone(&store)).unwrap();
        let first: Arc<StoredCommit> = shard.commit(CommitChanges::new().add("_0.seg", "a")).unwrap();
        assert!(matches!(
            shard.snapshot_current(),
            Err(CoreError::IllegalShardState {
                state: ShardState::Recovering,
                ..
            })
        ));

        shard.start().unwrap();
        let handle = shard.snapshot_current().unwrap();
        assert_eq!(handle.version(), first.version());
        shard
            .commit(CommitChanges::new().remove("_0.seg").add("_1.seg", "b"))
            .unwrap();
        assert!(store.exists("_0.seg").unwrap());

        shard.close();
        assert!(shard.commit(CommitChanges::new()).is_err());
        handle.release();
        assert!(!store.exists("_0.seg").unwrap());
    }

    #[test]
    fn test_harness_scripted_sequence() {
        let mut harness = RetentionHarness::new(Config::default());
        let ops = [
            SnapshotOp::SnapshotCurrent,
            SnapshotOp::Commit,
            SnapshotOp::SnapshotCurrent,
            SnapshotOp::SnapshotAll,
            SnapshotOp::Commit,
            SnapshotOp::Commit,
            SnapshotOp::ReleaseTwice { index: 0 },
            SnapshotOp::Drop { index: 1 },
            SnapshotOp::Commit,
        ];
        for op in &ops {
            harness.apply(op).unwrap();
            harness.verify();
        }
        assert_eq!(harness.outstanding(), 0);
    }

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn retention_matches_model(
            primary in primary_policy_strategy(),
            reclaim in any::<bool>(),
            ops in snapshot_op_sequence_strategy(1, 60),
        ) {
            let config = Config::default()
                .primary(primary)
                .reclaim_on_release(reclaim)
                .sync_on_commit(false);
            let mut harness = RetentionHarness::new(config);
            for op in &ops {
                harness.apply(op).unwrap();
                harness.verify();
            }

            harness.release_all();
            harness.apply(&SnapshotOp::Commit).unwrap();
            harness.verify();
            prop_assert!(harness.engine.policy.held_versions().is_empty());
            prop_assert_eq!(harness.engine.policy.stats().outstanding(), 0);
        }
    }
}

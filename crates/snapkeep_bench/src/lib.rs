//! Benchmark utilities.

#![warn(missing_docs)]

use rand::Rng;
use snapkeep_core::{CommitChanges, CommitWriter, Config, SnapshotDeletionPolicy};
use snapkeep_storage::{ArtifactStore, InMemoryStore};
use std::sync::Arc;

/// Generate random artifact data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Opens an in-memory writer reporting to a snapshot policy.
pub fn memory_engine(config: &Config) -> (CommitWriter, Arc<SnapshotDeletionPolicy>) {
    let store: Arc<dyn ArtifactStore> = Arc::new(InMemoryStore::new());
    let policy = Arc::new(SnapshotDeletionPolicy::with_config(config).unwrap());
    let writer = CommitWriter::open(store, policy.clone(), config).unwrap();
    (writer, policy)
}

/// Builds changes that replace every artifact of the current commit with
/// `files` fresh ones of `size` bytes each.
pub fn segment_changes(writer: &CommitWriter, seq: usize, files: usize, size: usize) -> CommitChanges {
    let mut changes = CommitChanges::new();
    if let Some(current) = writer.current() {
        for name in current.data_files() {
            changes = changes.remove(name.clone());
        }
    }
    for i in 0..files {
        changes = changes.add(format!("_{seq}_{i}.seg"), random_data(size));
    }
    changes
}

//! Commits backed by a manifest artifact.

use crate::commit::{CommitManifest, FileDeleter, IndexCommit};
use crate::error::CoreResult;
use crate::types::{CommitVersion, Generation};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A commit read from (or written to) an artifact store.
///
/// Deleting a stored commit drops its references on every artifact it
/// lists, manifest included; the [`FileDeleter`] removes artifacts no
/// other commit still uses. Deletion happens at most once.
pub struct StoredCommit {
    manifest: CommitManifest,
    manifest_name: String,
    /// Data files followed by the manifest itself.
    files: Vec<String>,
    deleter: Arc<FileDeleter>,
    deleted: AtomicBool,
}

impl StoredCommit {
    /// Creates a commit for `manifest`.
    ///
    /// The caller is responsible for registering the commit's files with
    /// the deleter (see [`FileDeleter::incref`]).
    pub fn new(manifest: CommitManifest, deleter: Arc<FileDeleter>) -> Self {
        let manifest_name = manifest.name();
        let mut files = manifest.files.clone();
        files.push(manifest_name.clone());
        Self {
            manifest,
            manifest_name,
            files,
            deleter,
            deleted: AtomicBool::new(false),
        }
    }

    /// Returns the decoded manifest.
    pub fn manifest(&self) -> &CommitManifest {
        &self.manifest
    }

    /// Returns the data artifacts, excluding the manifest.
    pub fn data_files(&self) -> &[String] {
        &self.manifest.files
    }
}

impl IndexCommit for StoredCommit {
    fn version(&self) -> CommitVersion {
        self.manifest.version
    }

    fn generation(&self) -> Generation {
        self.manifest.generation
    }

    fn timestamp_millis(&self) -> u64 {
        self.manifest.timestamp_millis
    }

    fn manifest_name(&self) -> &str {
        &self.manifest_name
    }

    fn file_names(&self) -> &[String] {
        &self.files
    }

    fn delete(&self) -> CoreResult<()> {
        if self.deleted.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        debug!(version = %self.version(), generation = %self.generation(), "deleting commit");
        self.deleter.decref(&self.files)
    }

    fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }
}

impl fmt::Debug for StoredCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCommit")
            .field("version", &self.manifest.version)
            .field("generation", &self.manifest.generation)
            .field("files", &self.manifest.files.len())
            .field("deleted", &self.is_deleted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapkeep_storage::{ArtifactStore, InMemoryStore};

    fn stored(store: &Arc<InMemoryStore>, deleter: &Arc<FileDeleter>, version: u64) -> StoredCommit {
        let manifest = CommitManifest {
            version: CommitVersion::new(version),
            generation: Generation::new(version),
            timestamp_millis: version * 1000,
            files: vec!["shared.seg".into(), format!("_{version}.seg")],
        };
        store.write(&format!("_{version}.seg"), b"data").ok();
        store.write(&manifest.name(), &manifest.encode().unwrap()).unwrap();
        let commit = StoredCommit::new(manifest, Arc::clone(deleter));
        deleter.incref(commit.file_names());
        commit
    }

    #[test]
    fn file_names_include_manifest() {
        let store = Arc::new(InMemoryStore::new());
        let deleter = Arc::new(FileDeleter::new(store.clone()));
        let commit = stored(&store, &deleter, 1);
        assert_eq!(commit.manifest_name(), "commit_1");
        assert_eq!(commit.file_names().last().unwrap(), "commit_1");
        assert_eq!(commit.data_files().len(), 2);
    }

    #[test]
    fn delete_is_idempotent_and_respects_sharing() {
        let store = Arc::new(InMemoryStore::new());
        store.write("shared.seg", b"s").unwrap();
        let deleter = Arc::new(FileDeleter::new(store.clone()));
        let c1 = stored(&store, &deleter, 1);
        let c2 = stored(&store, &deleter, 2);

        c1.delete().unwrap();
        c1.delete().unwrap();
        assert!(c1.is_deleted());
        assert!(!store.exists("commit_1").unwrap());
        assert!(!store.exists("_1.seg").unwrap());
        assert!(store.exists("shared.seg").unwrap());
        assert_eq!(deleter.ref_count("shared.seg"), 1);

        c2.delete().unwrap();
        assert!(!store.exists("shared.seg").unwrap());
    }
}

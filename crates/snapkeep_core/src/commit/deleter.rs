//! Reference-counted artifact deletion.

use crate::error::{CoreError, CoreResult};
use parking_lot::Mutex;
use snapkeep_storage::{ArtifactStore, StorageError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Tracks how many live commits reference each artifact.
///
/// An artifact is physically removed from the store when its count drops
/// to zero. Removals that fail are queued and retried by
/// [`retry_pending`](Self::retry_pending), so a transient store error never
/// leaks an artifact for good.
///
/// The internal lock only covers the count bookkeeping; store calls are
/// made after it is released.
pub struct FileDeleter {
    store: Arc<dyn ArtifactStore>,
    counts: Mutex<HashMap<String, usize>>,
    pending: Mutex<Vec<String>>,
}

impl FileDeleter {
    /// Creates a deleter over `store` with no references.
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            counts: Mutex::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Adds one reference to each artifact.
    pub fn incref(&self, files: &[String]) {
        let mut counts = self.counts.lock();
        for name in files {
            *counts.entry(name.clone()).or_insert(0) += 1;
        }
    }

    /// Drops one reference from each artifact, deleting those that reach zero.
    ///
    /// # Errors
    ///
    /// Returns the first store error encountered. Every artifact is still
    /// attempted; failed ones are queued for retry.
    pub fn decref(&self, files: &[String]) -> CoreResult<()> {
        let doomed: Vec<String> = {
            let mut counts = self.counts.lock();
            let mut doomed = Vec::new();
            for name in files {
                match counts.get_mut(name) {
                    Some(count) if *count > 1 => *count -= 1,
                    Some(_) => {
                        counts.remove(name);
                        doomed.push(name.clone());
                    }
                    None => warn!(file = %name, "decref of untracked artifact"),
                }
            }
            doomed
        };
        self.delete_all(doomed)
    }

    /// Returns the current reference count of an artifact.
    pub fn ref_count(&self, name: &str) -> usize {
        self.counts.lock().get(name).copied().unwrap_or(0)
    }

    /// Returns true if any live commit references the artifact.
    pub fn is_referenced(&self, name: &str) -> bool {
        self.ref_count(name) > 0
    }

    /// Returns the number of artifacts whose deletion is awaiting retry.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Retries deletions that failed earlier.
    ///
    /// Artifacts that became referenced again in the meantime are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first store error; failed artifacts stay queued.
    pub fn retry_pending(&self) -> CoreResult<()> {
        let queued = std::mem::take(&mut *self.pending.lock());
        if queued.is_empty() {
            return Ok(());
        }
        let retry: Vec<String> = queued
            .into_iter()
            .filter(|name| !self.is_referenced(name))
            .collect();
        debug!(count = retry.len(), "retrying failed artifact deletions");
        self.delete_all(retry)
    }

    fn delete_all(&self, names: Vec<String>) -> CoreResult<()> {
        let mut first_error: Option<CoreError> = None;
        for name in names {
            match self.store.delete(&name) {
                Ok(()) => debug!(file = %name, "deleted artifact"),
                Err(StorageError::NotFound { .. }) => {
                    debug!(file = %name, "artifact already gone");
                }
                Err(e) => {
                    warn!(file = %name, error = %e, "artifact deletion failed, queued for retry");
                    self.pending.lock().push(name);
                    first_error.get_or_insert(e.into());
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for FileDeleter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDeleter")
            .field("tracked", &self.counts.lock().len())
            .field("pending", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapkeep_storage::InMemoryStore;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn setup(files: &[&str]) -> (Arc<InMemoryStore>, FileDeleter) {
        let store = Arc::new(InMemoryStore::new());
        for name in files {
            store.write(name, b"x").unwrap();
        }
        let deleter = FileDeleter::new(store.clone());
        (store, deleter)
    }

    #[test]
    fn shared_artifact_survives_first_decref() {
        let (store, deleter) = setup(&["a", "b"]);
        deleter.incref(&names(&["a", "b"]));
        deleter.incref(&names(&["b"]));

        deleter.decref(&names(&["a", "b"])).unwrap();
        assert!(!store.exists("a").unwrap());
        assert!(store.exists("b").unwrap());
        assert_eq!(deleter.ref_count("b"), 1);

        deleter.decref(&names(&["b"])).unwrap();
        assert!(!store.exists("b").unwrap());
        assert!(!deleter.is_referenced("b"));
    }

    #[test]
    fn missing_artifact_is_not_an_error() {
        let (_store, deleter) = setup(&[]);
        deleter.incref(&names(&["ghost"]));
        assert!(deleter.decref(&names(&["ghost"])).is_ok());
        assert_eq!(deleter.pending_count(), 0);
    }

    #[test]
    fn untracked_decref_is_ignored() {
        let (store, deleter) = setup(&["a"]);
        deleter.decref(&names(&["a"])).unwrap();
        assert!(store.exists("a").unwrap());
    }

    #[test]
    fn retry_with_nothing_pending() {
        let (_store, deleter) = setup(&[]);
        assert!(deleter.retry_pending().is_ok());
    }
}

//! In-memory artifact store for testing.

use crate::error::{StorageError, StorageResult};
use crate::store::{validate_name, ArtifactStore};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory artifact store.
///
/// This store keeps all artifacts in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral engines that don't need persistence
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use snapkeep_storage::{ArtifactStore, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// store.write("a", b"test data").unwrap();
/// assert_eq!(store.list().unwrap(), vec!["a".to_string()]);
/// assert_eq!(store.total_bytes(), 9);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    artifacts: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with pre-existing artifacts.
    ///
    /// Useful for testing reopen scenarios.
    #[must_use]
    pub fn with_artifacts<I>(artifacts: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        Self {
            artifacts: RwLock::new(artifacts.into_iter().collect()),
        }
    }

    /// Returns a copy of every artifact in the store.
    #[must_use]
    pub fn artifacts(&self) -> BTreeMap<String, Vec<u8>> {
        self.artifacts.read().clone()
    }

    /// Returns the number of artifacts held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.read().len()
    }

    /// Returns true if the store holds no artifacts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.read().is_empty()
    }

    /// Returns the total size of all artifacts in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.artifacts
            .read()
            .values()
            .map(|data| data.len() as u64)
            .sum()
    }
}

impl ArtifactStore for InMemoryStore {
    fn write(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        validate_name(name)?;
        let mut artifacts = self.artifacts.write();
        if artifacts.contains_key(name) {
            return Err(StorageError::already_exists(name));
        }
        artifacts.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn read(&self, name: &str) -> StorageResult<Vec<u8>> {
        self.artifacts
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::not_found(name))
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        self.artifacts
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(name))
    }

    fn exists(&self, name: &str) -> StorageResult<bool> {
        Ok(self.artifacts.read().contains_key(name))
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        Ok(self.artifacts.read().keys().cloned().collect())
    }

    fn sync(&self) -> StorageResult<()> {
        // Nothing to make durable
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn memory_write_then_read() {
        let store = InMemoryStore::new();
        store.write("_0.seg", b"hello").unwrap();
        assert_eq!(store.read("_0.seg").unwrap(), b"hello");
        assert!(store.exists("_0.seg").unwrap());
    }

    #[test]
    fn memory_write_existing_fails() {
        let store = InMemoryStore::new();
        store.write("a", b"1").unwrap();
        let result = store.write("a", b"2");
        assert!(matches!(result, Err(StorageError::AlreadyExists { .. })));
        assert_eq!(store.read("a").unwrap(), b"1");
    }

    #[test]
    fn memory_read_missing_fails() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.read("nope"),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn memory_delete_removes() {
        let store = InMemoryStore::new();
        store.write("a", b"1").unwrap();
        store.delete("a").unwrap();
        assert!(!store.exists("a").unwrap());
        assert!(matches!(store.delete("a"), Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn memory_list_is_sorted() {
        let store = InMemoryStore::new();
        store.write("c", b"").unwrap();
        store.write("a", b"").unwrap();
        store.write("b", b"").unwrap();
        assert_eq!(store.list().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn memory_with_artifacts() {
        let store = InMemoryStore::with_artifacts([("x".to_string(), b"preloaded".to_vec())]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.read("x").unwrap(), b"preloaded");
        assert_eq!(store.total_bytes(), 9);
    }

    #[test]
    fn memory_rejects_invalid_names() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.write("../escape", b""),
            Err(StorageError::InvalidName { .. })
        ));
    }

    #[test]
    fn memory_sync_succeeds() {
        let store = InMemoryStore::new();
        store.write("a", b"data").unwrap();
        assert!(store.sync().is_ok());
    }
}

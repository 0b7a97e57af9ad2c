//! A store that fails on demand.

use snapkeep_storage::{ArtifactStore, InMemoryStore, StorageError, StorageResult};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory store whose writes and deletes can be switched to fail.
///
/// Failures are reported as I/O errors, the way a full or detached disk
/// would surface them.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: InMemoryStore,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
    failed_deletes: AtomicUsize,
}

impl FailingStore {
    /// Creates a store that does not fail yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent writes fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent deletes fail (or succeed again).
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Returns how many deletes have been rejected.
    pub fn failed_deletes(&self) -> usize {
        self.failed_deletes.load(Ordering::SeqCst)
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    fn injected(operation: &str, name: &str) -> StorageError {
        StorageError::Io(io::Error::other(format!("injected {operation} failure for {name}")))
    }
}

impl ArtifactStore for FailingStore {
    fn write(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::injected("write", name));
        }
        self.inner.write(name, data)
    }

    fn read(&self, name: &str) -> StorageResult<Vec<u8>> {
        self.inner.read(name)
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            self.failed_deletes.fetch_add(1, Ordering::SeqCst);
            return Err(Self::injected("delete", name));
        }
        self.inner.delete(name)
    }

    fn exists(&self, name: &str) -> StorageResult<bool> {
        self.inner.exists(name)
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        self.inner.list()
    }

    fn sync(&self) -> StorageResult<()> {
        self.inner.sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fails_only_when_switched_on() {
        let store = FailingStore::new();
        store.write("a", b"1").unwrap();

        store.fail_deletes(true);
        assert!(matches!(store.delete("a"), Err(StorageError::Io(_))));
        assert_eq!(store.failed_deletes(), 1);
        assert!(store.exists("a").unwrap());

        store.fail_deletes(false);
        store.delete("a").unwrap();
        assert!(store.inner().is_empty());
    }

    #[test]
    fn write_failures() {
        let store = FailingStore::new();
        store.fail_writes(true);
        assert!(store.write("a", b"1").is_err());
        assert!(!store.exists("a").unwrap());
    }
}

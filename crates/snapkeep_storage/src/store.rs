//! Artifact store trait definition.

use crate::error::{StorageError, StorageResult};

/// A flat store of named, immutable artifacts.
///
/// Artifact stores are **opaque**. They hold the files a commit is made of
/// (segment data, manifests) but never interpret them. Which artifacts are
/// still needed is decided above this layer.
///
/// # Invariants
///
/// - `write` never overwrites; an existing name is an error
/// - `read` returns exactly the bytes previously written under that name
/// - `delete` removes the artifact; a missing name is an error
/// - `list` returns names in ascending lexicographic order
/// - Stores must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::DirectoryStore`] - For persistent storage
pub trait ArtifactStore: Send + Sync {
    /// Writes a new artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The name is invalid
    /// - An artifact with this name already exists
    /// - An I/O error occurs
    fn write(&self, name: &str, data: &[u8]) -> StorageResult<()>;

    /// Reads a whole artifact.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the artifact does not exist.
    fn read(&self, name: &str) -> StorageResult<Vec<u8>>;

    /// Physically removes an artifact.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the artifact does not exist,
    /// or an I/O error if removal fails.
    fn delete(&self, name: &str) -> StorageResult<()>;

    /// Returns whether the artifact exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    fn exists(&self, name: &str) -> StorageResult<bool>;

    /// Lists all artifact names in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be enumerated.
    fn list(&self) -> StorageResult<Vec<String>>;

    /// Makes all previously written artifacts durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&self) -> StorageResult<()>;
}

/// Checks that `name` is a single flat path component.
///
/// # Errors
///
/// Returns [`StorageError::InvalidName`] for empty names, names containing
/// path separators, and the `.`/`..` components.
pub fn validate_name(name: &str) -> StorageResult<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if bad {
        return Err(StorageError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

//! Directory-based artifact store for persistent storage.

use crate::error::{StorageError, StorageResult};
use crate::store::{validate_name, ArtifactStore};
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// An artifact store backed by a single directory.
///
/// Every artifact is one regular file directly under the root directory.
/// Data survives process restarts.
///
/// # Durability
///
/// - With `sync_on_write`, every `write` calls `File::sync_all()` before
///   returning
/// - `sync()` syncs the directory itself so that creations and removals
///   are durable
///
/// # Example
///
/// ```no_run
/// use snapkeep_storage::{ArtifactStore, DirectoryStore};
/// use std::path::Path;
///
/// let store = DirectoryStore::open(Path::new("index")).unwrap();
/// store.write("_0.seg", b"persistent data").unwrap();
/// store.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct DirectoryStore {
    root: PathBuf,
    sync_on_write: bool,
}

impl DirectoryStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, or if `root`
    /// exists but is not a directory.
    pub fn open(root: &Path) -> StorageResult<Self> {
        fs::create_dir_all(root)?;
        if !root.is_dir() {
            return Err(StorageError::Io(io::Error::new(
                ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
            sync_on_write: true,
        })
    }

    /// Sets whether each write is synced before returning.
    #[must_use]
    pub fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> StorageResult<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

impl ArtifactStore for DirectoryStore {
    fn write(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.path_of(name)?;
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::already_exists(name));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(data)?;
        if self.sync_on_write {
            file.sync_all()?;
        }
        Ok(())
    }

    fn read(&self, name: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_of(name)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::not_found(name),
            _ => e.into(),
        })
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        let path = self.path_of(name)?;
        fs::remove_file(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::not_found(name),
            _ => e.into(),
        })
    }

    fn exists(&self, name: &str) -> StorageResult<bool> {
        Ok(self.path_of(name)?.is_file())
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn sync(&self) -> StorageResult<()> {
        // Directory fsync is how creations/removals become durable on unix
        #[cfg(unix)]
        fs::File::open(&self.root)?.sync_all()?;
        Ok(())
    }
}

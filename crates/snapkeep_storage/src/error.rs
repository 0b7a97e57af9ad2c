//! Error types for artifact store operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The named artifact does not exist.
    #[error("artifact not found: {name}")]
    NotFound {
        /// Name of the missing artifact.
        name: String,
    },

    /// An artifact with this name already exists.
    ///
    /// Artifacts are immutable once written.
    #[error("artifact already exists: {name}")]
    AlreadyExists {
        /// Name of the existing artifact.
        name: String,
    },

    /// The artifact name is not usable as a flat store key.
    #[error("invalid artifact name: {name:?}")]
    InvalidName {
        /// The rejected name.
        name: String,
    },
}

impl StorageError {
    /// Creates a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates an already exists error.
    pub fn already_exists(name: impl Into<String>) -> Self {
        Self::AlreadyExists { name: name.into() }
    }
}

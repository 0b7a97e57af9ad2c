//! Error types for SnapKeep core.

use crate::shard::ShardState;
use crate::types::{CommitVersion, Generation};
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in SnapKeep core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Artifact store error.
    #[error("storage error: {0}")]
    Storage(#[from] snapkeep_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A snapshot was requested before the first commit was observed.
    #[error("snapshot deletion policy has not been initialized yet")]
    NotInitialized,

    /// The primary deletion policy deleted every commit of a cycle.
    #[error("primary deletion policy left no live commits (cycle {generation})")]
    NoLiveCommits {
        /// The live-list generation that would have been published.
        generation: u64,
    },

    /// The commit is no longer live and no snapshot holds it.
    #[error("commit {version} has been released for deletion")]
    CommitReleased {
        /// Version of the commit.
        version: CommitVersion,
    },

    /// Commit manifest is corrupted or invalid.
    #[error("invalid commit manifest: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Checksum mismatch detected.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Expected checksum.
        expected: u32,
        /// Actual checksum.
        actual: u32,
    },

    /// A manifest generation appears twice or out of order.
    #[error("manifest {generation} is out of order")]
    OutOfOrder {
        /// Generation of the offending manifest.
        generation: Generation,
    },

    /// Operation not permitted in the shard's current state.
    #[error("cannot {operation} while shard is {state}")]
    IllegalShardState {
        /// Current shard state.
        state: ShardState,
        /// The rejected operation.
        operation: &'static str,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// Configuration rejected by validation.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an illegal shard state error.
    pub fn illegal_shard_state(state: ShardState, operation: &'static str) -> Self {
        Self::IllegalShardState { state, operation }
    }
}

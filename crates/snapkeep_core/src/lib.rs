//! # SnapKeep Core
//!
//! Snapshot-aware commit retention.
//!
//! This crate provides:
//! - Commit points backed by checksummed manifests in an artifact store
//! - Primary deletion policies deciding which commits the engine still needs
//! - A snapshot deletion policy that lets consumers pin commits so their
//!   artifacts survive until released
//! - A reference commit writer and a shard lifecycle gate
//!
//! ## Example
//!
//! ```rust
//! use snapkeep_core::{CommitChanges, CommitWriter, Config, SnapshotDeletionPolicy};
//! use snapkeep_storage::{ArtifactStore, InMemoryStore};
//! use std::sync::Arc;
//!
//! let config = Config::default();
//! let policy = Arc::new(SnapshotDeletionPolicy::with_config(&config).unwrap());
//! let writer = CommitWriter::open(Arc::new(InMemoryStore::new()), policy.clone(), &config).unwrap();
//!
//! writer.commit(CommitChanges::new().add("_0.seg", "a")).unwrap();
//! let backup = policy.snapshot_current().unwrap();
//!
//! // The next commit supersedes the first, but the snapshot keeps it alive.
//! writer
//!     .commit(CommitChanges::new().remove("_0.seg").add("_1.seg", "b"))
//!     .unwrap();
//! assert!(writer.store().exists("_0.seg").unwrap());
//!
//! backup.release();
//! assert!(!writer.store().exists("_0.seg").unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod commit;
mod config;
mod error;
mod policy;
mod shard;
mod snapshot;
mod stats;
mod types;
mod writer;

pub use commit::{
    CommitManifest, FileDeleter, IndexCommit, StoredCommit, MANIFEST_FORMAT, MANIFEST_MAGIC,
    MANIFEST_PREFIX,
};
pub use config::{Config, PrimaryPolicy};
pub use error::{CoreError, CoreResult};
pub use policy::{
    DeletionPolicy, ExpireCommitsOlderThan, KeepAllCommits, KeepLastCommits, KeepOnlyLastCommit,
};
pub use shard::{IndexShard, ShardState};
pub use snapshot::{
    LiveCommits, SnapshotCommit, SnapshotCommits, SnapshotDeletionPolicy, SnapshotHandle,
};
pub use stats::{SnapshotStats, SnapshotStatsSnapshot};
pub use types::{CommitVersion, Generation};
pub use writer::{CommitChanges, CommitWriter};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! # SnapKeep Storage
//!
//! Artifact store trait and implementations for SnapKeep.
//!
//! This crate provides the lowest-level storage abstraction for SnapKeep.
//! Artifact stores are **opaque named-blob stores** - they do not interpret
//! the artifacts they hold.
//!
//! ## Design Principles
//!
//! - Stores are flat namespaces of immutable artifacts (write once, read, delete)
//! - No knowledge of commit manifests, versions, or reference counts
//! - Must be `Send + Sync`: deletions may be issued from any thread
//! - SnapKeep owns all format interpretation
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral engines
//! - [`DirectoryStore`] - For persistent storage in a single directory
//!
//! ## Example
//!
//! ```rust
//! use snapkeep_storage::{ArtifactStore, InMemoryStore};
//!
//! let store = InMemoryStore::new();
//! store.write("_0.seg", b"hello world").unwrap();
//! assert_eq!(store.read("_0.seg").unwrap(), b"hello world");
//! store.delete("_0.seg").unwrap();
//! assert!(!store.exists("_0.seg").unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod directory;
mod error;
mod memory;
mod store;

pub use directory::DirectoryStore;
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStore;
pub use store::{validate_name, ArtifactStore};

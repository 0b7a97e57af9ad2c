//! Commit points and their on-store representation.
//!
//! A commit point is an immutable, versioned view of the store: a manifest
//! artifact plus the data artifacts it lists. Artifacts are shared between
//! commits, so physically deleting a commit only removes the artifacts no
//! other commit still references.
//!
//! ## Manifest Format
//!
//! ```text
//! | magic (4) | format (2) | version (8) | generation (8) | timestamp (8) | count (4) | files... | crc32 (4) |
//! ```
//!
//! Each file entry is `| len (2) | utf-8 name (len) |`. All integers are
//! little-endian; the checksum covers everything before it.

mod deleter;
mod manifest;
mod stored;

pub use deleter::FileDeleter;
pub use manifest::{CommitManifest, MANIFEST_FORMAT, MANIFEST_MAGIC, MANIFEST_PREFIX};
pub use stored::StoredCommit;

use crate::error::CoreResult;
use crate::types::{CommitVersion, Generation};
use std::fmt;

/// An immutable handle to one written state of the store.
///
/// This is the surface deletion policies see. Implementations must make
/// `delete` idempotent: policies may call it on a commit more than once
/// across cycles.
pub trait IndexCommit: Send + Sync + fmt::Debug {
    /// Returns the commit's version.
    fn version(&self) -> CommitVersion;

    /// Returns the generation of the commit's manifest.
    fn generation(&self) -> Generation;

    /// Returns when the commit was written, in Unix milliseconds.
    fn timestamp_millis(&self) -> u64;

    /// Returns the name of the manifest artifact.
    fn manifest_name(&self) -> &str;

    /// Returns every artifact the commit references, manifest included.
    fn file_names(&self) -> &[String];

    /// Deletes the commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails to remove artifacts.
    fn delete(&self) -> CoreResult<()>;

    /// Returns true once the commit has been deleted.
    fn is_deleted(&self) -> bool;
}

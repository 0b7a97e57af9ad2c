//! Commit wrapper guarding physical deletion.

use crate::commit::IndexCommit;
use crate::error::CoreResult;
use crate::snapshot::SnapshotState;
use crate::types::{CommitVersion, Generation};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A commit as seen through the snapshot deletion policy.
///
/// Reads forward to the wrapped commit. `delete` marks the wrapper deleted,
/// which drops it from the next live list, but only deletes the wrapped
/// commit if no snapshot holds its version. Otherwise the deletion is
/// recorded against the hold and carried out when the last hold goes.
pub struct SnapshotCommit {
    inner: Arc<dyn IndexCommit>,
    state: Arc<SnapshotState>,
    deleted: AtomicBool,
}

impl SnapshotCommit {
    pub(crate) fn new(inner: Arc<dyn IndexCommit>, state: Arc<SnapshotState>) -> Self {
        Self {
            inner,
            state,
            deleted: AtomicBool::new(false),
        }
    }

    /// Returns the wrapped commit.
    pub fn inner(&self) -> &Arc<dyn IndexCommit> {
        &self.inner
    }
}

impl IndexCommit for SnapshotCommit {
    fn version(&self) -> CommitVersion {
        self.inner.version()
    }

    fn generation(&self) -> Generation {
        self.inner.generation()
    }

    fn timestamp_millis(&self) -> u64 {
        self.inner.timestamp_millis()
    }

    fn manifest_name(&self) -> &str {
        self.inner.manifest_name()
    }

    fn file_names(&self) -> &[String] {
        self.inner.file_names()
    }

    fn delete(&self) -> CoreResult<()> {
        self.deleted.store(true, Ordering::Release);
        let version = self.version();
        if self.state.refs.defer_if_held(version, &self.inner) {
            self.state.stats.record_deferred();
            debug!(version = %version, "commit is snapshotted, deferring deletion");
            return Ok(());
        }
        self.inner.delete()
    }

    fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire) || self.inner.is_deleted()
    }
}

impl fmt::Debug for SnapshotCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotCommit")
            .field("inner", &self.inner)
            .field("deleted", &self.deleted.load(Ordering::Relaxed))
            .finish()
    }
}

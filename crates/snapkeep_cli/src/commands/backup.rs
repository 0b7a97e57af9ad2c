//! Backup command.
//!
//! Opens the directory through the commit writer with a snapshot deletion
//! policy, snapshots the commits to copy, copies their artifacts, and
//! releases the snapshots. Nothing in the source is deleted while the copy
//! runs; opening the writer does remove artifacts no commit references.

use serde::Serialize;
use snapkeep_core::{
    CommitWriter, Config, IndexCommit, PrimaryPolicy, SnapshotDeletionPolicy, SnapshotHandle,
};
use snapkeep_storage::{ArtifactStore, DirectoryStore};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// What a backup copied.
#[derive(Debug, Serialize)]
pub struct BackupSummary {
    /// Versions of the copied commits.
    pub versions: Vec<u64>,
    /// Number of artifacts copied.
    pub files: usize,
    /// Bytes copied.
    pub bytes: u64,
}

/// Runs the backup command.
pub fn run(path: &Path, output: &Path, all: bool) -> Result<(), Box<dyn std::error::Error>> {
    let summary = backup(path, output, all)?;

    println!("✓ Backup created successfully");
    println!("  Path: {:?}", output);
    println!("  Commits: {:?}", summary.versions);
    println!("  Files: {}", summary.files);
    println!("  Size: {} bytes", summary.bytes);

    Ok(())
}

/// Copies the current commit (or every retained commit) of `path` into
/// `output`.
pub fn backup(
    path: &Path,
    output: &Path,
    all: bool,
) -> Result<BackupSummary, Box<dyn std::error::Error>> {
    if !path.is_dir() {
        return Err(format!("No artifact directory found at {:?}", path).into());
    }
    if output.exists() && fs::read_dir(output)?.next().is_some() {
        return Err(format!("Output directory {:?} is not empty", output).into());
    }

    info!("Creating backup of {:?}", path);

    let store: Arc<dyn ArtifactStore> = Arc::new(DirectoryStore::open(path)?);
    let config = Config::default().primary(PrimaryPolicy::KeepAll);
    let policy = Arc::new(SnapshotDeletionPolicy::with_config(&config)?);
    let writer = CommitWriter::open(Arc::clone(&store), policy.clone(), &config)?;
    if writer.current().is_none() {
        return Err(format!("No commits found at {:?}", path).into());
    }

    let handles: Vec<SnapshotHandle> = if all {
        policy.snapshot()?.into_iter().collect()
    } else {
        vec![policy.snapshot_current()?]
    };

    fs::create_dir_all(output)?;
    let mut copied = BTreeSet::new();
    let mut bytes = 0u64;
    for handle in &handles {
        for name in handle.file_names() {
            if copied.insert(name.clone()) {
                let data = store.read(name)?;
                fs::write(output.join(name), &data)?;
                bytes += data.len() as u64;
            }
        }
    }

    let versions = handles
        .iter()
        .map(|handle| handle.version().as_u64())
        .collect();
    for handle in handles {
        handle.release();
    }
    info!(files = copied.len(), bytes, "backup complete");

    Ok(BackupSummary {
        versions,
        files: copied.len(),
        bytes,
    })
}

//! Inspect command implementation.

use serde::Serialize;
use snapkeep_core::{CommitManifest, CommitWriter};
use snapkeep_storage::{ArtifactStore, DirectoryStore};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Directory inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Directory path.
    pub path: String,
    /// Number of commits.
    pub commit_count: usize,
    /// Number of artifacts in the directory.
    pub artifact_count: usize,
    /// Total size of all artifacts in bytes.
    pub total_size: u64,
    /// Commits, oldest first.
    pub commits: Vec<CommitInfo>,
    /// Artifacts no commit references.
    pub unreferenced: Vec<String>,
}

/// Summary of one commit.
#[derive(Debug, Serialize)]
pub struct CommitInfo {
    /// Commit version.
    pub version: u64,
    /// Manifest generation.
    pub generation: u64,
    /// Commit time in Unix milliseconds.
    pub timestamp_millis: u64,
    /// Manifest artifact name.
    pub manifest: String,
    /// Data artifacts.
    pub files: Vec<String>,
    /// Size of the data artifacts in bytes.
    pub size: u64,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(path)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Reads commit metadata from `path` without modifying it.
pub fn inspect(path: &Path) -> Result<InspectResult, Box<dyn std::error::Error>> {
    if !path.is_dir() {
        return Err(format!("No artifact directory found at {:?}", path).into());
    }

    let store = DirectoryStore::open(path)?;
    let manifests = CommitWriter::read_commits(&store)?;
    let artifacts = store.list()?;

    let mut referenced = BTreeSet::new();
    let commits: Vec<CommitInfo> = manifests
        .iter()
        .map(|manifest| {
            referenced.insert(manifest.name());
            referenced.extend(manifest.files.iter().cloned());
            commit_info(path, manifest)
        })
        .collect();

    let total_size = artifacts.iter().map(|name| artifact_size(path, name)).sum();
    let unreferenced = artifacts
        .iter()
        .filter(|name| !referenced.contains(*name))
        .cloned()
        .collect();

    Ok(InspectResult {
        path: path.display().to_string(),
        commit_count: commits.len(),
        artifact_count: artifacts.len(),
        total_size,
        commits,
        unreferenced,
    })
}

fn commit_info(path: &Path, manifest: &CommitManifest) -> CommitInfo {
    CommitInfo {
        version: manifest.version.as_u64(),
        generation: manifest.generation.as_u64(),
        timestamp_millis: manifest.timestamp_millis,
        manifest: manifest.name(),
        files: manifest.files.clone(),
        size: manifest
            .files
            .iter()
            .map(|name| artifact_size(path, name))
            .sum(),
    }
}

fn artifact_size(path: &Path, name: &str) -> u64 {
    fs::metadata(path.join(name)).map_or(0, |meta| meta.len())
}

fn print_text_output(result: &InspectResult) {
    println!("SnapKeep Directory Inspection");
    println!("=============================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Storage:");
    println!("  Artifacts:  {}", result.artifact_count);
    println!("  Total size: {} bytes", format_size(result.total_size));
    println!();
    println!("Commits: {}", result.commit_count);
    for commit in &result.commits {
        println!(
            "  [v:{}] {} - {} files, {} bytes, at {}",
            commit.version,
            commit.manifest,
            commit.files.len(),
            format_size(commit.size),
            commit.timestamp_millis
        );
    }

    if !result.unreferenced.is_empty() {
        println!();
        println!("Unreferenced artifacts:");
        for name in &result.unreferenced {
            println!("  {}", name);
        }
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapkeep_core::{CommitChanges, Config, KeepAllCommits};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn inspect_lists_commits() {
        let dir = TempDir::new().unwrap();
        {
            let store = Arc::new(DirectoryStore::open(dir.path()).unwrap());
            let writer =
                CommitWriter::open(store, Arc::new(KeepAllCommits), &Config::default()).unwrap();
            writer.commit(CommitChanges::new().add("_0.seg", "abc")).unwrap();
            writer.commit(CommitChanges::new().add("_1.seg", "de")).unwrap();
        }
        fs::write(dir.path().join("stray.tmp"), b"x").unwrap();

        let result = inspect(dir.path()).unwrap();
        assert_eq!(result.commit_count, 2);
        assert_eq!(result.commits[1].files, vec!["_0.seg", "_1.seg"]);
        assert_eq!(result.commits[1].size, 5);
        assert_eq!(result.unreferenced, vec!["stray.tmp"]);
        // Read-only: the stray artifact is still there
        assert!(dir.path().join("stray.tmp").exists());
    }

    #[test]
    fn inspect_missing_directory() {
        let dir = TempDir::new().unwrap();
        assert!(inspect(&dir.path().join("nope")).is_err());
    }
}

//! Concurrent stress runs for snapshot retention.
//!
//! One writer keeps committing while reader threads snapshot commits, read
//! every artifact of the snapshotted commit, and release. Any artifact that
//! disappears under a held snapshot is a violation.

use crate::fixtures::TestEngine;
use rand::Rng;
use snapkeep_core::{Config, CoreError, IndexCommit, SnapshotHandle};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Commits written.
    pub commits: usize,
    /// Commits that failed.
    pub failed_commits: usize,
    /// Snapshots taken and released.
    pub snapshots: usize,
    /// Artifacts found missing under a held snapshot, or leaked at the end.
    pub violations: usize,
    /// Total duration.
    pub duration: Duration,
    /// Snapshots per second.
    pub snapshots_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(
        commits: usize,
        failed_commits: usize,
        snapshots: usize,
        violations: usize,
        duration: Duration,
    ) -> Self {
        let snapshots_per_second = if duration.as_secs_f64() > 0.0 {
            snapshots as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            commits,
            failed_commits,
            snapshots,
            violations,
            duration,
            snapshots_per_second,
        }
    }

    /// Returns true if no invariant was violated.
    pub fn is_clean(&self) -> bool {
        self.violations == 0 && self.failed_commits == 0
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Commits: {} ({} failed)", self.commits, self.failed_commits);
        println!("Snapshots: {}", self.snapshots);
        println!("Violations: {}", self.violations);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} snapshots/sec", self.snapshots_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of commits the writer performs.
    pub commits: usize,
    /// Number of concurrent snapshot consumers.
    pub readers: usize,
    /// Upper bound of snapshots a consumer keeps before releasing them.
    pub max_held: usize,
    /// Engine configuration.
    pub engine: Config,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            commits: 1_000,
            readers: 4,
            max_held: 3,
            engine: Config::default().sync_on_commit(false),
        }
    }
}

/// Runs one writer against `config.readers` snapshot consumers.
pub fn stress_snapshot_retention(config: &StressConfig) -> StressTestResult {
    let engine = TestEngine::memory_with(config.engine.clone());
    let done = AtomicBool::new(false);
    let snapshots = AtomicUsize::new(0);
    let violations = AtomicUsize::new(0);

    let start = Instant::now();
    let mut commits = 0usize;
    let mut failed_commits = 0usize;

    thread::scope(|scope| {
        for _ in 0..config.readers {
            scope.spawn(|| {
                let mut rng = rand::thread_rng();
                let mut held: Vec<SnapshotHandle> = Vec::new();
                while !done.load(Ordering::Acquire) {
                    let taken = if rng.gen_bool(0.2) {
                        engine.policy.snapshot().map(|bundle| bundle.into_iter().collect())
                    } else {
                        engine.policy.snapshot_current().map(|handle| vec![handle])
                    };
                    match taken {
                        Ok(handles) => {
                            snapshots.fetch_add(handles.len(), Ordering::Relaxed);
                            held.extend(handles);
                        }
                        Err(CoreError::NotInitialized) => {
                            thread::yield_now();
                            continue;
                        }
                        Err(_) => {
                            violations.fetch_add(1, Ordering::Relaxed);
                            continue;
                        }
                    }

                    for handle in &held {
                        violations.fetch_add(missing_artifacts(&engine, handle), Ordering::Relaxed);
                    }
                    while held.len() > config.max_held {
                        let index = rng.gen_range(0..held.len());
                        held.swap_remove(index).release();
                    }
                }
                for handle in held {
                    handle.release();
                }
            });
        }

        for _ in 0..config.commits {
            match engine.try_commit_segment() {
                Ok(_) => commits += 1,
                Err(_) => failed_commits += 1,
            }
        }
        done.store(true, Ordering::Release);
    });

    // One more cycle reclaims whatever the last releases left behind
    if engine.try_commit_segment().is_err() {
        failed_commits += 1;
    }
    let mut violations = violations.into_inner();
    if !engine.policy.held_versions().is_empty() {
        violations += 1;
    }
    violations += leaked_artifacts(&engine);

    StressTestResult::new(
        commits,
        failed_commits,
        snapshots.into_inner(),
        violations,
        start.elapsed(),
    )
}

/// Counts artifacts of a held commit that cannot be read back intact.
fn missing_artifacts(engine: &TestEngine, commit: &dyn IndexCommit) -> usize {
    commit
        .file_names()
        .iter()
        .filter(|name| match engine.store.read(name) {
            Ok(data) => name.ends_with(".seg") && data != name.as_bytes(),
            Err(_) => true,
        })
        .count()
}

/// Counts artifacts in the store that no undeleted commit references.
fn leaked_artifacts(engine: &TestEngine) -> usize {
    let referenced: BTreeSet<String> = engine
        .writer
        .commits()
        .iter()
        .flat_map(|commit| commit.file_names().to_vec())
        .collect();
    engine
        .store
        .list()
        .map_or(1, |names| {
            names
                .iter()
                .filter(|name| !referenced.contains(*name))
                .count()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapkeep_core::PrimaryPolicy;

    #[test]
    fn test_stress_keep_only_last() {
        let config = StressConfig {
            commits: 200,
            readers: 4,
            ..StressConfig::default()
        };
        let result = stress_snapshot_retention(&config);
        assert!(result.is_clean(), "{result:?}");
        assert_eq!(result.commits, 200);
    }

    #[test]
    fn test_stress_deferred_reclaim() {
        let config = StressConfig {
            commits: 200,
            readers: 2,
            max_held: 5,
            engine: Config::default()
                .sync_on_commit(false)
                .reclaim_on_release(false)
                .primary(PrimaryPolicy::KeepLast(2)),
        };
        let result = stress_snapshot_retention(&config);
        assert!(result.is_clean(), "{result:?}");
    }
}

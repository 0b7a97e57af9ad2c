//! Simulate command: a writer against concurrent snapshot consumers.

use serde::Serialize;
use snapkeep_core::{Config, PrimaryPolicy};
use snapkeep_testkit::{stress_snapshot_retention, StressConfig};

/// Options for a simulation run.
#[derive(Debug, Clone)]
pub struct SimulateOptions {
    /// Commits to write.
    pub commits: usize,
    /// Snapshot consumers.
    pub readers: usize,
    /// Snapshots each consumer may hold at once.
    pub max_held: usize,
    /// Commits the primary policy keeps; `None` keeps only the last.
    pub keep_last: Option<usize>,
    /// Leave released commits for the next commit cycle.
    pub deferred: bool,
}

/// Simulation outcome.
#[derive(Debug, Serialize)]
pub struct SimulateResult {
    /// Commits written.
    pub commits: usize,
    /// Commits that failed.
    pub failed_commits: usize,
    /// Snapshots taken.
    pub snapshots: usize,
    /// Invariant violations observed.
    pub violations: usize,
    /// Wall time in milliseconds.
    pub duration_millis: u64,
    /// Snapshot throughput.
    pub snapshots_per_second: f64,
}

/// Runs the simulate command.
pub fn run(options: &SimulateOptions, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = simulate(options)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            println!("SnapKeep Simulation");
            println!("===================");
            println!();
            println!("Commits:    {} ({} failed)", result.commits, result.failed_commits);
            println!("Snapshots:  {}", result.snapshots);
            println!("Violations: {}", result.violations);
            println!("Duration:   {} ms", result.duration_millis);
            println!("Throughput: {:.2} snapshots/sec", result.snapshots_per_second);
        }
    }

    if result.violations > 0 {
        return Err(format!("{} retention violations", result.violations).into());
    }
    Ok(())
}

/// Runs the simulation and collects the result.
pub fn simulate(options: &SimulateOptions) -> Result<SimulateResult, Box<dyn std::error::Error>> {
    let primary = options
        .keep_last
        .map_or(PrimaryPolicy::KeepOnlyLast, PrimaryPolicy::KeepLast);
    let engine = Config::default()
        .primary(primary)
        .reclaim_on_release(!options.deferred)
        .sync_on_commit(false);
    engine.validate()?;

    let outcome = stress_snapshot_retention(&StressConfig {
        commits: options.commits,
        readers: options.readers,
        max_held: options.max_held,
        engine,
    });

    Ok(SimulateResult {
        commits: outcome.commits,
        failed_commits: outcome.failed_commits,
        snapshots: outcome.snapshots,
        violations: outcome.violations,
        duration_millis: u64::try_from(outcome.duration.as_millis()).unwrap_or(u64::MAX),
        snapshots_per_second: outcome.snapshots_per_second,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulate_small_run() {
        let result = simulate(&SimulateOptions {
            commits: 50,
            readers: 2,
            max_held: 2,
            keep_last: Some(2),
            deferred: true,
        })
        .unwrap();
        assert_eq!(result.commits, 50);
        assert_eq!(result.violations, 0);
    }

    #[test]
    fn simulate_rejects_zero_retention() {
        let options = SimulateOptions {
            commits: 1,
            readers: 1,
            max_held: 1,
            keep_last: Some(0),
            deferred: false,
        };
        assert!(simulate(&options).is_err());
    }
}

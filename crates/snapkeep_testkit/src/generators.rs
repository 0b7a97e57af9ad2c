//! Property-based test generators using proptest.
//!
//! Provides strategies for generating sequences of commits, snapshots and
//! releases.

use proptest::prelude::*;
use snapkeep_core::PrimaryPolicy;
use std::time::Duration;

/// One step of a consumer/writer interleaving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOp {
    /// Write a commit that replaces every current artifact.
    Commit,
    /// Snapshot the current commit.
    SnapshotCurrent,
    /// Snapshot every live commit.
    SnapshotAll,
    /// Release an outstanding handle.
    Release {
        /// Picks the handle, modulo the number outstanding.
        index: usize,
    },
    /// Release an outstanding handle, then release it again.
    ReleaseTwice {
        /// Picks the handle, modulo the number outstanding.
        index: usize,
    },
    /// Drop an outstanding handle without releasing it.
    Drop {
        /// Picks the handle, modulo the number outstanding.
        index: usize,
    },
}

/// Strategy for generating a single operation.
pub fn snapshot_op_strategy() -> impl Strategy<Value = SnapshotOp> {
    prop_oneof![
        4 => Just(SnapshotOp::Commit),
        3 => Just(SnapshotOp::SnapshotCurrent),
        1 => Just(SnapshotOp::SnapshotAll),
        3 => any::<usize>().prop_map(|index| SnapshotOp::Release { index }),
        1 => any::<usize>().prop_map(|index| SnapshotOp::ReleaseTwice { index }),
        1 => any::<usize>().prop_map(|index| SnapshotOp::Drop { index }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn snapshot_op_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<SnapshotOp>> {
    prop::collection::vec(snapshot_op_strategy(), min_ops..max_ops)
}

/// Strategy for generating primary policies that delete something.
pub fn primary_policy_strategy() -> impl Strategy<Value = PrimaryPolicy> {
    prop_oneof![
        Just(PrimaryPolicy::KeepOnlyLast),
        Just(PrimaryPolicy::KeepAll),
        (1usize..4).prop_map(PrimaryPolicy::KeepLast),
        Just(PrimaryPolicy::ExpireAfter(Duration::from_millis(1))),
    ]
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn sequences_respect_bounds(ops in snapshot_op_sequence_strategy(5, 20)) {
            prop_assert!(ops.len() >= 5 && ops.len() < 20);
        }

        #[test]
        fn generated_policies_are_valid(primary in primary_policy_strategy()) {
            let config = snapkeep_core::Config::default().primary(primary);
            prop_assert!(config.validate().is_ok());
        }
    }
}

//! # SnapKeep Testkit
//!
//! Test utilities for SnapKeep.
//!
//! This crate provides:
//! - Engine fixtures over in-memory and directory stores
//! - A store that fails on demand, for error-path tests
//! - Property-based operation generators using proptest
//! - A model-checking harness for snapshot retention
//! - Concurrent stress runs of writers and snapshot consumers
//!
//! ## Usage
//!
//! ```rust
//! use snapkeep_testkit::prelude::*;
//!
//! with_engine(|engine| {
//!     engine.commit_file("_0.seg");
//!     let handle = engine.policy.snapshot_current().unwrap();
//!     assert!(handle.release());
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod failing;
pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::failing::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
}

pub use failing::*;
pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;

//! Core type definitions for SnapKeep.

use std::fmt;

/// Version of a commit point.
///
/// Versions are strictly increasing across the commits of one engine
/// instance and are the only identity used for snapshot reference counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommitVersion(pub u64);

impl CommitVersion {
    /// Creates a new commit version.
    #[must_use]
    pub const fn new(version: u64) -> Self {
        Self(version)
    }

    /// Returns the raw version value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next version.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for CommitVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v:{}", self.0)
    }
}

/// Generation of a commit manifest file.
///
/// The generation is encoded in the manifest's artifact name, so listing
/// the store is enough to order commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl Generation {
    /// Creates a new generation.
    #[must_use]
    pub const fn new(generation: u64) -> Self {
        Self(generation)
    }

    /// Returns the raw generation value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next generation.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ordering() {
        let v1 = CommitVersion::new(1);
        let v2 = v1.next();
        assert!(v1 < v2);
        assert_eq!(v2.as_u64(), 2);
    }

    #[test]
    fn version_display() {
        assert_eq!(format!("{}", CommitVersion::new(42)), "v:42");
    }

    #[test]
    fn generation_display() {
        assert_eq!(format!("{}", Generation::new(7).next()), "gen:8");
    }
}

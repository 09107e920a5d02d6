use std::fmt;
use std::str::FromStr;

use crate::error::VersionError;

/// Semantic version restricted to `major.minor.patch`.
///
/// Ordering is lexicographic over the three components. Tag prefixes are a
/// formatting concern and never stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemVer {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        SemVer {
            major,
            minor,
            patch,
        }
    }

    /// Parse a strict `major.minor.patch` string.
    ///
    /// Pre-release and build metadata, leading zeros, surrounding whitespace and
    /// any `v` prefix are all rejected.
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let parsed = semver::Version::parse(text)
            .map_err(|e| VersionError::malformed(format!("'{}': {}", text, e)))?;

        if !parsed.pre.is_empty() || !parsed.build.is_empty() {
            return Err(VersionError::malformed(format!(
                "'{}': expected major.minor.patch without pre-release or build metadata",
                text
            )));
        }

        Ok(SemVer::new(parsed.major, parsed.minor, parsed.patch))
    }

    /// Next patch release: patch + 1, nothing else reset.
    pub fn next_patch(&self) -> Result<Self, VersionError> {
        let patch = self
            .patch
            .checked_add(1)
            .ok_or_else(|| VersionError::malformed(format!("{} has no next patch version", self)))?;
        Ok(SemVer { patch, ..*self })
    }
}

impl FromStr for SemVer {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SemVer::parse(s)
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

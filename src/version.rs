//! Tool version identifiers
//!
//! A version is a plain `MAJOR.MINOR.PATCH` triple. Anything else (pre-release
//! suffixes, build metadata, missing segments) is unparseable and sorts below
//! every parseable version when compared as `Option<Version>`.

use crate::error::{BootError, BootResult};
use std::fmt;
use std::str::FromStr;

/// A `(major, minor, patch)` triple with lexicographic ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version, returning `None` for anything that is not a plain triple
    pub fn parse(s: &str) -> Option<Self> {
        let parsed = semver::Version::parse(s.trim()).ok()?;
        if !parsed.pre.is_empty() || !parsed.build.is_empty() {
            return None;
        }
        Some(Self::new(parsed.major, parsed.minor, parsed.patch))
    }
}

impl FromStr for Version {
    type Err = BootError;

    fn from_str(s: &str) -> BootResult<Self> {
        Self::parse(s).ok_or_else(|| BootError::VersionInvalid(s.to_string()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Pick the highest parseable name; unparseable names never win
pub fn latest<'a, I>(names: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter_map(|name| Version::parse(name).map(|v| (v, name)))
        .max_by_key(|(v, _)| *v)
        .map(|(_, name)| name)
}

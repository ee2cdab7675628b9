//! Root manifest versions and bumps
//!
//! Versions are `semver::Version`; this module adds the lenient parse used
//! for manifests and the bump applied before packages are derived.

use semver::{BuildMetadata, Prerelease};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use semver::Version;

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("Invalid version '{input}': {source}")]
    InvalidVersion {
        input: String,
        #[source]
        source: semver::Error,
    },

    #[error("Invalid version bump: {0}. Expected major, minor or patch")]
    InvalidBump(String),
}

/// Parse a version string, accepting surrounding whitespace and a `v` prefix
pub fn parse_version(s: &str) -> Result<Version, VersionError> {
    let trimmed = s.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(trimmed).map_err(|source| VersionError::InvalidVersion {
        input: s.to_string(),
        source,
    })
}

fn release(major: u64, minor: u64, patch: u64) -> Version {
    Version {
        major,
        minor,
        patch,
        pre: Prerelease::EMPTY,
        build: BuildMetadata::EMPTY,
    }
}

/// How the root version changes before packages are derived
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionBump {
    Major,
    Minor,
    Patch,
    /// Replace the version outright
    Set(Version),
}

impl VersionBump {
    /// Compute the version that follows `current`.
    ///
    /// A pre-release already heading for the bumped version is released
    /// instead of skipped over: `2.0.0-rc.1` bumps to `2.0.0` on any level
    /// that lands there.
    pub fn apply(&self, current: &Version) -> Version {
        let pre = !current.pre.is_empty();
        match self {
            VersionBump::Major if pre && current.minor == 0 && current.patch == 0 => {
                release(current.major, 0, 0)
            }
            VersionBump::Major => release(current.major + 1, 0, 0),
            VersionBump::Minor if pre && current.patch == 0 => {
                release(current.major, current.minor, 0)
            }
            VersionBump::Minor => release(current.major, current.minor + 1, 0),
            VersionBump::Patch if pre => release(current.major, current.minor, current.patch),
            VersionBump::Patch => release(current.major, current.minor, current.patch + 1),
            VersionBump::Set(version) => version.clone(),
        }
    }
}

impl FromStr for VersionBump {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "major" => Ok(VersionBump::Major),
            "minor" => Ok(VersionBump::Minor),
            "patch" => Ok(VersionBump::Patch),
            other => Err(VersionError::InvalidBump(other.to_string())),
        }
    }
}

impl fmt::Display for VersionBump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionBump::Major => write!(f, "major"),
            VersionBump::Minor => write!(f, "minor"),
            VersionBump::Patch => write!(f, "patch"),
            VersionBump::Set(version) => write!(f, "{}", version),
        }
    }
}

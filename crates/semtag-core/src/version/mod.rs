//! Version parsing, ordering and incrementing.
//!
//! The resolution engine only talks to versions through [`VersionScheme`],
//! so tests (or a future lenient scheme) can swap the implementation.
//! [`SemVer2`] is the strict SemVer 2.0.0 scheme backed by the `semver` crate.

pub mod escalate;
pub mod increment;

use std::cmp::Ordering;

use semver::Version;
use serde::{Deserialize, Serialize};

/// Magnitude of change derived from commit classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpLevel {
    /// Patch release (x.y.Z).
    Patch,
    /// Minor release (x.Y.0).
    Minor,
    /// Major release (X.0.0).
    Major,
}

impl std::fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Patch => write!(f, "patch"),
            Self::Minor => write!(f, "minor"),
            Self::Major => write!(f, "major"),
        }
    }
}

/// The increment actually applied to the selected version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    /// Next major version.
    Major,
    /// Next minor version.
    Minor,
    /// Next patch version.
    Patch,
    /// Next major version, as the first prerelease of it.
    Premajor,
    /// Next minor version, as the first prerelease of it.
    Preminor,
    /// Next patch version, as the first prerelease of it.
    Prepatch,
    /// Same core version, next prerelease counter.
    Prerelease,
}

impl ReleaseType {
    /// The stable release type for a bump level.
    pub const fn stable(level: BumpLevel) -> Self {
        match level {
            BumpLevel::Patch => Self::Patch,
            BumpLevel::Minor => Self::Minor,
            BumpLevel::Major => Self::Major,
        }
    }

    /// The `pre<level>` release type for a bump level.
    pub const fn pre(level: BumpLevel) -> Self {
        match level {
            BumpLevel::Patch => Self::Prepatch,
            BumpLevel::Minor => Self::Preminor,
            BumpLevel::Major => Self::Premajor,
        }
    }

    /// Lowercase name, as used in logs and outputs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
            Self::Premajor => "premajor",
            Self::Preminor => "preminor",
            Self::Prepatch => "prepatch",
            Self::Prerelease => "prerelease",
        }
    }
}

impl std::fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsing, ordering and incrementing of versions.
pub trait VersionScheme {
    /// Parse a bare version (prefix already stripped). `None` if invalid.
    fn parse(&self, raw: &str) -> Option<Version>;

    /// Compare by precedence. Build metadata never participates.
    fn cmp_precedence(&self, a: &Version, b: &Version) -> Ordering;

    /// Apply `release` to `version`. `None` when the increment is refused.
    fn increment(&self, version: &Version, release: ReleaseType, identifier: &str)
    -> Option<Version>;
}

/// Strict SemVer 2.0.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemVer2;

impl VersionScheme for SemVer2 {
    fn parse(&self, raw: &str) -> Option<Version> {
        Version::parse(raw).ok()
    }

    fn cmp_precedence(&self, a: &Version, b: &Version) -> Ordering {
        // semver::Prerelease orders an empty prerelease above any non-empty one.
        (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
    }

    fn increment(
        &self,
        version: &Version,
        release: ReleaseType,
        identifier: &str,
    ) -> Option<Version> {
        increment::increment(version, release, identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn parse_is_strict() {
        assert_eq!(SemVer2.parse("1.2.3"), Some(Version::new(1, 2, 3)));
        assert!(SemVer2.parse("v1.2.3").is_none());
        assert!(SemVer2.parse("1.2").is_none());
        assert!(SemVer2.parse("01.2.3").is_none());
        assert!(SemVer2.parse("").is_none());
    }

    #[test]
    fn precedence_ignores_build_metadata() {
        assert_eq!(
            SemVer2.cmp_precedence(&v("1.0.0+a"), &v("1.0.0+b")),
            Ordering::Equal
        );
    }

    #[test]
    fn precedence_puts_prerelease_below_release() {
        assert_eq!(
            SemVer2.cmp_precedence(&v("1.0.0-rc.1"), &v("1.0.0")),
            Ordering::Less
        );
        assert_eq!(
            SemVer2.cmp_precedence(&v("1.0.0-alpha"), &v("1.0.0-alpha.1")),
            Ordering::Less
        );
        assert_eq!(
            SemVer2.cmp_precedence(&v("1.0.0-2"), &v("1.0.0-10")),
            Ordering::Less
        );
        assert_eq!(
            SemVer2.cmp_precedence(&v("1.0.0-10"), &v("1.0.0-beta")),
            Ordering::Less
        );
    }

    #[test]
    fn precedence_orders_core_numerically() {
        assert_eq!(
            SemVer2.cmp_precedence(&v("1.10.0"), &v("1.9.0")),
            Ordering::Greater
        );
    }

    #[test]
    fn release_type_names() {
        assert_eq!(ReleaseType::pre(BumpLevel::Minor).to_string(), "preminor");
        assert_eq!(ReleaseType::stable(BumpLevel::Major).to_string(), "major");
        assert_eq!(ReleaseType::Prerelease.as_str(), "prerelease");
    }

    #[test]
    fn bump_levels_are_ordered_by_magnitude() {
        assert!(BumpLevel::Major > BumpLevel::Minor);
        assert!(BumpLevel::Minor > BumpLevel::Patch);
    }
}

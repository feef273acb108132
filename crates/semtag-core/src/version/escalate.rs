//! Release-type policy: zero-major dampening and prerelease escalation.

use semver::Version;

use super::{BumpLevel, ReleaseType};

/// The release tier an in-flight prerelease line is heading for, inferred
/// from its core fields: `1.0.1-3` is a patch line, `1.1.0-0` a minor line,
/// `2.0.0-0` a major line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Track {
    /// Patch component is non-zero.
    Patch,
    /// Patch is zero, minor is non-zero.
    Minor,
    /// Minor and patch are zero.
    Major,
}

impl Track {
    /// Infer the track from a version's core fields.
    pub const fn of(version: &Version) -> Self {
        if version.patch > 0 {
            Self::Patch
        } else if version.minor > 0 {
            Self::Minor
        } else {
            Self::Major
        }
    }
}

/// Below 1.0.0 a breaking change only bumps the minor version.
pub const fn dampen(selected: &Version, level: BumpLevel) -> BumpLevel {
    match level {
        BumpLevel::Major if selected.major == 0 => BumpLevel::Minor,
        other => other,
    }
}

/// Map a requested bump onto the prerelease track.
///
/// A stable selected version starts a new `pre<level>` line. An in-flight
/// prerelease line keeps counting (`prerelease`) when its track already
/// covers the request, and only starts a new line when the request is
/// larger, so `1.0.1-3` followed by a feature gives `1.1.0-0` and never
/// regresses below the current line.
pub fn escalate(selected: &Version, requested: BumpLevel) -> ReleaseType {
    let has_prerelease = !selected.pre.is_empty();
    match (has_prerelease, Track::of(selected), requested) {
        (false, _, level) => ReleaseType::pre(level),
        (true, Track::Major, _)
        | (true, Track::Minor, BumpLevel::Minor | BumpLevel::Patch)
        | (true, Track::Patch, BumpLevel::Patch) => ReleaseType::Prerelease,
        (true, Track::Minor, BumpLevel::Major)
        | (true, Track::Patch, BumpLevel::Minor | BumpLevel::Major) => ReleaseType::pre(requested),
    }
}

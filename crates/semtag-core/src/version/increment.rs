//! Release-type increments, compatible with npm's `semver.inc`.
//!
//! Prereleases count towards the release they precede: bumping `2.0.0-rc.3`
//! by `major` yields `2.0.0`, not `3.0.0`.

use semver::{BuildMetadata, Prerelease, Version};

use super::ReleaseType;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Ident {
    Numeric(u64),
    Alpha(String),
}

impl Ident {
    fn parse(raw: &str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            raw.parse().map_or_else(|_| Self::Alpha(raw.to_string()), Self::Numeric)
        } else {
            Self::Alpha(raw.to_string())
        }
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Alpha(s) => f.write_str(s),
        }
    }
}

fn split(pre: &str) -> Vec<Ident> {
    if pre.is_empty() {
        Vec::new()
    } else {
        pre.split('.').map(Ident::parse).collect()
    }
}

/// Apply `release` to `version`, using `identifier` for new prereleases.
///
/// Returns `None` when a component would overflow or the resulting
/// prerelease is not valid SemVer.
pub fn increment(version: &Version, release: ReleaseType, identifier: &str) -> Option<Version> {
    let mut next = Bumper {
        major: version.major,
        minor: version.minor,
        patch: version.patch,
        pre: split(version.pre.as_str()),
    };

    match release {
        ReleaseType::Major => next.major()?,
        ReleaseType::Minor => next.minor()?,
        ReleaseType::Patch => next.patch()?,
        ReleaseType::Premajor => {
            next.pre.clear();
            next.major = next.major.checked_add(1)?;
            next.minor = 0;
            next.patch = 0;
            next.bump_pre(identifier)?;
        }
        ReleaseType::Preminor => {
            next.pre.clear();
            next.minor = next.minor.checked_add(1)?;
            next.patch = 0;
            next.bump_pre(identifier)?;
        }
        ReleaseType::Prepatch => {
            next.pre.clear();
            next.patch()?;
            next.bump_pre(identifier)?;
        }
        ReleaseType::Prerelease => {
            if next.pre.is_empty() {
                next.patch()?;
            }
            next.bump_pre(identifier)?;
        }
    }

    next.finish()
}

struct Bumper {
    major: u64,
    minor: u64,
    patch: u64,
    pre: Vec<Ident>,
}

impl Bumper {
    fn major(&mut self) -> Option<()> {
        // X.0.0-pre is already on its way to X.0.0
        if self.minor != 0 || self.patch != 0 || self.pre.is_empty() {
            self.major = self.major.checked_add(1)?;
        }
        self.minor = 0;
        self.patch = 0;
        self.pre.clear();
        Some(())
    }

    fn minor(&mut self) -> Option<()> {
        if self.patch != 0 || self.pre.is_empty() {
            self.minor = self.minor.checked_add(1)?;
        }
        self.patch = 0;
        self.pre.clear();
        Some(())
    }

    fn patch(&mut self) -> Option<()> {
        if self.pre.is_empty() {
            self.patch = self.patch.checked_add(1)?;
        }
        self.pre.clear();
        Some(())
    }

    fn bump_pre(&mut self, identifier: &str) -> Option<()> {
        if self.pre.is_empty() {
            self.pre.push(Ident::Numeric(0));
        } else if let Some(n) = self.pre.iter_mut().rev().find_map(|id| match id {
            Ident::Numeric(n) => Some(n),
            Ident::Alpha(_) => None,
        }) {
            *n = n.checked_add(1)?;
        } else {
            self.pre.push(Ident::Numeric(0));
        }

        if identifier.is_empty() {
            return Some(());
        }

        let wanted = split(identifier);
        let continues_line = self.pre.starts_with(&wanted)
            && matches!(self.pre.get(wanted.len()), Some(Ident::Numeric(_)));
        if !continues_line {
            self.pre = wanted;
            self.pre.push(Ident::Numeric(0));
        }
        Some(())
    }

    fn finish(self) -> Option<Version> {
        let pre = self
            .pre
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        Some(Version {
            major: self.major,
            minor: self.minor,
            patch: self.patch,
            pre: Prerelease::new(&pre).ok()?,
            build: BuildMetadata::EMPTY,
        })
    }
}

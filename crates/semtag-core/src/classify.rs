//! Conventional Commits classification.
//!
//! Reduces a commit list to the largest [`BumpLevel`] any of its subjects
//! asks for, or `None` when nothing warrants a release.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::git::Commit;
use crate::version::BumpLevel;

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<type>\w*)(?:\((?P<scope>.*)\))?(?P<breaking>!)?: (?P<subject>.*)$")
        .expect("invalid regex")
});

/// A parsed conventional-commit header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header<'a> {
    /// Commit type (`feat`, `fix`, ...).
    pub kind: &'a str,
    /// Optional scope between parentheses.
    pub scope: Option<&'a str>,
    /// Whether the header carries the `!` breaking marker.
    pub breaking: bool,
    /// Text after the colon.
    pub subject: &'a str,
}

impl<'a> Header<'a> {
    /// Parse a commit subject line. `None` for non-conventional messages.
    pub fn parse(message: &'a str) -> Option<Self> {
        let caps = HEADER_RE.captures(message)?;
        Some(Self {
            kind: caps.name("type")?.as_str(),
            scope: caps.name("scope").map(|m| m.as_str()),
            breaking: caps.name("breaking").is_some(),
            subject: caps.name("subject")?.as_str(),
        })
    }
}

/// Maps an ordered commit list to the release it warrants.
pub trait CommitClassifier {
    /// The largest bump any commit asks for; `None` when no commit applies.
    fn classify(&self, commits: &[Commit]) -> Option<BumpLevel>;
}

/// Classifier following the conventionalcommits release rules.
///
/// Breaking headers release a major, `feat` a minor, and `fix` and `perf` a
/// patch. Other types, `revert` included, release nothing unless a rule is
/// added.
#[derive(Debug, Clone)]
pub struct ConventionalClassifier {
    rules: BTreeMap<String, BumpLevel>,
}

impl Default for ConventionalClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ConventionalClassifier {
    /// Classifier with the default release rules.
    pub fn new() -> Self {
        let rules = [
            ("feat", BumpLevel::Minor),
            ("fix", BumpLevel::Patch),
            ("perf", BumpLevel::Patch),
        ]
        .into_iter()
        .map(|(kind, level)| (kind.to_string(), level))
        .collect();
        Self { rules }
    }

    /// Add or replace the release rule for a commit type.
    #[must_use]
    pub fn with_rule(mut self, kind: impl Into<String>, level: BumpLevel) -> Self {
        self.rules.insert(kind.into(), level);
        self
    }

    /// Add or replace several rules at once.
    #[must_use]
    pub fn with_rules<I, K>(self, rules: I) -> Self
    where
        I: IntoIterator<Item = (K, BumpLevel)>,
        K: Into<String>,
    {
        rules
            .into_iter()
            .fold(self, |classifier, (kind, level)| classifier.with_rule(kind, level))
    }

    /// The release a single message asks for.
    pub fn level_of(&self, message: &str) -> Option<BumpLevel> {
        let header = Header::parse(message)?;
        if header.breaking {
            return Some(BumpLevel::Major);
        }
        self.rules.get(header.kind).copied()
    }
}

impl CommitClassifier for ConventionalClassifier {
    fn classify(&self, commits: &[Commit]) -> Option<BumpLevel> {
        let level = commits
            .iter()
            .filter_map(|commit| {
                let level = self.level_of(&commit.message);
                trace!(hash = %commit.hash, message = %commit.message, ?level, "classified commit");
                level
            })
            .max();
        debug!(count = commits.len(), ?level, "analyzed commits");
        level
    }
}

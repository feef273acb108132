//! Next-version resolution.
//!
//! All decision logic lives here; git, commit classification and version
//! arithmetic are injected through [`History`], [`CommitClassifier`] and
//! [`VersionScheme`] so the engine runs against fakes in tests.
//!
//! # Pipeline
//!
//! 1. Validate inputs and compile the [`TagPattern`].
//! 2. Find the newest commit with matching tags and the commits after it
//!    ([`Resolver::resolve_history`]).
//! 3. Parse the tags and pick the highest ([`Resolver::select_version`]).
//! 4. Classify the commits and apply zero-major dampening and prerelease
//!    escalation ([`Resolver::release_type`]).
//! 5. Increment and format the outputs.

use regex::Regex;
use semver::Version;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::classify::CommitClassifier;
use crate::git::{Commit, GitError, History, TaggedCommit};
use crate::inputs::TagInputs;
use crate::pattern::{InputError, TagPattern};
use crate::version::escalate::{dampen, escalate};
use crate::version::{ReleaseType, SemVer2, VersionScheme};

/// Errors that abort a resolution run.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// A configured prefix, prerelease or build fails its grammar.
    #[error("invalid configuration: {0}")]
    Configuration(#[from] InputError),

    /// A history query failed (missing tooling or non-zero exit).
    #[error(transparent)]
    Git(#[from] GitError),

    /// No tag matches the pattern, so there is no version to start from.
    #[error("no tags matching /{pattern}/ found in the history of '{reference}'")]
    NoTagsFound {
        /// The queried reference.
        reference: String,
        /// The pattern tags were matched against.
        pattern: String,
    },

    /// Tags were found but none is a valid semantic version.
    #[error("none of the tags [{}] parse as a semantic version", tags.join(", "))]
    NoParseableTags {
        /// The tags that were found.
        tags: Vec<String>,
    },
}

/// Result alias for resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// One resolution run's parameters.
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    /// Commit, branch or other revision to resolve from.
    pub reference: String,
    /// Tag naming inputs.
    pub inputs: TagInputs,
    /// Also report whether the history is free of merge commits.
    pub check_linear: bool,
}

/// The tagged baseline commit and the commits after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySlice {
    /// Newest commit carrying matching tags.
    pub tagged: TaggedCommit,
    /// Commits after it, oldest first.
    pub commits: Vec<Commit>,
}

/// The version a run increments from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedVersion {
    /// The raw tag the version came from.
    pub tag: String,
    /// The parsed version.
    pub version: Version,
    /// Every parseable tag on the commit, highest precedence first.
    pub candidates: Vec<String>,
}

/// What a run reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionOutput {
    /// Tag of the selected version; set whenever selection succeeds.
    pub previous_tag: String,
    /// Next tag, or empty when there is nothing to release.
    pub tag: String,
    /// Next bare version (no prefix, no build), or empty.
    pub semver: String,
    /// The increment that was applied.
    pub release_type: Option<ReleaseType>,
    /// Whether the history is linear, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linear_history: Option<bool>,
}

/// Build the message filter for a conventional-commit scope.
pub fn scope_filter(scope: &str) -> Regex {
    Regex::new(&format!(r"^[a-zA-Z]+\({}\):", regex::escape(scope)))
        .expect("escaped scope is a valid pattern")
}

/// The version resolution engine.
#[derive(Debug, Clone)]
pub struct Resolver<H, C, V = SemVer2> {
    history: H,
    classifier: C,
    versions: V,
}

impl<H: History, C: CommitClassifier> Resolver<H, C> {
    /// Engine using strict SemVer 2.0.0.
    pub const fn new(history: H, classifier: C) -> Self {
        Self {
            history,
            classifier,
            versions: SemVer2,
        }
    }
}

impl<H: History, C: CommitClassifier, V: VersionScheme> Resolver<H, C, V> {
    /// Swap the version scheme.
    pub fn with_versions<W: VersionScheme>(self, versions: W) -> Resolver<H, C, W> {
        Resolver {
            history: self.history,
            classifier: self.classifier,
            versions,
        }
    }

    /// Run the whole pipeline.
    ///
    /// # Errors
    ///
    /// Configuration, git, [`ResolveError::NoTagsFound`] and
    /// [`ResolveError::NoParseableTags`] failures. "Nothing to release" is
    /// not an error: it comes back as an output with empty `tag`/`semver`.
    #[instrument(skip(self, request), fields(reference = %request.reference, prefix = %request.inputs.prefix))]
    pub fn resolve(&self, request: &ResolveRequest) -> ResolveResult<ResolutionOutput> {
        let inputs = &request.inputs;
        inputs.validate()?;
        let prerelease_mode = inputs.prerelease_mode();
        let pattern = TagPattern::compile(&inputs.prefix, prerelease_mode)?;

        let mut output = ResolutionOutput::default();

        if request.check_linear {
            let linear = self.history.is_linear(&request.reference)?;
            if !linear {
                warn!(reference = %request.reference, "history contains merge commits");
            }
            output.linear_history = Some(linear);
        }

        let slice = self.resolve_history(&request.reference, &pattern, inputs.scope.as_deref())?;
        let selected = self.select_version(&slice.tagged.tags, &inputs.prefix)?;
        if selected.candidates.len() > 1 {
            debug!(commit = %slice.tagged.hash, "several versions on the tagged commit");
        }
        output.previous_tag = format!("{}{}", inputs.prefix, selected.version);

        let Some(release) = self.release_type(&slice.commits, &selected.version, prerelease_mode)
        else {
            return Ok(output);
        };
        info!(release_type = %release, "release applied");

        let Some(next) =
            self.versions
                .increment(&selected.version, release, inputs.prerelease_identifier())
        else {
            warn!(
                version = %selected.version,
                release_type = %release,
                "version could not be incremented; no release"
            );
            return Ok(output);
        };

        output.tag = format!("{}{next}{}", inputs.prefix, inputs.build);
        output.semver = next.to_string();
        output.release_type = Some(release);
        info!(previous = %output.previous_tag, tag = %output.tag, "resolved next tag");
        Ok(output)
    }

    /// Find the baseline tags and the commits to classify.
    ///
    /// # Errors
    ///
    /// [`ResolveError::NoTagsFound`] when no commit carries a matching tag,
    /// or any git failure. An empty commit list is not an error.
    pub fn resolve_history(
        &self,
        reference: &str,
        pattern: &TagPattern,
        scope: Option<&str>,
    ) -> ResolveResult<HistorySlice> {
        let tagged = self
            .history
            .latest_tags(reference, pattern)?
            .filter(|t| !t.tags.is_empty())
            .ok_or_else(|| ResolveError::NoTagsFound {
                reference: reference.to_string(),
                pattern: pattern.shell_pattern().to_string(),
            })?;

        let filter = scope.filter(|s| !s.is_empty()).map(scope_filter);
        let commits = self
            .history
            .commits_since(&tagged.hash, reference, filter.as_ref())?;
        debug!(
            tagged = %tagged.hash,
            tags = ?tagged.tags,
            commits = commits.len(),
            "history resolved"
        );
        Ok(HistorySlice { tagged, commits })
    }

    /// Parse tags (after stripping `prefix`) and pick the highest precedence.
    ///
    /// Equal precedence (e.g. tags differing only in build metadata) is
    /// broken by the raw tag string, ascending.
    ///
    /// # Errors
    ///
    /// [`ResolveError::NoParseableTags`] when no tag parses.
    pub fn select_version(&self, tags: &[String], prefix: &str) -> ResolveResult<SelectedVersion> {
        let mut parsed: Vec<(&String, Version)> = tags
            .iter()
            .filter_map(|tag| {
                let version = tag
                    .strip_prefix(prefix)
                    .and_then(|bare| self.versions.parse(bare));
                if version.is_none() {
                    warn!(%tag, "could not parse tag; ignoring it");
                }
                version.map(|v| (tag, v))
            })
            .collect();

        parsed.sort_by(|(tag_a, a), (tag_b, b)| {
            self.versions.cmp_precedence(b, a).then_with(|| tag_a.cmp(tag_b))
        });

        let candidates: Vec<String> = parsed.iter().map(|(tag, _)| (*tag).clone()).collect();
        let Some((tag, version)) = parsed.into_iter().next() else {
            return Err(ResolveError::NoParseableTags {
                tags: tags.to_vec(),
            });
        };

        if candidates.len() > 1 {
            warn!(
                candidates = %candidates.join("; "),
                selected = %tag,
                "multiple versions found on the same commit; the highest precedence one is selected"
            );
        }
        Ok(SelectedVersion {
            tag: tag.clone(),
            version,
            candidates,
        })
    }

    /// Decide the increment for `commits` on top of `selected`.
    ///
    /// `None` means nothing to release: no commits, or no commit that the
    /// classifier considers a change.
    pub fn release_type(
        &self,
        commits: &[Commit],
        selected: &Version,
        prerelease_mode: bool,
    ) -> Option<ReleaseType> {
        let (Some(first), Some(last)) = (commits.first(), commits.last()) else {
            info!("no commits since the last tag; no new version");
            return None;
        };

        let Some(level) = self.classifier.classify(commits) else {
            info!(
                from = %first.hash,
                to = %last.hash,
                "analysis of commits results in no new version"
            );
            return None;
        };

        let level = dampen(selected, level);
        let release = if prerelease_mode {
            escalate(selected, level)
        } else {
            ReleaseType::stable(level)
        };
        debug!(%level, %release, "release type");
        Some(release)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::cmp::Ordering;

    use super::*;
    use crate::classify::ConventionalClassifier;
    use crate::git::GitResult;
    use crate::version::BumpLevel;

    const TAGGED: &str = "1111111111111111111111111111111111111111";

    #[derive(Default)]
    struct FakeHistory {
        tags: Vec<&'static str>,
        commits: Vec<&'static str>,
        merges: bool,
        missing_git: bool,
        queries: RefCell<Vec<String>>,
    }

    impl FakeHistory {
        fn new(tags: &[&'static str], commits: &[&'static str]) -> Self {
            Self {
                tags: tags.to_vec(),
                commits: commits.to_vec(),
                ..Self::default()
            }
        }

        fn check(&self, query: String) -> GitResult<()> {
            self.queries.borrow_mut().push(query);
            if self.missing_git {
                return Err(GitError::MissingBinary {
                    binary: "git".into(),
                });
            }
            Ok(())
        }
    }

    impl History for &FakeHistory {
        fn latest_tags(
            &self,
            reference: &str,
            pattern: &TagPattern,
        ) -> GitResult<Option<TaggedCommit>> {
            self.check(format!("tags {reference}"))?;
            let tags: Vec<String> = self
                .tags
                .iter()
                .filter(|t| pattern.matches(t) || !t.starts_with(pattern.prefix()))
                .map(|t| (*t).to_string())
                .collect();
            Ok((!tags.is_empty()).then(|| TaggedCommit {
                hash: TAGGED.into(),
                tags,
            }))
        }

        fn commits_since(
            &self,
            base: &str,
            reference: &str,
            filter: Option<&Regex>,
        ) -> GitResult<Vec<Commit>> {
            self.check(format!("commits {base}..{reference}"))?;
            Ok(self
                .commits
                .iter()
                .enumerate()
                .filter(|(_, m)| filter.is_none_or(|re| re.is_match(m)))
                .map(|(i, m)| Commit {
                    hash: format!("{:040x}", i + 2),
                    message: (*m).to_string(),
                })
                .collect())
        }

        fn is_linear(&self, reference: &str) -> GitResult<bool> {
            self.check(format!("linear {reference}"))?;
            Ok(!self.merges)
        }
    }

    struct Fixed(Option<BumpLevel>);

    impl CommitClassifier for Fixed {
        fn classify(&self, _commits: &[Commit]) -> Option<BumpLevel> {
            self.0
        }
    }

    struct Refusing;

    impl VersionScheme for Refusing {
        fn parse(&self, raw: &str) -> Option<Version> {
            SemVer2.parse(raw)
        }

        fn cmp_precedence(&self, a: &Version, b: &Version) -> Ordering {
            SemVer2.cmp_precedence(a, b)
        }

        fn increment(&self, _: &Version, _: ReleaseType, _: &str) -> Option<Version> {
            None
        }
    }

    fn request(prefix: &str, prerelease: &str, build: &str, scope: Option<&str>) -> ResolveRequest {
        ResolveRequest {
            reference: "HEAD".into(),
            inputs: TagInputs::new(prefix, prerelease, build, scope).unwrap(),
            check_linear: false,
        }
    }

    fn resolve(history: &FakeHistory, req: &ResolveRequest) -> ResolveResult<ResolutionOutput> {
        Resolver::new(history, ConventionalClassifier::new()).resolve(req)
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn commit(message: &str) -> Commit {
        Commit {
            hash: "2".repeat(40),
            message: message.into(),
        }
    }

    #[test]
    fn feature_bumps_minor() {
        let history = FakeHistory::new(&["v1.0.0"], &["feat: add x"]);
        let out = resolve(&history, &request("v", "", "", None)).unwrap();
        assert_eq!(out.previous_tag, "v1.0.0");
        assert_eq!(out.tag, "v1.1.0");
        assert_eq!(out.semver, "1.1.0");
        assert_eq!(out.release_type, Some(ReleaseType::Minor));
        assert_eq!(out.linear_history, None);
    }

    #[test]
    fn no_commits_means_no_release() {
        let history = FakeHistory::new(&["v1.0.0"], &[]);
        let out = resolve(&history, &request("v", "", "", None)).unwrap();
        assert_eq!(out.previous_tag, "v1.0.0");
        assert_eq!(out.tag, "");
        assert_eq!(out.semver, "");
        assert_eq!(out.release_type, None);
    }

    #[test]
    fn non_releasing_commits_mean_no_release() {
        let history = FakeHistory::new(&["v1.0.0"], &["docs: readme", "chore: tidy"]);
        let out = resolve(&history, &request("v", "", "", None)).unwrap();
        assert_eq!(out.previous_tag, "v1.0.0");
        assert!(out.tag.is_empty());
    }

    #[test]
    fn commits_are_queried_from_the_tagged_commit() {
        let history = FakeHistory::new(&["v1.0.0"], &["fix: y"]);
        resolve(&history, &request("v", "", "", None)).unwrap();
        let queries = history.queries.borrow();
        assert_eq!(queries[0], "tags HEAD");
        assert_eq!(queries[1], format!("commits {TAGGED}..HEAD"));
    }

    #[test]
    fn build_suffix_only_on_tag() {
        let history = FakeHistory::new(&["v1.0.0"], &["fix: y"]);
        let out = resolve(&history, &request("v", "", "ci.7", None)).unwrap();
        assert_eq!(out.tag, "v1.0.1+ci.7");
        assert_eq!(out.semver, "1.0.1");
    }

    #[test]
    fn multiple_tags_on_head_select_one_version() {
        let history = FakeHistory::new(&["v1.0.0+alias", "v1.0.0"], &["fix: z"]);
        let resolver = Resolver::new(&history, ConventionalClassifier::new());
        let tags = vec!["v1.0.0+alias".to_string(), "v1.0.0".to_string()];

        let selected = resolver.select_version(&tags, "v").unwrap();
        assert_eq!(selected.candidates.len(), 2);
        assert_eq!(selected.tag, "v1.0.0");
        assert_eq!(selected.version, v("1.0.0"));

        let out = resolver.resolve(&request("v", "", "", None)).unwrap();
        assert_eq!(out.previous_tag, "v1.0.0");
        assert_eq!(out.tag, "v1.0.1");
    }

    #[test]
    fn highest_precedence_wins() {
        let history = FakeHistory::default();
        let resolver = Resolver::new(&history, ConventionalClassifier::new());
        let tags: Vec<String> = ["v1.0.0-rc.1", "v1.0.0", "v0.9.9"]
            .into_iter()
            .map(String::from)
            .collect();
        let selected = resolver.select_version(&tags, "v").unwrap();
        assert_eq!(selected.version, v("1.0.0"));
        assert_eq!(selected.candidates, vec!["v1.0.0", "v1.0.0-rc.1", "v0.9.9"]);
    }

    #[test]
    fn unparseable_tags_are_dropped() {
        let history = FakeHistory::default();
        let resolver = Resolver::new(&history, ConventionalClassifier::new());
        let tags = vec!["release-1".to_string(), "v1.2.3".to_string()];
        let selected = resolver.select_version(&tags, "v").unwrap();
        assert_eq!(selected.version, v("1.2.3"));
        assert_eq!(selected.candidates, vec!["v1.2.3"]);
    }

    #[test]
    fn no_parseable_tags_is_fatal() {
        let history = FakeHistory::new(&["w1.0.0"], &["feat: x"]);
        let err = resolve(&history, &request("v", "", "", None)).unwrap_err();
        assert!(matches!(err, ResolveError::NoParseableTags { ref tags } if tags == &["w1.0.0"]));
    }

    #[test]
    fn no_tags_is_fatal() {
        let history = FakeHistory::new(&[], &["feat: x"]);
        let err = resolve(&history, &request("v", "", "", None)).unwrap_err();
        assert!(matches!(err, ResolveError::NoTagsFound { .. }));
        assert!(err.to_string().contains("'HEAD'"));
    }

    #[test]
    fn invalid_inputs_fail_before_any_query() {
        let history = FakeHistory::new(&["v1.0.0"], &["feat: x"]);
        let mut req = request("v", "", "", None);
        req.inputs.prefix = "v1".into();
        let err = resolve(&history, &req).unwrap_err();
        assert!(matches!(err, ResolveError::Configuration(_)));
        assert!(history.queries.borrow().is_empty());
    }

    #[test]
    fn missing_git_is_reported_distinctly() {
        let history = FakeHistory {
            missing_git: true,
            ..FakeHistory::new(&["v1.0.0"], &[])
        };
        let err = resolve(&history, &request("v", "", "", None)).unwrap_err();
        assert!(matches!(err, ResolveError::Git(GitError::MissingBinary { .. })));
    }

    #[test]
    fn scope_filter_restricts_commits() {
        let history = FakeHistory::new(&["v1.0.0"], &["feat(api): x", "fix(cli): y"]);
        let out = resolve(&history, &request("v", "", "", Some("cli"))).unwrap();
        assert_eq!(out.tag, "v1.0.1");

        let out = resolve(&history, &request("v", "", "", Some("web"))).unwrap();
        assert_eq!(out.tag, "");
        assert_eq!(out.previous_tag, "v1.0.0");
    }

    #[test]
    fn scope_filter_escapes_regex_metacharacters() {
        let re = scope_filter("a.b+");
        assert!(re.is_match("feat(a.b+): x"));
        assert!(!re.is_match("feat(axbb): x"));
        assert!(!re.is_match("x feat(a.b+): x"));
    }

    #[test]
    fn zero_major_dampening() {
        let history = FakeHistory::new(&["v0.3.1"], &["feat!: break"]);
        let resolver = Resolver::new(&history, Fixed(Some(BumpLevel::Major)));
        assert_eq!(
            resolver.release_type(&[commit("feat!: break")], &v("0.3.1"), false),
            Some(ReleaseType::Minor)
        );
        let out = resolver.resolve(&request("v", "", "", None)).unwrap();
        assert_eq!(out.tag, "v0.4.0");
    }

    #[test]
    fn empty_commits_short_circuit_the_classifier() {
        let history = FakeHistory::default();
        let resolver = Resolver::new(&history, Fixed(Some(BumpLevel::Major)));
        assert_eq!(resolver.release_type(&[], &v("1.0.0"), false), None);
    }

    #[test]
    fn prerelease_escalation_table() {
        let history = FakeHistory::default();
        let cases = [
            ("1.2.3", BumpLevel::Patch, ReleaseType::Prepatch),
            ("1.0.1-0", BumpLevel::Patch, ReleaseType::Prerelease),
            ("1.1.0-0", BumpLevel::Patch, ReleaseType::Prerelease),
            ("1.1.0-0", BumpLevel::Major, ReleaseType::Premajor),
            ("2.0.0-0", BumpLevel::Minor, ReleaseType::Prerelease),
        ];
        for (selected, level, expected) in cases {
            let resolver = Resolver::new(&history, Fixed(Some(level)));
            assert_eq!(
                resolver.release_type(&[commit("x")], &v(selected), true),
                Some(expected),
                "{selected} + {level}"
            );
        }
    }

    #[test]
    fn prerelease_run_continues_existing_line() {
        let history = FakeHistory::new(&["v1.0.1-beta.0"], &["fix: a"]);
        let out = resolve(&history, &request("v", "beta", "", None)).unwrap();
        assert_eq!(out.previous_tag, "v1.0.1-beta.0");
        assert_eq!(out.tag, "v1.0.1-beta.1");
        assert_eq!(out.release_type, Some(ReleaseType::Prerelease));
    }

    #[test]
    fn prerelease_run_from_stable_starts_a_line() {
        let history = FakeHistory::new(&["v1.2.3"], &["feat: a"]);
        let out = resolve(&history, &request("v", "rc", "", None)).unwrap();
        assert_eq!(out.tag, "v1.3.0-rc.0");
        assert_eq!(out.semver, "1.3.0-rc.0");
    }

    #[test]
    fn release_run_ignores_prerelease_tags() {
        let history = FakeHistory::new(&["v2.0.0-rc.0", "v1.4.0"], &["fix: a"]);
        let out = resolve(&history, &request("v", "", "", None)).unwrap();
        assert_eq!(out.previous_tag, "v1.4.0");
        assert_eq!(out.tag, "v1.4.1");
    }

    #[test]
    fn refused_increment_is_not_an_error() {
        let history = FakeHistory::new(&["v1.0.0"], &["feat: x"]);
        let resolver = Resolver::new(&history, ConventionalClassifier::new()).with_versions(Refusing);
        let out = resolver.resolve(&request("v", "", "", None)).unwrap();
        assert_eq!(out.previous_tag, "v1.0.0");
        assert_eq!(out.tag, "");
        assert_eq!(out.semver, "");
        assert_eq!(out.release_type, None);
    }

    #[test]
    fn linearity_is_reported_on_request() {
        let history = FakeHistory {
            merges: true,
            ..FakeHistory::new(&["v1.0.0"], &["fix: a"])
        };
        let mut req = request("v", "", "", None);
        req.check_linear = true;
        let out = resolve(&history, &req).unwrap();
        assert_eq!(out.linear_history, Some(false));
        assert_eq!(out.tag, "v1.0.1");
    }

    #[test]
    fn resolution_is_idempotent() {
        let history = FakeHistory::new(&["v1.0.0", "v1.0.0+b"], &["feat: a", "fix: b"]);
        let req = request("v", "", "", None);
        assert_eq!(resolve(&history, &req).unwrap(), resolve(&history, &req).unwrap());
    }

    #[test]
    fn previous_tag_round_trips() {
        for tag in ["v1.0.0", "v0.1.0-rc.2", "v3.2.1+build.9"] {
            let history = FakeHistory::new(&[tag], &[]);
            let resolver = Resolver::new(&history, ConventionalClassifier::new());
            let selected = resolver.select_version(&[tag.to_string()], "v").unwrap();
            let out = resolver.resolve(&request("v", "rc", "", None)).unwrap();
            let reparsed = SemVer2
                .parse(out.previous_tag.strip_prefix('v').unwrap())
                .unwrap();
            assert_eq!(reparsed, selected.version);
        }
    }

    #[test]
    fn output_serializes_without_absent_linearity() {
        let out = ResolutionOutput {
            previous_tag: "v1.0.0".into(),
            tag: "v1.1.0".into(),
            semver: "1.1.0".into(),
            release_type: Some(ReleaseType::Minor),
            linear_history: None,
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["previous_tag"], "v1.0.0");
        assert_eq!(json["release_type"], "minor");
        assert!(json.get("linear_history").is_none());
    }
}

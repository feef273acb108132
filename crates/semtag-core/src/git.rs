//! Git history queries.
//!
//! Shells out to `git` for every query, one process per query, so the
//! user's git configuration (safe directories, replace refs, shallow
//! clones) applies unchanged. Nothing here writes to the repository.

use std::path::{Path, PathBuf};
use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::pattern::TagPattern;

/// Exit code shells use for "command not found".
const EXIT_MISSING_BINARY: i32 = 127;

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// The `git` binary (or a binary it needs) is not installed.
    #[error("{binary} is not available: required binaries are missing")]
    MissingBinary {
        /// The binary that could not be run.
        binary: String,
    },

    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("command failed: '{command}'\n{stderr}")]
    Command {
        /// The full command line that failed.
        command: String,
        /// Captured stderr.
        stderr: String,
    },
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// A commit as seen by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    /// Full 40-character hash.
    pub hash: String,
    /// First line of the commit message.
    pub message: String,
}

impl Commit {
    /// Parse one `%H %s` line. `None` unless it starts with a 40-hex hash.
    pub fn parse_line(line: &str) -> Option<Self> {
        let (hash, message) = line.split_once(' ').unwrap_or((line, ""));
        let valid = hash.len() == 40 && hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        valid.then(|| Self {
            hash: hash.to_string(),
            message: message.to_string(),
        })
    }
}

/// The newest commit carrying matching tags, and those tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedCommit {
    /// Hash of the tagged commit.
    pub hash: String,
    /// Matching tags on that commit, in decoration order.
    pub tags: Vec<String>,
}

/// Read-only access to repository history.
pub trait History {
    /// Find the most recent commit reachable from `reference` that carries
    /// at least one tag matching `pattern`.
    fn latest_tags(&self, reference: &str, pattern: &TagPattern) -> GitResult<Option<TaggedCommit>>;

    /// Commits after `base` up to `reference`, oldest first, optionally
    /// restricted to messages matching `filter`.
    fn commits_since(
        &self,
        base: &str,
        reference: &str,
        filter: Option<&Regex>,
    ) -> GitResult<Vec<Commit>>;

    /// Whether no merge commit is reachable from `reference`.
    fn is_linear(&self, reference: &str) -> GitResult<bool>;
}

/// [`History`] backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct GitHistory {
    binary: PathBuf,
    workdir: Option<Utf8PathBuf>,
}

impl GitHistory {
    /// Locate `git` on `PATH`.
    ///
    /// # Errors
    ///
    /// [`GitError::MissingBinary`] when `git` cannot be found.
    pub fn new() -> GitResult<Self> {
        let binary = which::which("git").map_err(|e| {
            debug!(error = %e, "git lookup failed");
            GitError::MissingBinary {
                binary: "git".into(),
            }
        })?;
        debug!(binary = %binary.display(), "using git");
        Ok(Self {
            binary,
            workdir: None,
        })
    }

    /// Run queries in `dir` instead of the process working directory.
    #[must_use]
    pub fn in_dir(mut self, dir: impl AsRef<Utf8Path>) -> Self {
        self.workdir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Path of the `git` binary in use.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run a git command and return its stdout without the trailing newline.
    fn git(&self, args: &[&str]) -> GitResult<String> {
        let mut command = Command::new(&self.binary);
        if let Some(ref dir) = self.workdir {
            command.arg("-C").arg(dir.as_std_path());
        }
        let output = match command.args(args).output() {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GitError::MissingBinary {
                    binary: "git".into(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Ok(stdout.strip_suffix('\n').unwrap_or(&stdout).to_string());
        }
        if output.status.code() == Some(EXIT_MISSING_BINARY) {
            return Err(GitError::MissingBinary {
                binary: "git".into(),
            });
        }
        Err(GitError::Command {
            command: format!("git {}", args.join(" ")),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl History for GitHistory {
    #[instrument(skip(self, pattern), fields(pattern = pattern.shell_pattern()))]
    fn latest_tags(&self, reference: &str, pattern: &TagPattern) -> GitResult<Option<TaggedCommit>> {
        let output = self.git(&[
            "log",
            "--simplify-by-decoration",
            "--decorate=short",
            "--pretty=format:%H%x00%D",
            reference,
            "--",
        ])?;
        let found = latest_tagged_commit(&output, pattern);
        debug!(?found, "latest tagged commit");
        Ok(found)
    }

    #[instrument(skip(self, filter), fields(filter = filter.map(Regex::as_str)))]
    fn commits_since(
        &self,
        base: &str,
        reference: &str,
        filter: Option<&Regex>,
    ) -> GitResult<Vec<Commit>> {
        let range = if base.is_empty() {
            reference.to_string()
        } else {
            format!("{base}..{reference}")
        };
        let output = self.git(&["log", "--pretty=format:%H %s", "--reverse", &range, "--"])?;
        let commits = parse_commits(&output, filter);
        debug!(count = commits.len(), "commits since tag");
        Ok(commits)
    }

    #[instrument(skip(self))]
    fn is_linear(&self, reference: &str) -> GitResult<bool> {
        let output = self.git(&["log", "--min-parents=2", "--pretty=format:%H", reference, "--"])?;
        let merges = output.lines().filter(|l| !l.is_empty()).count();
        debug!(merges, "merge commits in history");
        Ok(merges == 0)
    }
}

/// Pick the first `%H\0%D` record whose decoration carries a matching tag.
fn latest_tagged_commit(log: &str, pattern: &TagPattern) -> Option<TaggedCommit> {
    log.lines().find_map(|line| {
        let (hash, decoration) = line.split_once('\0')?;
        if !pattern.annotation_matches(decoration) {
            return None;
        }
        let tags = pattern.tags_in(decoration);
        (!tags.is_empty()).then(|| TaggedCommit {
            hash: hash.to_string(),
            tags,
        })
    })
}

fn parse_commits(log: &str, filter: Option<&Regex>) -> Vec<Commit> {
    log.lines()
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let commit = Commit::parse_line(line);
            if commit.is_none() {
                warn!(%line, "skipping malformed git log line");
            }
            commit
        })
        .filter(|commit| filter.is_none_or(|re| re.is_match(&commit.message)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const C: &str = "cccccccccccccccccccccccccccccccccccccccc";

    #[test]
    fn commit_line_parsing() {
        let c = Commit::parse_line(&format!("{A} feat: add x")).unwrap();
        assert_eq!(c.hash, A);
        assert_eq!(c.message, "feat: add x");

        let c = Commit::parse_line(A).unwrap();
        assert_eq!(c.message, "");

        assert!(Commit::parse_line("abc123 feat: short hash").is_none());
        assert!(Commit::parse_line(&format!("{} x", A.to_uppercase())).is_none());
    }

    #[test]
    fn latest_tagged_commit_picks_newest_match() {
        let pattern = TagPattern::compile("v", false).unwrap();
        let log = format!(
            "{A}\0HEAD -> main, tag: v2.0.0-rc.0\n{B}\0tag: v1.1.0, tag: v1.1.0+mirror\n{C}\0tag: v1.0.0"
        );
        let found = latest_tagged_commit(&log, &pattern).unwrap();
        assert_eq!(found.hash, B);
        assert_eq!(found.tags, vec!["v1.1.0", "v1.1.0+mirror"]);
    }

    #[test]
    fn latest_tagged_commit_sees_prereleases_in_prerelease_mode() {
        let pattern = TagPattern::compile("v", true).unwrap();
        let log = format!("{A}\0HEAD -> main, tag: v2.0.0-rc.0\n{B}\0tag: v1.1.0");
        let found = latest_tagged_commit(&log, &pattern).unwrap();
        assert_eq!(found.hash, A);
        assert_eq!(found.tags, vec!["v2.0.0-rc.0"]);
    }

    #[test]
    fn latest_tagged_commit_none_without_matches() {
        let pattern = TagPattern::compile("v", false).unwrap();
        let log = format!("{A}\0HEAD -> main\n{B}\0\n{C}\0tag: release-1");
        assert!(latest_tagged_commit(&log, &pattern).is_none());
        assert!(latest_tagged_commit("", &pattern).is_none());
    }

    #[test]
    fn parse_commits_keeps_order_and_filters() {
        let log = format!("{A} feat(api): one\n{B} fix(cli): two\nnot a commit\n{C} feat(api)!: three");
        let all = parse_commits(&log, None);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].hash, A);
        assert_eq!(all[2].message, "feat(api)!: three");

        let api = Regex::new(r"^[a-zA-Z]+\(api\):").unwrap();
        let filtered = parse_commits(&log, Some(&api));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].message, "feat(api): one");
    }

    #[test]
    fn parse_commits_empty_log() {
        assert!(parse_commits("", None).is_empty());
    }

    #[test]
    fn command_error_names_query_and_stderr() {
        let err = GitError::Command {
            command: "git log v1..HEAD".into(),
            stderr: "fatal: bad revision".into(),
        };
        assert_eq!(err.to_string(), "command failed: 'git log v1..HEAD'\nfatal: bad revision");
    }

    #[test]
    fn missing_binary_error_is_distinct() {
        let err = GitError::MissingBinary {
            binary: "git".into(),
        };
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn git_error_on_bad_revision() {
        let Ok(history) = GitHistory::new() else {
            return;
        };
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        // Not a repository: git exits 128
        let result = history.in_dir(&dir).is_linear("HEAD");
        assert!(matches!(result, Err(GitError::Command { .. })));
    }

    #[test]
    fn latest_tags_skips_undecorated_commits() {
        let Ok(history) = GitHistory::new() else {
            return;
        };
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let git = |args: &[&str]| {
            let output = Command::new(history.binary())
                .arg("-C")
                .arg(&dir)
                .args(["-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"])
                .args(args)
                .env("GIT_AUTHOR_NAME", "Test")
                .env("GIT_AUTHOR_EMAIL", "test@example.com")
                .env("GIT_COMMITTER_NAME", "Test")
                .env("GIT_COMMITTER_EMAIL", "test@example.com")
                .output()
                .unwrap();
            assert!(output.status.success(), "git {args:?} failed");
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        };
        git(&["init", "-q"]);
        git(&["commit", "-q", "--allow-empty", "-m", "chore: init"]);
        git(&["tag", "v1.0.0"]);
        let tagged = git(&["rev-parse", "HEAD"]);
        git(&["commit", "-q", "--allow-empty", "-m", "fix: a"]);
        git(&["tag", "docs-snapshot"]);
        git(&["commit", "-q", "--allow-empty", "-m", "fix: b"]);

        let pattern = TagPattern::compile("v", false).unwrap();
        let found = history.in_dir(&dir).latest_tags("HEAD", &pattern).unwrap().unwrap();
        assert_eq!(found.hash, tagged);
        assert_eq!(found.tags, ["v1.0.0"]);
    }
}

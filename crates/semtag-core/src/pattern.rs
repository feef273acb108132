//! Tag grammars and the tag pattern compiler.
//!
//! A version tag is `prefix + core [+ prerelease] + build`. Each piece has
//! its own grammar; the compiler validates the prefix, escapes it, and glues
//! the grammars together into three forms:
//!
//! - an **anchored** form that matches exactly one tag name,
//! - a **shell** form (grammar anchors stripped) suitable for POSIX ERE
//!   tools such as `grep -E`,
//! - an **annotation** form that finds matching tags inside a
//!   `git log --pretty=%D` decoration line (`HEAD -> main, tag: v1.2.0, tag: v1.2.0+ci`).

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Grammar sources, kept anchored so each one can validate a whole input.
pub mod grammar {
    /// Empty, a single letter, or alphanumeric-led and letter/`_`/`-`-ended.
    pub const PREFIX: &str = r"^(([a-zA-Z0-9][a-zA-Z0-9_-]*[a-zA-Z_-])|([a-zA-Z]))?$";
    /// `major.minor.patch` without leading zeros.
    pub const CORE: &str = r"^(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)$";
    /// Empty, or `-` followed by dot-separated prerelease identifiers.
    pub const PRERELEASE: &str = r"^(-((0|[1-9][0-9]*|[0-9]*[a-zA-Z-][0-9a-zA-Z-]*)(\.(0|[1-9][0-9]*|[0-9]*[a-zA-Z-][0-9a-zA-Z-]*))*))?$";
    /// Empty, or `+` followed by dot-separated build identifiers.
    pub const BUILD: &str = r"^(\+([0-9a-zA-Z-]+(\.[0-9a-zA-Z-]+)*))?$";

    /// Strip the `^` / `$` anchors so a grammar can be embedded in a larger pattern.
    pub fn unanchored(source: &str) -> String {
        source.replace(['^', '$'], "")
    }
}

static PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(grammar::PREFIX).expect("prefix grammar is valid"));
static PRERELEASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(grammar::PRERELEASE).expect("prerelease grammar is valid"));
static BUILD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(grammar::BUILD).expect("build grammar is valid"));

/// Which input a grammar violation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// The tag prefix.
    Prefix,
    /// The `-`-led prerelease suffix.
    Prerelease,
    /// The `+`-led build metadata suffix.
    Build,
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prefix => write!(f, "tag prefix"),
            Self::Prerelease => write!(f, "prerelease"),
            Self::Build => write!(f, "build"),
        }
    }
}

/// A configured value does not satisfy its grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} '{value}' does not match /{grammar}/")]
pub struct InputError {
    /// Which input was rejected.
    pub kind: InputKind,
    /// The rejected value.
    pub value: String,
    /// The grammar it was checked against.
    pub grammar: &'static str,
}

/// Check a value against the grammar for `kind`.
pub fn validate(kind: InputKind, value: &str) -> Result<(), InputError> {
    let (re, source) = match kind {
        InputKind::Prefix => (&*PREFIX_RE, grammar::PREFIX),
        InputKind::Prerelease => (&*PRERELEASE_RE, grammar::PRERELEASE),
        InputKind::Build => (&*BUILD_RE, grammar::BUILD),
    };
    if re.is_match(value) {
        Ok(())
    } else {
        Err(InputError {
            kind,
            value: value.to_string(),
            grammar: source,
        })
    }
}

/// Backslash-escape POSIX ERE metacharacters, leaving everything else literal.
fn escape_ere(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if r"\.[]()*+?{}|^$".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// A compiled tag-matching pattern.
#[derive(Debug, Clone)]
pub struct TagPattern {
    prefix: String,
    prerelease_mode: bool,
    shell: String,
    anchored: Regex,
    annotation: Regex,
}

impl TagPattern {
    /// Compile the pattern for `prefix`.
    ///
    /// The prerelease segment is only part of the pattern in prerelease
    /// mode, so a release-track run never sees prerelease tags.
    pub fn compile(prefix: &str, prerelease_mode: bool) -> Result<Self, InputError> {
        validate(InputKind::Prefix, prefix)?;

        let core = grammar::unanchored(grammar::CORE);
        let prerelease = if prerelease_mode {
            grammar::unanchored(grammar::PRERELEASE)
        } else {
            String::new()
        };
        let build = grammar::unanchored(grammar::BUILD);

        let shell = format!("{}{core}{prerelease}{build}", escape_ere(prefix));
        let anchored = Regex::new(&format!("^{shell}$")).expect("composed tag grammar is valid");
        let annotation = Regex::new(&format!("(^|, )tag: {shell}(,|$)"))
            .expect("composed annotation grammar is valid");

        debug!(%prefix, prerelease_mode, %shell, "compiled tag pattern");
        Ok(Self {
            prefix: prefix.to_string(),
            prerelease_mode,
            shell,
            anchored,
            annotation,
        })
    }

    /// The prefix this pattern was compiled for.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether prerelease tags are matched.
    pub const fn prerelease_mode(&self) -> bool {
        self.prerelease_mode
    }

    /// The unanchored, POSIX-ERE-compatible form.
    pub fn shell_pattern(&self) -> &str {
        &self.shell
    }

    /// The fully anchored form.
    pub fn anchored_pattern(&self) -> &str {
        self.anchored.as_str()
    }

    /// True when `tag` is exactly a tag this pattern describes.
    pub fn matches(&self, tag: &str) -> bool {
        self.anchored.is_match(tag)
    }

    /// True when a `%D` decoration line carries at least one matching tag.
    pub fn annotation_matches(&self, decoration: &str) -> bool {
        self.annotation.is_match(decoration)
    }

    /// Extract every matching tag from a `%D` decoration line, in order.
    pub fn tags_in(&self, decoration: &str) -> Vec<String> {
        decoration
            .split(',')
            .filter_map(|entry| entry.trim().strip_prefix("tag: "))
            .filter(|tag| self.matches(tag))
            .map(str::to_string)
            .collect()
    }
}

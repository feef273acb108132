//! Validated runner inputs.
//!
//! Runners hand over bare values (`semver-prerelease: beta`,
//! `semver-build: 42`). They are turned into tag suffixes (`-beta`, `+42`)
//! and checked against the tag grammars before any git query runs.

use serde::Serialize;
use tracing::debug;

use crate::pattern::{InputError, InputKind, validate};

/// Tag naming inputs for one resolution run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagInputs {
    /// Literal tag prefix (e.g. `v`).
    pub prefix: String,
    /// Prerelease suffix including the leading `-`, or empty.
    pub prerelease: String,
    /// Build suffix including the leading `+`, or empty.
    pub build: String,
    /// Conventional-commit scope restricting which commits are classified.
    pub scope: Option<String>,
}

impl TagInputs {
    /// Build and validate inputs from bare runner values.
    ///
    /// # Errors
    ///
    /// Returns the first [`InputError`] among prefix, prerelease and build.
    pub fn new(
        prefix: &str,
        prerelease: &str,
        build: &str,
        scope: Option<&str>,
    ) -> Result<Self, InputError> {
        let inputs = Self {
            prefix: prefix.to_string(),
            prerelease: with_leader('-', prerelease),
            build: with_leader('+', build),
            scope: scope
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        };
        inputs.validate()?;
        debug!(?inputs, "validated tag inputs");
        Ok(inputs)
    }

    /// Re-check every grammar. Used when fields were set directly.
    pub fn validate(&self) -> Result<(), InputError> {
        validate(InputKind::Prefix, &self.prefix)?;
        validate(InputKind::Prerelease, &self.prerelease)?;
        validate(InputKind::Build, &self.build)
    }

    /// Prerelease mode is on whenever a prerelease suffix is configured.
    pub fn prerelease_mode(&self) -> bool {
        !self.prerelease.is_empty()
    }

    /// The prerelease identifier handed to the incrementer (`beta` for `-beta`).
    pub fn prerelease_identifier(&self) -> &str {
        self.prerelease.strip_prefix('-').unwrap_or(&self.prerelease)
    }
}

fn with_leader(leader: char, value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!("{leader}{value}")
    }
}

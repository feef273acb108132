//! Core library for semtag.
//!
//! Computes the next semantic-version tag for a git repository from the
//! Conventional Commits made since the newest matching tag.
//!
//! # Modules
//!
//! - [`classify`] - Conventional Commits classification
//! - [`config`] - Configuration loading and management
//! - [`error`] - Error types and result aliases
//! - [`git`] - Read-only git history queries
//! - [`inputs`] - Validated tag naming inputs
//! - [`pattern`] - Tag grammars and the tag pattern compiler
//! - [`resolve`] - The next-version resolution engine
//! - [`version`] - Version ordering, incrementing and prerelease policy
//!
//! # Quick Start
//!
//! ```no_run
//! use semtag_core::classify::ConventionalClassifier;
//! use semtag_core::git::GitHistory;
//! use semtag_core::inputs::TagInputs;
//! use semtag_core::resolve::{ResolveRequest, Resolver};
//!
//! let history = GitHistory::new().expect("git is installed");
//! let resolver = Resolver::new(history, ConventionalClassifier::new());
//! let output = resolver
//!     .resolve(&ResolveRequest {
//!         reference: "HEAD".into(),
//!         inputs: TagInputs::new("v", "", "", None).expect("valid inputs"),
//!         check_linear: false,
//!     })
//!     .expect("resolution failed");
//!
//! println!("{} -> {}", output.previous_tag, output.tag);
//! ```
#![deny(unsafe_code)]

pub mod classify;

pub mod config;

pub mod error;

pub mod git;

pub mod inputs;

pub mod pattern;

pub mod resolve;

pub mod version;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult};

pub use resolve::{ResolutionOutput, ResolveError, ResolveRequest, Resolver};

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;

//! Library interface for the `semtag` CLI.
//!
//! This crate exposes the CLI's argument parser and command structure as a library,
//! primarily for testing. The actual entry point is in `main.rs`.
//!
//! # Structure
//!
//! - [`Cli`] - The root argument parser (clap derive)
//! - [`Commands`] - Available subcommands
//! - [`commands`] - Command implementations

pub mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// Color output preference.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect terminal capabilities automatically.
    #[default]
    Auto,
    /// Always emit colors.
    Always,
    /// Never emit colors.
    Never,
}

impl ColorChoice {
    /// Configure global color output based on this choice.
    ///
    /// Call this once at startup to set the color mode.
    pub fn apply(self) {
        match self {
            Self::Auto => {} // owo-colors auto-detects by default
            Self::Always => owo_colors::set_override(true),
            Self::Never => owo_colors::set_override(false),
        }
    }
}

const ENV_HELP: &str = "\
ENVIRONMENT VARIABLES:
    RUST_LOG                  Log filter (e.g., debug, semtag_core=trace)
    SEMTAG_LOG_PATH           Explicit JSONL log file path
    SEMTAG_LOG_DIR            JSONL log directory
    GITHUB_ACTIONS            Render warnings/errors as workflow annotations when 'true'
    GITHUB_SHA                Revision used when no --ref is given
    GITHUB_OUTPUT             File that outputs are appended to
    INPUT_REF                 Same as --ref
    INPUT_TAG-PREFIX          Same as --tag-prefix
    INPUT_SEMVER-PRERELEASE   Same as --semver-prerelease
    INPUT_SEMVER-BUILD        Same as --semver-build
    INPUT_SCOPE               Same as --scope
";
/// Command-line interface definition for semtag.
#[derive(Parser)]
#[command(name = "semtag")]
#[command(about = "Compute the next semantic version tag from conventional commits", long_about = None)]
#[command(version)]
#[command(after_long_help = ENV_HELP)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run as if started in DIR
    #[arg(short = 'C', long, global = true)]
    pub chdir: Option<PathBuf>,

    /// Only print errors (suppresses warnings/info)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// More detail (repeatable; e.g. -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Colorize output
    #[arg(long, global = true, value_enum, default_value_t)]
    pub color: ColorChoice,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available subcommands for the CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Compute the next tag from the commits since the latest version tag
    Next(commands::next::NextArgs),

    /// Show package and configuration information
    Info(commands::info::InfoArgs),
}

/// Returns the clap command, e.g. for `debug_assert` checks.
pub fn command() -> clap::Command {
    Cli::command()
}

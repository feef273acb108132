//! Info command: show package, configuration and tooling information.

use camino::Utf8PathBuf;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use semtag_core::config::{self, Config};
use semtag_core::git::GitHistory;

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct PackageInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    repository: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    license: &'static str,
}

impl PackageInfo {
    const fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            repository: env!("CARGO_PKG_REPOSITORY"),
            license: env!("CARGO_PKG_LICENSE"),
        }
    }
}

#[derive(Serialize)]
struct ConfigInfo {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    config_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_config_dir: Option<String>,
    log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
    tag_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    prerelease: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    check_linear_history: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    release_rules: Vec<String>,
}

impl ConfigInfo {
    fn from_config(config: &Config, sources: &[Utf8PathBuf]) -> Self {
        let tag = config.tag.clone().unwrap_or_default();
        Self {
            config_files: sources.iter().map(ToString::to_string).collect(),
            user_config_dir: config::user_config_dir().map(|p| p.to_string()),
            log_level: config.log_level.as_str().to_string(),
            log_dir: config.log_dir.as_ref().map(|p| p.to_string()),
            tag_prefix: tag.prefix.unwrap_or_default(),
            prerelease: tag.prerelease,
            build: tag.build,
            scope: tag.scope,
            check_linear_history: config.check_linear_history.unwrap_or(false),
            release_rules: config
                .release_rules
                .iter()
                .flatten()
                .map(|(kind, level)| format!("{kind}={level}"))
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct FullInfo {
    #[serde(flatten)]
    package: PackageInfo,
    config: ConfigInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    git: Option<String>,
}

/// Print package information.
///
/// # Arguments
/// * `global_json` - Global `--json` flag from CLI
/// * `config` - Loaded configuration
/// * `sources` - Config files merged into `config`, lowest precedence first
#[instrument(name = "cmd_info", skip_all, fields(json_output))]
pub fn cmd_info(
    _args: InfoArgs,
    global_json: bool,
    config: &Config,
    sources: &[Utf8PathBuf],
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing info command");

    let full_info = FullInfo {
        package: PackageInfo::new(),
        config: ConfigInfo::from_config(config, sources),
        git: GitHistory::new()
            .ok()
            .map(|git| git.binary().display().to_string()),
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&full_info)?);
        return Ok(());
    }

    println!(
        "{} {}",
        full_info.package.name.bold(),
        full_info.package.version.green()
    );
    if !full_info.package.description.is_empty() {
        println!("{}", full_info.package.description);
    }
    if !full_info.package.license.is_empty() {
        println!("{}: {}", "License".dimmed(), full_info.package.license);
    }
    if !full_info.package.repository.is_empty() {
        println!(
            "{}: {}",
            "Repository".dimmed(),
            full_info.package.repository.cyan()
        );
    }

    let cfg = &full_info.config;
    println!();
    println!("{}", "Configuration".bold().underline());
    if cfg.config_files.is_empty() {
        println!("{}: {}", "Config file".dimmed(), "none loaded".yellow());
    }
    for path in &cfg.config_files {
        println!("{}: {}", "Config file".dimmed(), path.cyan());
    }
    println!("{}: {}", "Log level".dimmed(), cfg.log_level);
    if let Some(ref dir) = cfg.log_dir {
        println!("{}: {}", "Log directory".dimmed(), dir);
    }
    println!("{}: {:?}", "Tag prefix".dimmed(), cfg.tag_prefix);
    if let Some(ref pre) = cfg.prerelease {
        println!("{}: {}", "Prerelease".dimmed(), pre.cyan());
    }
    if let Some(ref build) = cfg.build {
        println!("{}: {}", "Build".dimmed(), build.cyan());
    }
    if let Some(ref scope) = cfg.scope {
        println!("{}: {}", "Scope".dimmed(), scope.cyan());
    }
    if !cfg.release_rules.is_empty() {
        println!("{}: {}", "Release rules".dimmed(), cfg.release_rules.join(", "));
    }

    println!();
    println!("{}", "Tooling".bold().underline());
    match full_info.git {
        Some(ref path) => println!("  {} git {}", "✓".green(), path.dimmed()),
        None => println!("  {} {}", "✗".red(), "git not found on PATH".yellow()),
    }

    Ok(())
}

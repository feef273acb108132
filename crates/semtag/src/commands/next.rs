//! Next command: thin CLI layer over `semtag_core::resolve`.
//!
//! Settings come from flags (or the matching GitHub Actions `INPUT_*`
//! variables), then the `[tag]` config section. Empty values count as unset,
//! since runners export every declared input even when it was left blank.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::{debug, instrument};

use semtag_core::classify::ConventionalClassifier;
use semtag_core::config::{Config, TagConfig};
use semtag_core::git::GitHistory;
use semtag_core::inputs::TagInputs;
use semtag_core::resolve::{ResolutionOutput, ResolveRequest, Resolver};

const ENV_GITHUB_SHA: &str = "GITHUB_SHA";
const DEFAULT_REF: &str = "HEAD";

/// Arguments for the `next` subcommand.
#[derive(Args, Debug, Default)]
pub struct NextArgs {
    /// Revision to resolve from [default: $GITHUB_SHA, then HEAD]
    #[arg(long = "ref", env = "INPUT_REF", value_name = "REV")]
    pub reference: Option<String>,

    /// Literal tag prefix (e.g. "v")
    #[arg(long, env = "INPUT_TAG-PREFIX", value_name = "PREFIX")]
    pub tag_prefix: Option<String>,

    /// Prerelease identifier (e.g. "beta"); enables prerelease mode
    #[arg(long, env = "INPUT_SEMVER-PRERELEASE", value_name = "ID")]
    pub semver_prerelease: Option<String>,

    /// Build metadata appended to the new tag (e.g. "ci.42")
    #[arg(long, env = "INPUT_SEMVER-BUILD", value_name = "BUILD")]
    pub semver_build: Option<String>,

    /// Only classify commits with this conventional-commit scope
    #[arg(long, env = "INPUT_SCOPE", value_name = "SCOPE")]
    pub scope: Option<String>,

    /// Also report whether the history is free of merge commits
    #[arg(long)]
    pub check_linear: bool,

    /// Append `name=value` outputs to FILE
    #[arg(long, env = "GITHUB_OUTPUT", value_name = "FILE")]
    pub output_file: Option<PathBuf>,
}

/// Execute the next command.
#[instrument(name = "cmd_next", skip_all, fields(json_output))]
pub fn cmd_next(
    args: NextArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing next command");

    let reference = resolve_reference(
        args.reference.clone(),
        std::env::var(ENV_GITHUB_SHA).ok(),
    );
    let inputs = merge_inputs(&args, config.tag.as_ref()).context("invalid tag inputs")?;
    let request = ResolveRequest {
        reference,
        inputs,
        check_linear: args.check_linear || config.check_linear_history.unwrap_or(false),
    };

    let history = GitHistory::new()?.in_dir(cwd);
    let classifier = ConventionalClassifier::new()
        .with_rules(config.release_rules.clone().unwrap_or_default());
    let output = Resolver::new(history, classifier)
        .resolve(&request)
        .context("failed to resolve the next tag")?;

    let pairs = output_pairs(&output);
    if let Some(ref path) = args.output_file.filter(|p| !p.as_os_str().is_empty()) {
        append_outputs(path, &pairs)
            .with_context(|| format!("failed to write outputs to {}", path.display()))?;
        debug!(path = %path.display(), "outputs appended");
    }

    if global_json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for (name, value) in &pairs {
            println!("{name}={value}");
        }
    }

    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// The revision to resolve: explicit ref, then `GITHUB_SHA`, then `HEAD`.
fn resolve_reference(explicit: Option<String>, github_sha: Option<String>) -> String {
    non_empty(explicit)
        .or_else(|| non_empty(github_sha))
        .unwrap_or_else(|| DEFAULT_REF.to_string())
}

/// Flags win over the `[tag]` config section.
fn merge_inputs(
    args: &NextArgs,
    tag: Option<&TagConfig>,
) -> Result<TagInputs, semtag_core::pattern::InputError> {
    let pick = |flag: &Option<String>, configured: Option<&Option<String>>| {
        non_empty(flag.clone())
            .or_else(|| non_empty(configured.cloned().flatten()))
            .unwrap_or_default()
    };
    let prefix = pick(&args.tag_prefix, tag.map(|t| &t.prefix));
    let prerelease = pick(&args.semver_prerelease, tag.map(|t| &t.prerelease));
    let build = pick(&args.semver_build, tag.map(|t| &t.build));
    let scope = pick(&args.scope, tag.map(|t| &t.scope));

    TagInputs::new(&prefix, &prerelease, &build, Some(scope.as_str()))
}

/// Output names and values, in emission order.
fn output_pairs(output: &ResolutionOutput) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
        ("previous-tag", output.previous_tag.clone()),
        ("tag", output.tag.clone()),
        ("semver", output.semver.clone()),
    ];
    if let Some(linear) = output.linear_history {
        pairs.push(("linear-history", linear.to_string()));
    }
    pairs
}

fn append_outputs(path: &Path, pairs: &[(&str, String)]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for (name, value) in pairs {
        writeln!(file, "{name}={value}")?;
    }
    Ok(())
}

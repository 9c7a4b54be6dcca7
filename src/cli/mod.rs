//! Command line interface for release_cutter.
//!
//! Loads the configuration, layers the command line flags and environment
//! over it, runs the release pipeline in the current directory and prints a
//! summary.

mod args;
mod output;

pub use args::Args;
pub use output::OutputManager;

use crate::config::ReleaseOptions;
use crate::error::{CliError, Result};
use crate::pipeline::{Orchestrator, ReleaseOutcome};
use crate::prompt::StdinPrompter;
use std::path::Path;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    let cwd = std::env::current_dir()?;
    execute(args, &cwd).await
}

/// Run a release for `args` in `dir`
pub async fn execute(args: Args, dir: &Path) -> Result<i32> {
    args.validate()?;

    let mut options = ReleaseOptions::load(args.config.as_deref(), dir)?;
    args.apply(&mut options)?;
    options.apply_env();
    options.validate()?;

    which::which("git").map_err(|e| CliError::ExecutionFailed {
        command: "git".to_string(),
        reason: format!("git executable not found: {}", e),
    })?;

    let output = OutputManager::new(options.verbose, args.quiet);
    if options.dry_run {
        output.warn("Dry run: mutating commands are printed, not executed");
    }

    let prompter = StdinPrompter::new(output.clone());
    let mut orchestrator = Orchestrator::from_options(options, dir, prompter, output.clone())?;
    let outcome = orchestrator.run().await?;
    print_summary(&output, &outcome);
    Ok(0)
}

fn print_summary(output: &OutputManager, outcome: &ReleaseOutcome) {
    output.section("Release summary");
    output.success(&format!(
        "{} {} → {}",
        outcome.name, outcome.latest_version, outcome.version
    ));
    if let Some(tag) = &outcome.tag_name {
        output.indent(&format!("Tag: {}", tag));
    }
    if let Some(url) = &outcome.release_url {
        output.indent(&format!("Release: {}", url));
    }
    if let Some(url) = &outcome.package_url {
        output.indent(&format!("Package: {}", url));
    }
    if !outcome.changelog.is_empty() {
        output.println("");
        output.println("Changelog:");
        for line in outcome.changelog.lines() {
            output.indent(line);
        }
    }
}

//! Command line argument parsing.
//!
//! Flags layer on top of the configuration file; see
//! [`Args::apply`].

use crate::config::{PreReleaseSetting, ReleaseOptions, VersionSource};
use crate::error::{CliError, Result};
use clap::Parser;
use std::path::PathBuf;

/// Cut a release of the package in the current repository
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "release_cutter",
    version,
    about = "Cut a release: bump, changelog, commit, tag, push, publish",
    long_about = "Resolve the next version, bump the package manifests, generate the changelog,
then commit, tag and push the release and optionally create a GitHub release and
publish the package.

Usage:
  release_cutter patch
  release_cutter minor --ci
  release_cutter --pre-release=beta
  release_cutter 2.0.0 --dry-run"
)]
pub struct Args {
    /// Increment (major, minor, patch, premajor, preminor, prepatch, prerelease) or a version
    #[arg(index = 1, value_name = "INCREMENT")]
    pub increment: Option<String>,

    /// Show the commands that would run without changing anything
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Echo commands and their output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors and the summary
    #[arg(short, long)]
    pub quiet: bool,

    /// Run without prompts
    #[arg(long)]
    pub ci: bool,

    /// Configuration file (default: .release.toml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Release a pre-release, optionally on a channel (`--pre-release=beta`)
    #[arg(long, value_name = "ID", num_args = 0..=1, default_missing_value = "")]
    pub pre_release: Option<String>,

    /// Pre-release identifier (alpha, beta, rc)
    #[arg(long, value_name = "ID")]
    pub pre_release_id: Option<String>,

    /// Source of the latest version: git.tag, pkg.version or a version
    #[arg(long = "use", value_name = "SOURCE")]
    pub use_source: Option<String>,

    /// Derive the increment from conventional commits
    #[arg(long)]
    pub recommend: bool,

    /// Accept a version that is not greater than the latest one
    #[arg(long)]
    pub disable_version_check: bool,

    /// Skip the commit
    #[arg(long)]
    pub no_commit: bool,

    /// Skip the tag
    #[arg(long)]
    pub no_tag: bool,

    /// Skip the push
    #[arg(long)]
    pub no_push: bool,

    /// Create a GitHub release
    #[arg(long)]
    pub github_release: bool,

    /// Publish to the package registry
    #[arg(long)]
    pub publish: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Check flag combinations clap cannot express
    pub fn validate(&self) -> Result<()> {
        if self.increment.as_deref().is_some_and(|i| i.trim().is_empty()) {
            return Err(CliError::InvalidArguments {
                reason: "increment must not be empty".to_string(),
            }
            .into());
        }
        if let Some(source) = &self.use_source {
            source.parse::<VersionSource>().map_err(|e| CliError::InvalidArguments {
                reason: format!("--use: {}", e),
            })?;
        }
        Ok(())
    }

    /// Layer the flags over the loaded options
    pub fn apply(&self, options: &mut ReleaseOptions) -> Result<()> {
        if let Some(increment) = &self.increment {
            options.increment = Some(increment.trim().to_string());
        }
        match self.pre_release.as_deref() {
            Some("") => options.pre_release = Some(PreReleaseSetting::Enabled(true)),
            Some(id) => options.pre_release = Some(PreReleaseSetting::Channel(id.to_string())),
            None => {}
        }
        if let Some(id) = &self.pre_release_id {
            options.pre_release_id = Some(id.clone());
        }
        if let Some(source) = &self.use_source {
            options.use_source = Some(source.parse().map_err(|e| CliError::InvalidArguments {
                reason: format!("--use: {}", e),
            })?);
        }

        options.dry_run |= self.dry_run;
        options.verbose |= self.verbose;
        options.ci |= self.ci;
        options.recommend |= self.recommend;
        options.disable_version_check |= self.disable_version_check;
        options.github.release |= self.github_release;
        options.registry.publish |= self.publish;
        if self.no_commit {
            options.git.commit = false;
        }
        if self.no_tag {
            options.git.tag = false;
        }
        if self.no_push {
            options.git.push = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("release_cutter").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_increment_and_flags() {
        let args = parse(&["minor", "--ci", "-d", "--no-push"]);
        let mut options = ReleaseOptions::default();
        args.apply(&mut options).unwrap();
        assert_eq!(options.increment.as_deref(), Some("minor"));
        assert!(options.ci);
        assert!(options.dry_run);
        assert!(!options.git.push);
        assert!(options.git.commit);
    }

    #[test]
    fn test_pre_release_forms() {
        let mut options = ReleaseOptions::default();
        parse(&["--pre-release"]).apply(&mut options).unwrap();
        assert_eq!(options.pre_release, Some(PreReleaseSetting::Enabled(true)));

        let mut options = ReleaseOptions::default();
        parse(&["--pre-release=beta"]).apply(&mut options).unwrap();
        assert_eq!(options.pre_release, Some(PreReleaseSetting::Channel("beta".to_string())));
        assert_eq!(options.pre_release_channel().as_deref(), Some("beta"));
    }

    #[test]
    fn test_use_source() {
        let args = parse(&["--use", "git.tag"]);
        args.validate().unwrap();
        let mut options = ReleaseOptions::default();
        args.apply(&mut options).unwrap();
        assert_eq!(options.use_source, Some(VersionSource::GitTag));
    }

    #[test]
    fn test_invalid_use_source() {
        assert!(parse(&["--use", "nonsense source"]).validate().is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        let result = Args::try_parse_from(["release_cutter", "--verbose", "--quiet"]);
        assert!(result.is_err());
    }
}

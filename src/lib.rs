//! # release_cutter
//!
//! Release automation for a single package repository.
//!
//! One run resolves the next semantic version, bumps the package manifests,
//! generates a changelog from the commit history, then commits, tags and
//! pushes the release. It can also create a GitHub release, publish to a
//! package registry and mirror the release into a distribution repository.
//!
//! ## Usage
//!
//! ```bash
//! release_cutter patch              # 1.2.3 -> 1.2.4
//! release_cutter minor --dry-run    # show what would happen
//! release_cutter --pre-release=beta # 1.2.3 -> 1.2.4-beta.0
//! release_cutter --ci --recommend   # increment from conventional commits
//! ```

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod changelog;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod git;
pub mod github;
pub mod pipeline;
pub mod prompt;
pub mod publish;
pub mod shell;
pub mod version;

// Re-export main types for public API
pub use cli::{Args, OutputManager};
pub use config::ReleaseOptions;
pub use context::ReleaseContext;
pub use error::{CliError, ReleaseError, Result};
pub use git::{DistRepositoryClient, RepositoryClient, RepositoryState};
pub use pipeline::{Collaborators, Orchestrator, PipelineRun, PipelineStage, ReleaseOutcome};
pub use prompt::{Prompter, ScriptedPrompter, StdinPrompter};
pub use shell::Shell;
pub use version::{Increment, VersionComputer, VersionResolver};

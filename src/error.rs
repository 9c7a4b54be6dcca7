//! Error types for release_cutter operations.
//!
//! Fatal errors (`ConfigError`, `GitError`, `VersionError`) abort the current
//! pass. `BumpError` and `StageError` describe failures confined to a single
//! file; callers log them and keep going.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for release_cutter operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all release_cutter operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Version resolution errors
    #[error("Version error: {0}")]
    Version(#[from] VersionError),

    /// Git operation errors
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    /// Manifest bump errors
    #[error("Bump error: {0}")]
    Bump(#[from] BumpError),

    /// Stage/reset errors
    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    /// Registry publishing errors
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// Remote release hosting errors
    #[error("GitHub error: {0}")]
    Hosting(#[from] HostingError),

    /// CLI and command execution errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// Interactive run cancelled by the user
    #[error("Release aborted by user")]
    Aborted,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration errors. Always raised before any mutation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An option holds a value the pipeline cannot use
    #[error("Invalid option '{option}': {reason}")]
    InvalidOption {
        /// Option path (e.g. `git.pushRepo`)
        option: String,
        /// Reason for the error
        reason: String,
    },

    /// A required option is missing
    #[error("Missing required option '{option}'")]
    MissingOption {
        /// Option path
        option: String,
    },

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration file {path}: {reason}")]
    ParseFailed {
        /// Path to the configuration file
        path: PathBuf,
        /// Parser message
        reason: String,
    },
}

/// Version resolution errors
#[derive(Error, Debug)]
pub enum VersionError {
    /// No usable version at the time mutations are about to run
    #[error("Invalid version '{version}': {reason}")]
    Invalid {
        /// Version string (empty when undecided)
        version: String,
        /// Reason for the error
        reason: String,
    },

    /// Version parsing failed
    #[error("Failed to parse version '{version}': {source}")]
    ParseFailed {
        /// Version string
        version: String,
        /// Parsing error
        #[source]
        source: semver::Error,
    },

    /// Increment token is neither a known increment nor a version
    #[error("Unknown increment '{increment}'")]
    UnknownIncrement {
        /// Raw increment value
        increment: String,
    },
}

/// Git operation errors
#[derive(Error, Debug)]
pub enum GitError {
    /// Not a git repository
    #[error("Not a git repository. Please initialize git first.")]
    NotRepository,

    /// Not at the root of the repository
    #[error("Not at the root directory of the repository ({path}).")]
    NotRootDir {
        /// Working directory that was checked
        path: PathBuf,
    },

    /// Working directory not clean
    #[error("Working dir must be clean. Please stage and commit your changes.")]
    DirtyWorkingDirectory,

    /// Current branch has no upstream
    #[error("No upstream configured for current branch.")]
    NoUpstream,

    /// Current branch is not the required one
    #[error("Must be on branch {required} (currently on {current})")]
    WrongBranch {
        /// Required branch
        required: String,
        /// Current branch (`HEAD` when detached)
        current: String,
    },

    /// No permission to push to the remote
    #[error("No permission to push to {remote}: {reason}")]
    NoPermission {
        /// Push target
        remote: String,
        /// Reason for the error
        reason: String,
    },

    /// Commit failed
    #[error("Git commit failed: {reason}")]
    CommitFailed {
        /// Reason for the error
        reason: String,
    },

    /// Tag creation failed or tag already exists
    #[error("Git tag '{tag}' failed: {reason}")]
    TagFailed {
        /// Tag name
        tag: String,
        /// Reason for the error
        reason: String,
    },

    /// Push failed
    #[error("Git push failed: {reason}")]
    PushFailed {
        /// Reason for the error
        reason: String,
    },

    /// Clone failed
    #[error("Unable to clone {repo}: {reason}")]
    CloneFailed {
        /// Repository URL
        repo: String,
        /// Reason for the error
        reason: String,
    },

    /// Changelog command failed
    #[error("Could not create changelog: {reason}")]
    ChangelogFailed {
        /// Reason for the error
        reason: String,
    },

    /// Any other git command failed
    #[error("Git command failed: {command} - {reason}")]
    CommandFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl GitError {
    /// Short machine-readable kind of this error
    pub fn kind(&self) -> &'static str {
        match self {
            GitError::NotRepository | GitError::NotRootDir { .. } => "not-a-repo",
            GitError::DirtyWorkingDirectory => "dirty-working-dir",
            GitError::NoUpstream => "no-upstream",
            GitError::WrongBranch { .. } => "wrong-branch",
            GitError::NoPermission { .. } => "no-permission",
            GitError::CommitFailed { .. } => "commit-failed",
            GitError::TagFailed { .. } => "tag-failed",
            GitError::PushFailed { .. } => "push-failed",
            GitError::CloneFailed { .. } => "clone-failed",
            GitError::ChangelogFailed { .. } => "changelog-failed",
            GitError::CommandFailed { .. } => "command-failed",
        }
    }
}

/// Manifest bump errors, recovered locally
#[derive(Error, Debug)]
pub enum BumpError {
    /// Manifest does not exist
    #[error("could not bump `{}`: file not found", path.display())]
    Missing {
        /// Manifest path
        path: PathBuf,
    },

    /// Manifest is not a recognized document
    #[error("could not bump `{}`: {reason}", path.display())]
    Unparseable {
        /// Manifest path
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Manifest has no version field to rewrite
    #[error("could not bump `{}`: no version field", path.display())]
    NoVersionField {
        /// Manifest path
        path: PathBuf,
    },
}

/// Stage/reset errors, recovered locally
#[derive(Error, Debug)]
pub enum StageError {
    /// `git add` failed for the given paths
    #[error("could not stage `{files}`")]
    Stage {
        /// Space separated paths
        files: String,
    },

    /// `git checkout` failed for the given paths
    #[error("could not reset `{files}`")]
    Reset {
        /// Space separated paths
        files: String,
    },
}

/// Registry publishing errors
#[derive(Error, Debug)]
pub enum PublishError {
    /// Publish command failed
    #[error("Publish failed for '{package}': {reason}")]
    PublishFailed {
        /// Package name
        package: String,
        /// Reason for the error
        reason: String,
    },

    /// Registry asked for a one-time password that was not provided
    #[error("Registry requires a one-time password for '{package}'")]
    OtpRequired {
        /// Package name
        package: String,
    },
}

/// Remote release hosting errors
#[derive(Error, Debug)]
pub enum HostingError {
    /// No token available
    #[error("GitHub token not provided. Set the {token_ref} environment variable.")]
    MissingToken {
        /// Environment variable consulted
        token_ref: String,
    },

    /// Remote URL does not point at a recognizable repository
    #[error("Could not determine owner/repository from remote '{remote}'")]
    UnknownRepository {
        /// Remote URL
        remote: String,
    },

    /// API call failed
    #[error("{operation} failed: {reason}")]
    Request {
        /// API operation
        operation: String,
        /// Reason for the error
        reason: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl ReleaseError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Git(GitError::DirtyWorkingDirectory) => vec![
                "Commit pending changes: git add . && git commit -m 'message'".to_string(),
                "Stash changes temporarily: git stash".to_string(),
                "Disable the check: set git.requireCleanWorkingDir = false".to_string(),
            ],
            ReleaseError::Git(GitError::NoUpstream) => vec![
                "Set an upstream: git push -u origin <branch>".to_string(),
                "Disable the check: set git.requireUpstream = false".to_string(),
            ],
            ReleaseError::Git(GitError::PushFailed { .. })
            | ReleaseError::Git(GitError::NoPermission { .. }) => vec![
                "Verify git remote URL: git remote -v".to_string(),
                "Check SSH key configuration: ssh -T git@github.com".to_string(),
            ],
            ReleaseError::Git(GitError::TagFailed { tag, .. }) => vec![
                format!("Delete the existing tag: git tag -d {}", tag),
                "Release a different version".to_string(),
            ],
            ReleaseError::Version(_) => vec![
                "Pass an increment: release_cutter patch|minor|major|<version>".to_string(),
                "Run interactively to choose the next version".to_string(),
            ],
            ReleaseError::Hosting(HostingError::MissingToken { token_ref }) => vec![
                format!("Export a token: export {}=<token>", token_ref),
                "Disable GitHub releases: set github.release = false".to_string(),
            ],
            ReleaseError::Publish(PublishError::OtpRequired { .. }) => vec![
                "Run interactively to be asked for the one-time password".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ReleaseError::Bump(_) | ReleaseError::Stage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_error_kinds() {
        assert_eq!(GitError::NotRepository.kind(), "not-a-repo");
        assert_eq!(GitError::DirtyWorkingDirectory.kind(), "dirty-working-dir");
        assert_eq!(
            GitError::PushFailed {
                reason: "x".to_string()
            }
            .kind(),
            "push-failed"
        );
        assert_eq!(
            GitError::ChangelogFailed {
                reason: "x".to_string()
            }
            .kind(),
            "changelog-failed"
        );
    }

    #[test]
    fn test_local_errors_are_recoverable() {
        let bump: ReleaseError = BumpError::Missing {
            path: PathBuf::from("package.json"),
        }
        .into();
        assert!(bump.is_recoverable());
        assert_eq!(
            bump.to_string(),
            "Bump error: could not bump `package.json`: file not found"
        );

        let git: ReleaseError = GitError::NotRepository.into();
        assert!(!git.is_recoverable());
    }

    #[test]
    fn test_changelog_failure_message() {
        let err = GitError::ChangelogFailed {
            reason: "bad format".to_string(),
        };
        assert!(err.to_string().starts_with("Could not create changelog"));
    }
}

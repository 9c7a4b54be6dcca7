//! Repository client backed by the system `git` binary.

use super::{REV_RANGE, RepositoryState, is_url};
use crate::cli::OutputManager;
use crate::config::GitOptions;
use crate::context::ReleaseContext;
use crate::error::{GitError, ReleaseError, Result, StageError};
use crate::shell::{Cmd, ExecOptions, Shell};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

/// Version-control operations on one working directory.
///
/// Queries always hit `git` and are never memoized; [`init`](Self::init)
/// keeps a snapshot for values the pipeline reuses (branch, latest tag,
/// remote URL, root-dir flag).
#[derive(Debug)]
pub struct RepositoryClient {
    shell: Shell,
    options: GitOptions,
    state: RepositoryState,
}

impl RepositoryClient {
    /// Client for the repository in `dir`
    pub fn new(dir: impl Into<PathBuf>, options: GitOptions, dry_run: bool, output: OutputManager) -> Self {
        Self {
            shell: Shell::new(dir, dry_run, output),
            options,
            state: RepositoryState::default(),
        }
    }

    /// Command runner bound to this repository's directory
    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    /// Repository options in effect
    pub fn options(&self) -> &GitOptions {
        &self.options
    }

    pub(super) fn options_mut(&mut self) -> &mut GitOptions {
        &mut self.options
    }

    /// Snapshot taken by [`init`](Self::init)
    pub fn state(&self) -> &RepositoryState {
        &self.state
    }

    pub(super) fn state_mut(&mut self) -> &mut RepositoryState {
        &mut self.state
    }

    /// Working directory of this client
    pub fn dir(&self) -> PathBuf {
        self.shell.cwd()
    }

    async fn git<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = std::iter::once("git".to_string()).chain(args.into_iter().map(Into::into));
        Ok(self.shell.exec_argv(args, ExecOptions::READ).await?.unwrap_or_default())
    }

    async fn git_write<I, S>(&self, args: I) -> Result<Option<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = std::iter::once("git".to_string()).chain(args.into_iter().map(Into::into));
        self.shell.exec_argv(args, ExecOptions::WRITE).await
    }

    // ---- state queries ----

    /// Whether the directory is inside a git work tree
    pub async fn is_git_repo(&self) -> bool {
        self.git(["rev-parse", "--git-dir"]).await.is_ok()
    }

    /// Whether the directory is the top level of the work tree
    pub async fn is_in_repo_root_dir(&self) -> bool {
        let Ok(top) = self.git(["rev-parse", "--show-toplevel"]).await else {
            return false;
        };
        match (std::fs::canonicalize(&top), std::fs::canonicalize(self.dir())) {
            (Ok(top), Ok(cwd)) => top == cwd,
            _ => false,
        }
    }

    /// Current branch name; `None` when unborn or detached
    pub async fn get_branch_name(&self) -> Option<String> {
        match self.git(["rev-parse", "--abbrev-ref", "HEAD"]).await {
            Ok(branch) if !branch.is_empty() && branch != "HEAD" => Some(branch),
            _ => None,
        }
    }

    /// Whether the current branch tracks a remote branch
    pub async fn has_upstream_branch(&self) -> bool {
        let Some(branch) = self.get_branch_name().await else {
            return false;
        };
        self.git([
            "for-each-ref".to_string(),
            "--format=%(upstream:short)".to_string(),
            format!("refs/heads/{}", branch),
        ])
        .await
        .is_ok_and(|upstream| !upstream.is_empty())
    }

    /// Exact-match tag existence
    pub async fn tag_exists(&self, name: &str) -> bool {
        self.git([
            "show-ref".to_string(),
            "--tags".to_string(),
            "--verify".to_string(),
            "--quiet".to_string(),
            format!("refs/tags/{}", name),
        ])
        .await
        .is_ok()
    }

    /// No staged or unstaged changes to tracked files
    pub async fn is_working_dir_clean(&self) -> bool {
        self.git(["status", "--porcelain", "--untracked-files=no"])
            .await
            .is_ok_and(|status| status.is_empty())
    }

    /// Most recent tag reachable from HEAD
    pub async fn get_latest_tag(&self) -> Option<String> {
        let mut args = vec!["describe".to_string(), "--tags".to_string(), "--abbrev=0".to_string()];
        if let Some(pattern) = &self.options.tag_match {
            args.push(format!("--match={}", pattern));
        }
        self.git(args).await.ok().filter(|tag| !tag.is_empty())
    }

    /// URL of a named remote (default: the push target).
    ///
    /// A push target that is already a URL is returned as-is without a
    /// remote lookup.
    pub async fn get_remote_url(&self, remote: Option<&str>) -> Option<String> {
        let remote = remote.unwrap_or(&self.options.push_repo);
        if is_url(remote) {
            return Some(remote.to_string());
        }
        self.git(["remote", "get-url", remote])
            .await
            .ok()
            .filter(|url| !url.is_empty())
    }

    /// Changed tracked paths, one `<XY> <path>` line each
    pub async fn status(&self) -> Result<String> {
        self.git(["status", "--short", "--untracked-files=no"]).await
    }

    /// Same remote URL and same working directory
    pub async fn is_same_repo(&self, other: &RepositoryClient) -> bool {
        let (ours, theirs) = (self.get_remote_url(None).await, other.get_remote_url(None).await);
        ours == theirs && normalized(&self.dir()) == normalized(&other.dir())
    }

    /// Commits reachable from HEAD since `since` (all commits when `None`)
    pub async fn count_commits_since(&self, since: Option<&str>) -> Result<usize> {
        let range = match since {
            Some(tag) => format!("{}..HEAD", tag),
            None => "HEAD".to_string(),
        };
        let count = self.git(["rev-list", "--count", range.as_str()]).await?;
        count.parse().map_err(|_| {
            GitError::CommandFailed {
                command: format!("git rev-list --count {}", range),
                reason: format!("unexpected output '{}'", count),
            }
            .into()
        })
    }

    /// Full commit messages since `since` (all history when `None`), newest first
    pub async fn commit_messages_since(&self, since: Option<&str>) -> Result<Vec<String>> {
        let mut args = vec!["log".to_string(), "--format=%B%x1e".to_string()];
        if let Some(tag) = since {
            args.push(format!("{}..HEAD", tag));
        }
        let log = self.git(args).await?;
        Ok(log
            .split('\u{1e}')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from)
            .collect())
    }

    /// Query every state field
    pub async fn query_state(&self) -> RepositoryState {
        RepositoryState {
            current_branch: self.get_branch_name().await,
            latest_tag: self.get_latest_tag().await,
            remote_url: self.get_remote_url(None).await,
            has_upstream_branch: self.has_upstream_branch().await,
            is_working_dir_clean: self.is_working_dir_clean().await,
            is_git_repo: self.is_git_repo().await,
            is_root_dir: self.is_in_repo_root_dir().await,
        }
    }

    // ---- mutating operations ----

    /// Snapshot the repository state for later stages
    pub async fn init(&mut self) -> &RepositoryState {
        self.state = self.query_state().await;
        log::debug!("repository state for {}: {:?}", self.dir().display(), self.state);
        &self.state
    }

    /// Check the configured preconditions.
    ///
    /// Order: repository, root dir, clean working dir, branch, upstream,
    /// commits since the latest tag, push permission.
    pub async fn validate(&self) -> Result<()> {
        if !self.is_git_repo().await {
            return Err(GitError::NotRepository.into());
        }

        if self.options.require_root_dir && !self.is_in_repo_root_dir().await {
            return Err(GitError::NotRootDir { path: self.dir() }.into());
        }

        if self.options.require_clean_working_dir && !self.is_working_dir_clean().await {
            return Err(GitError::DirtyWorkingDirectory.into());
        }

        if let Some(required) = &self.options.require_branch {
            let current = self.get_branch_name().await;
            if current.as_deref() != Some(required.as_str()) {
                return Err(GitError::WrongBranch {
                    required: required.clone(),
                    current: current.unwrap_or_else(|| "HEAD".to_string()),
                }
                .into());
            }
        }

        if self.options.require_upstream
            && !is_url(&self.options.push_repo)
            && !self.has_upstream_branch().await
        {
            return Err(GitError::NoUpstream.into());
        }

        if self.options.require_commits {
            let latest = self.get_latest_tag().await;
            if self.count_commits_since(latest.as_deref()).await.unwrap_or(0) == 0 {
                return Err(GitError::CommandFailed {
                    command: "git rev-list".to_string(),
                    reason: "There are no commits since the latest tag.".to_string(),
                }
                .into());
            }
        }

        if self.options.require_push_permission {
            let target = self.options.push_repo.clone();
            self.git(["push", "--dry-run", "--no-verify", target.as_str()])
                .await
                .map_err(|e| GitError::NoPermission {
                    remote: target.clone(),
                    reason: failure_reason(&e),
                })?;
        }

        Ok(())
    }

    /// Add paths to the index; failures are logged, not raised
    pub async fn stage(&self, files: &[String]) {
        if files.is_empty() {
            return;
        }
        let args = std::iter::once("add".to_string()).chain(files.iter().cloned());
        if let Err(e) = self.git_write(args).await {
            let err = StageError::Stage { files: files.join(" ") };
            log::warn!("{}", err);
            log::debug!("{}", e);
        }
    }

    /// Add a whole directory: tracked changes only, or untracked files too
    /// when `addUntrackedFiles` is set
    pub async fn stage_dir(&self, dir: &str) {
        let mode = if self.options.add_untracked_files { "--all" } else { "--update" };
        if let Err(e) = self.git_write(["add", dir, mode]).await {
            let err = StageError::Stage { files: dir.to_string() };
            log::warn!("{}", err);
            log::debug!("{}", e);
        }
    }

    /// Discard local modifications; failures are logged, not raised
    pub async fn reset(&self, files: &[String]) {
        if files.is_empty() {
            return;
        }
        let args = ["checkout", "HEAD", "--"]
            .into_iter()
            .map(String::from)
            .chain(files.iter().cloned());
        if let Err(e) = self.git_write(args).await {
            let err = StageError::Reset { files: files.join(" ") };
            log::warn!("{}", err);
            log::debug!("{}", e);
        }
    }

    /// Commit the index with the rendered `commitMessage`
    pub async fn commit(&self, ctx: &ReleaseContext) -> Result<()> {
        let message = ctx.render(&self.options.commit_message);
        let mut args = vec!["commit".to_string(), format!("--message={}", message)];
        args.extend(self.options.commit_args.iter().map(|a| ctx.render(a)));

        match self.git_write(args).await {
            Ok(_) => Ok(()),
            Err(e) => {
                let reason = failure_reason(&e);
                if reason.contains("nothing to commit") || reason.contains("nothing added to commit") {
                    if self.options.require_non_empty_commit {
                        return Err(GitError::CommitFailed { reason }.into());
                    }
                    log::warn!("No changes to commit. The latest commit will be tagged.");
                    return Ok(());
                }
                Err(GitError::CommitFailed { reason }.into())
            }
        }
    }

    /// Create an annotated tag; returns the rendered tag name
    pub async fn tag(&self, ctx: &ReleaseContext) -> Result<String> {
        let name = ctx.render(&self.options.tag_name);
        let annotation = ctx.render(&self.options.tag_annotation);
        let mut args = vec![
            "tag".to_string(),
            "--annotate".to_string(),
            format!("--message={}", annotation),
        ];
        args.extend(self.options.tag_args.iter().map(|a| ctx.render(a)));
        args.push(name.clone());

        self.git_write(args).await.map_err(|e| GitError::TagFailed {
            tag: name.clone(),
            reason: failure_reason(&e),
        })?;
        Ok(name)
    }

    /// Arguments `push` will use given the current repository state.
    ///
    /// A URL target is pushed to directly. A branch without upstream is
    /// pushed with `-u <remote> <branch>`. Otherwise the named remote.
    pub async fn push_command(&self) -> Vec<String> {
        let target = self.options.push_repo.clone();
        let mut args = vec!["push".to_string()];
        args.extend(self.options.push_args.iter().cloned());

        if is_url(&target) {
            args.push(target);
            args.push("HEAD".to_string());
        } else if !self.has_upstream_branch().await {
            match self.get_branch_name().await {
                Some(branch) => args.extend(["-u".to_string(), target, branch]),
                None => args.push(target),
            }
        } else {
            args.push(target);
        }
        args
    }

    /// Push commits and tags, then refresh the snapshot
    pub async fn push(&mut self) -> Result<()> {
        let args = self.push_command().await;
        self.git_write(args).await.map_err(|e| GitError::PushFailed {
            reason: failure_reason(&e),
        })?;
        if !self.shell.is_dry_run() {
            self.state = self.query_state().await;
        }
        Ok(())
    }

    /// Fresh checkout of `repo_url` into `target_dir`
    pub async fn clone(&self, repo_url: &str, target_dir: &Path) -> Result<()> {
        let target = target_dir.to_string_lossy().into_owned();
        self.git_write(["clone", repo_url, target.as_str()])
            .await
            .map_err(|e| GitError::CloneFailed {
                repo: repo_url.to_string(),
                reason: failure_reason(&e),
            })?;
        Ok(())
    }

    /// Run a commit-log command. `[REV_RANGE]` expands to `<latestTag>..HEAD`,
    /// or to nothing when there is no tag.
    pub async fn get_changelog(
        &self,
        template: &str,
        latest_tag: Option<&str>,
        ctx: &ReleaseContext,
    ) -> Result<String> {
        let range = latest_tag.map(|tag| format!("{}..HEAD", tag)).unwrap_or_default();
        let command = template.replace(REV_RANGE, &range);
        match self.shell.exec(Cmd::Line(command), ExecOptions::READ, ctx).await {
            Ok(out) => Ok(out.unwrap_or_default()),
            Err(e) => Err(GitError::ChangelogFailed {
                reason: failure_reason(&e),
            }
            .into()),
        }
    }
}

fn normalized(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| path.absolutize().map(|p| p.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Underlying command failure message without the wrapper text
fn failure_reason(err: &ReleaseError) -> String {
    match err {
        ReleaseError::Cli(crate::error::CliError::ExecutionFailed { reason, .. }) => reason.clone(),
        other => other.to_string(),
    }
}

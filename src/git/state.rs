//! Repository state snapshot.

/// View of a working directory's repository state.
///
/// Produced by [`RepositoryClient::query_state`](super::RepositoryClient::query_state).
/// A snapshot is only valid until the next mutating operation; the client
/// re-queries after each push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryState {
    /// Current branch, `None` when unborn or detached
    pub current_branch: Option<String>,
    /// Most recent tag reachable from HEAD
    pub latest_tag: Option<String>,
    /// URL of the push remote (or the push target itself when it is a URL)
    pub remote_url: Option<String>,
    /// Current branch tracks a remote branch
    pub has_upstream_branch: bool,
    /// No staged or unstaged changes to tracked files
    pub is_working_dir_clean: bool,
    /// Directory is inside a git work tree
    pub is_git_repo: bool,
    /// Directory is the top level of the work tree
    pub is_root_dir: bool,
}

//! Remote release hosting.
//!
//! [`ReleaseHost`] is the seam the orchestrator calls after pushing;
//! [`GitHubReleaser`] implements it against the GitHub REST API.

mod client;

pub use client::GitHubReleaser;

use crate::context::ReleaseContext;
use crate::error::Result;
use crate::shell::Shell;
use regex::Regex;
use std::future::Future;
use std::sync::LazyLock;

static REMOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[a-z+]+://)?(?:[^@/]+@)?(?P<host>[^/:]+)(?::\d+)?[:/](?P<path>.+?)(?:\.git)?/?$",
    )
    .expect("remote regex is valid")
});

/// `owner/repository` coordinates parsed from a remote URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub host: String,
    pub owner: String,
    pub repository: String,
}

impl RepoSlug {
    /// Parse https, ssh and scp-style remote URLs
    pub fn parse(remote: &str) -> Option<Self> {
        let caps = REMOTE_RE.captures(remote.trim())?;
        let path = caps.name("path")?.as_str();
        let (owner, repository) = path.rsplit_once('/')?;
        if owner.is_empty() || repository.is_empty() {
            return None;
        }
        Some(Self {
            host: caps["host"].to_string(),
            owner: owner.to_string(),
            repository: repository.to_string(),
        })
    }

    /// `owner/repository`
    pub fn project(&self) -> String {
        format!("{}/{}", self.owner, self.repository)
    }
}

/// What to release
#[derive(Debug, Clone)]
pub struct ReleaseRequest<'a> {
    pub version: &'a str,
    pub is_pre_release: bool,
    pub tag_name: &'a str,
    /// Release body
    pub changelog: &'a str,
    /// Remote the tag was pushed to
    pub remote_url: Option<&'a str>,
}

/// Remote release collaborator
pub trait ReleaseHost {
    /// Create the release; `false` when nothing was created (dry run)
    fn release(
        &mut self,
        request: ReleaseRequest<'_>,
        ctx: &ReleaseContext,
    ) -> impl Future<Output = Result<bool>>;

    /// Upload the configured assets to the created release; returns the
    /// number of uploaded files
    fn upload_assets(&mut self, shell: &Shell) -> impl Future<Output = Result<usize>>;

    /// Release notes from the configured command, if any
    fn get_notes(&self, shell: &Shell, ctx: &ReleaseContext) -> impl Future<Output = Result<Option<String>>>;

    /// URL of the created release
    fn get_release_url(&self) -> Option<&str>;

    fn is_released(&self) -> bool;
}

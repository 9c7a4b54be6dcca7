//! Git integration for release workflows.
//!
//! All operations shell out to the system `git` binary through the command
//! runner, so dry-run classification and verbose echoing apply uniformly.
//! One [`RepositoryClient`] exists per working directory; the distribution
//! checkout gets its own [`DistRepositoryClient`].

mod client;
mod dist;
mod state;

pub use client::RepositoryClient;
pub use dist::DistRepositoryClient;
pub use state::RepositoryState;

use regex::Regex;
use std::sync::LazyLock;

/// Placeholder in the changelog command replaced by `<latestTag>..HEAD`
pub const REV_RANGE: &str = "[REV_RANGE]";

static SCP_LIKE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w.\-]+@[\w.\-]+:[^\s]+$").expect("scp regex is valid")
});

/// Whether a push target is a URL rather than a remote name
pub fn is_url(target: &str) -> bool {
    if SCP_LIKE_RE.is_match(target) {
        return true;
    }
    match url::Url::parse(target) {
        Ok(url) => target.contains("://") && !url.scheme().is_empty(),
        Err(_) => false,
    }
}

//! Distribution repository client.

use super::RepositoryClient;
use crate::cli::OutputManager;
use crate::config::GitOptions;
use crate::context::ReleaseContext;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;

/// Repository client for the secondary staging checkout.
///
/// Behaves exactly like [`RepositoryClient`]; in addition it can take its
/// tag naming from the primary repository so both releases carry the same
/// tag.
#[derive(Debug)]
pub struct DistRepositoryClient {
    inner: RepositoryClient,
    tag_explicit: bool,
}

impl DistRepositoryClient {
    /// Client for the checkout in `dir`. `tag_explicit` is true when the
    /// distribution options name tags themselves.
    pub fn new(
        dir: impl Into<PathBuf>,
        options: GitOptions,
        tag_explicit: bool,
        dry_run: bool,
        output: OutputManager,
    ) -> Self {
        Self {
            inner: RepositoryClient::new(dir, options, dry_run, output),
            tag_explicit,
        }
    }

    /// Mirror the primary repository's resolved tag unless the distribution
    /// repository configures its own `tagName`/`tagAnnotation`.
    ///
    /// The tag templates become the primary's rendered values and the
    /// primary's latest tag stands in for this checkout's latest tag.
    pub fn handle_tag_options(&mut self, primary: &RepositoryClient, ctx: &ReleaseContext) {
        if self.tag_explicit {
            log::debug!("distribution repository names its own tags");
            return;
        }

        let tag_name = ctx.render(&primary.options().tag_name);
        let annotation = ctx.render(&primary.options().tag_annotation);
        log::debug!("distribution repository follows primary tag {}", tag_name);

        let options = self.inner.options_mut();
        options.tag_name = tag_name;
        options.tag_annotation = annotation;
        options.tag_match = primary.options().tag_match.clone();

        if let Some(latest) = primary.state().latest_tag.clone() {
            self.inner.state_mut().latest_tag = Some(latest);
        }
    }

    /// Whether tag naming is configured for this repository itself
    pub fn is_tag_explicit(&self) -> bool {
        self.tag_explicit
    }
}

impl Deref for DistRepositoryClient {
    type Target = RepositoryClient;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for DistRepositoryClient {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReleaseOptions;

    fn ctx() -> ReleaseContext {
        let mut ctx = ReleaseContext::new(&ReleaseOptions::default()).unwrap();
        ctx.set("version", "3.1.0");
        ctx.set("name", "widgets");
        ctx
    }

    #[test]
    fn test_follows_primary_tag() {
        let mut primary_options = GitOptions::default();
        primary_options.tag_name = "${name}-v${version}".to_string();
        let mut primary = RepositoryClient::new(".", primary_options, true, OutputManager::quiet());
        primary.state_mut().latest_tag = Some("widgets-v3.0.0".to_string());

        let mut dist = DistRepositoryClient::new(
            "dist-checkout",
            GitOptions::default(),
            false,
            true,
            OutputManager::quiet(),
        );
        dist.handle_tag_options(&primary, &ctx());

        assert_eq!(dist.options().tag_name, "widgets-v3.1.0");
        assert_eq!(dist.options().tag_annotation, "Release 3.1.0");
        assert_eq!(dist.state().latest_tag.as_deref(), Some("widgets-v3.0.0"));
    }

    #[test]
    fn test_explicit_tag_is_kept() {
        let primary = RepositoryClient::new(".", GitOptions::default(), true, OutputManager::quiet());
        let mut options = GitOptions::default();
        options.tag_name = "dist-${version}".to_string();
        let mut dist = DistRepositoryClient::new("d", options, true, true, OutputManager::quiet());

        dist.handle_tag_options(&primary, &ctx());
        assert!(dist.is_tag_explicit());
        assert_eq!(dist.options().tag_name, "dist-${version}");
    }
}

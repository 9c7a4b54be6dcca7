//! Changelog generation.

use crate::context::ReleaseContext;
use crate::error::Result;
use crate::git::RepositoryClient;

/// Produces the changelog text for a release from the commit log
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangelogGenerator;

impl ChangelogGenerator {
    /// Run `template` (a commit-log command, see
    /// [`RepositoryClient::get_changelog`]) against `client`, bounded by
    /// `latest_tag` when present
    pub async fn create(
        client: &RepositoryClient,
        template: &str,
        latest_tag: Option<&str>,
        ctx: &ReleaseContext,
    ) -> Result<String> {
        if template.trim().is_empty() {
            return Ok(String::new());
        }
        let changelog = client.get_changelog(template, latest_tag, ctx).await?;
        log::debug!(
            "changelog since {}: {} line(s)",
            latest_tag.unwrap_or("the first commit"),
            changelog.lines().count()
        );
        Ok(changelog)
    }
}

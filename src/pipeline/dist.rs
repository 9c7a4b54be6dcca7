//! Distribution pass: repeat the release stages inside a checkout of the
//! distribution repository.

use super::stages::PassContext;
use super::{Collaborators, PipelineRun, PipelineStage};
use crate::cli::OutputManager;
use crate::config::ReleaseOptions;
use crate::context::{ReleaseContext, fields};
use crate::error::{ConfigError, Result};
use crate::git::{DistRepositoryClient, RepositoryClient};
use crate::github::ReleaseHost;
use crate::prompt::Prompter;
use crate::publish::Registry;
use crate::shell::ExecOptions;

/// Borrowed inputs of the distribution pass
pub(super) struct DistPass<'a, H, R, P> {
    pub primary: &'a RepositoryClient,
    /// Primary options; the distribution options are derived from them
    pub options: &'a ReleaseOptions,
    pub collaborators: &'a mut Collaborators<H, R>,
    /// Primary context after the primary release
    pub ctx: &'a ReleaseContext,
    pub prompter: &'a P,
    pub output: &'a OutputManager,
    pub run: &'a mut PipelineRun,
    pub version: &'a str,
}

/// Clone the distribution repository into the stage directory, copy the
/// configured files from the base directory, then bump, stage and release it.
///
/// The changelog is inherited from the primary pass. The stage directory is
/// removed after a successful release and kept for inspection otherwise.
pub(super) async fn release<H, R, P>(pass: DistPass<'_, H, R, P>) -> Result<()>
where
    H: ReleaseHost,
    R: Registry,
    P: Prompter,
{
    let DistPass {
        primary,
        options,
        collaborators,
        ctx,
        prompter,
        output,
        run,
        version,
    } = pass;

    let repo = options.dist.repo.as_deref().ok_or_else(|| ConfigError::MissingOption {
        option: "dist.repo".to_string(),
    })?;
    let dist_options = options.for_distribution()?;
    let shell = primary.shell();
    let stage_dir = shell.resolve(&options.dist.stage_dir);
    let base_dir = shell.resolve(&options.dist.base_dir);

    output.section(&format!("Distribution repository {}", repo));
    log::info!("releasing distribution repository {} in {}", repo, stage_dir.display());

    let remove_stage = format!("!rm {}", options.dist.stage_dir.display());
    shell.exec(remove_stage.as_str(), ExecOptions::WRITE, ctx).await?;
    primary.clone(repo, &stage_dir).await?;
    let copied = shell.copy_files(&options.dist.files, &base_dir, &stage_dir)?;
    log::debug!("copied {} file(s) into the distribution checkout", copied);

    let mut client = DistRepositoryClient::new(
        stage_dir.clone(),
        dist_options.git.clone(),
        options.dist_tag_explicit(),
        options.dry_run,
        output.clone(),
    );
    let state = client.init().await.clone();
    client.handle_tag_options(primary, ctx);

    let mut dist_ctx = ctx.with_options(&dist_options)?;
    dist_ctx.set(fields::BRANCH_NAME, state.current_branch.unwrap_or_default());
    dist_ctx.set(fields::TAG_NAME, dist_ctx.render(&client.options().tag_name));
    if let Some(remote) = &state.remote_url {
        super::set_repo_fields(&mut dist_ctx, remote);
    }

    let mut pass = PassContext {
        client: &mut *client,
        collaborators,
        options: &dist_options,
        ctx: &mut dist_ctx,
        prompter,
        output,
        run,
    };
    pass.bump(version).await?;
    pass.stage().await?;
    pass.release().await?;
    pass.run.advance(PipelineStage::DistReleased);

    shell.exec(remove_stage.as_str(), ExecOptions::WRITE, ctx).await?;
    output.success(&format!("Released distribution repository {}", repo));
    Ok(())
}

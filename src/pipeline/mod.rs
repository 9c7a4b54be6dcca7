//! Release pipeline orchestration.
//!
//! [`Orchestrator::run`] drives one release: repository preconditions, version
//! resolution, manifest bump, changelog, staging, then the optional stages
//! commit → tag → push → remote release → registry publish. When a
//! distribution repository is configured a second pass repeats the release
//! stages inside a fresh checkout of it.
//!
//! The two passes never overlap and every stage is awaited before the next
//! one starts.

mod cancel;
mod dist;
mod stages;

pub use cancel::CancelScope;
pub use stages::Hook;

use crate::cli::OutputManager;
use crate::config::ReleaseOptions;
use crate::context::{ReleaseContext, fields};
use crate::error::{ConfigError, GitError, ReleaseError, Result};
use crate::git::RepositoryClient;
use crate::github::{GitHubReleaser, ReleaseHost, RepoSlug};
use crate::prompt::Prompter;
use crate::publish::{CommandRegistry, Registry};
use crate::version::{ChangelogTiming, VersionResolver};
use stages::PassContext;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Remote release and registry collaborators of one pass
#[derive(Debug)]
pub struct Collaborators<H, R> {
    pub host: H,
    pub registry: R,
}

impl<H, R> Collaborators<H, R> {
    pub fn new(host: H, registry: R) -> Self {
        Self { host, registry }
    }
}

impl Collaborators<GitHubReleaser, CommandRegistry> {
    /// GitHub and command-registry collaborators for `options`
    pub fn from_options(options: &ReleaseOptions, output: &OutputManager) -> Result<Self> {
        Ok(Self {
            host: GitHubReleaser::new(options.github.clone(), options.dry_run, output.clone())?,
            registry: CommandRegistry::new(options.registry.clone(), output.clone()),
        })
    }
}

/// Pipeline states, in order. `Failed` is reachable from any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    Start,
    Versioned,
    Bumped,
    Changelogged,
    Staged,
    Released,
    DistReleased,
    Done,
    Failed,
}

/// Which repository a run releases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Primary,
    Distribution,
}

/// Progress record of one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRun {
    pub kind: PassKind,
    pub stage: PipelineStage,
    pub committed: bool,
    pub tagged: bool,
    pub pushed: bool,
    pub released: bool,
    pub published: bool,
}

impl PipelineRun {
    pub fn new(kind: PassKind) -> Self {
        Self {
            kind,
            stage: PipelineStage::Start,
            committed: false,
            tagged: false,
            pushed: false,
            released: false,
            published: false,
        }
    }

    pub(crate) fn advance(&mut self, stage: PipelineStage) {
        log::debug!("{:?} pass: {:?} -> {:?}", self.kind, self.stage, stage);
        self.stage = stage;
    }
}

/// Result of a successful release
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseOutcome {
    pub name: String,
    pub changelog: String,
    pub latest_version: String,
    pub version: String,
    pub tag_name: Option<String>,
    pub release_url: Option<String>,
    pub package_url: Option<String>,
}

/// Runs the release pipeline against one repository and, optionally, its
/// distribution repository
pub struct Orchestrator<H, R, P> {
    options: ReleaseOptions,
    output: OutputManager,
    client: RepositoryClient,
    collaborators: Collaborators<H, R>,
    dist_collaborators: Option<Collaborators<H, R>>,
    prompter: P,
    cancel: CancellationToken,
    ctx: ReleaseContext,
    resolver: VersionResolver,
    runs: Vec<PipelineRun>,
}

impl<P: Prompter> Orchestrator<GitHubReleaser, CommandRegistry, P> {
    /// Orchestrator with the GitHub and command-registry collaborators for
    /// both passes
    pub fn from_options(
        options: ReleaseOptions,
        dir: impl Into<PathBuf>,
        prompter: P,
        output: OutputManager,
    ) -> Result<Self> {
        let collaborators = Collaborators::from_options(&options, &output)?;
        let dist = if options.has_dist() {
            let dist_options = options.for_distribution()?;
            Some(Collaborators::from_options(&dist_options, &output)?)
        } else {
            None
        };
        let orchestrator = Self::new(options, dir, collaborators, prompter, output)?;
        Ok(match dist {
            Some(dist) => orchestrator.with_dist_collaborators(dist),
            None => orchestrator,
        })
    }
}

impl<H, R, P> Orchestrator<H, R, P>
where
    H: ReleaseHost,
    R: Registry,
    P: Prompter,
{
    pub fn new(
        options: ReleaseOptions,
        dir: impl Into<PathBuf>,
        collaborators: Collaborators<H, R>,
        prompter: P,
        output: OutputManager,
    ) -> Result<Self> {
        let client = RepositoryClient::new(dir, options.git.clone(), options.dry_run, output.clone());
        let ctx = ReleaseContext::new(&options)?;
        let resolver = VersionResolver::new(options.git.tag_prefix(), options.disable_version_check);
        Ok(Self {
            options,
            output,
            client,
            collaborators,
            dist_collaborators: None,
            prompter,
            cancel: CancellationToken::new(),
            ctx,
            resolver,
            runs: Vec::new(),
        })
    }

    /// Collaborators for the distribution pass
    pub fn with_dist_collaborators(mut self, collaborators: Collaborators<H, R>) -> Self {
        self.dist_collaborators = Some(collaborators);
        self
    }

    /// Parent token for the run's cancellation scope
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn context(&self) -> &ReleaseContext {
        &self.ctx
    }

    pub fn client(&self) -> &RepositoryClient {
        &self.client
    }

    /// Progress of the primary and the distribution pass
    pub fn runs(&self) -> &[PipelineRun] {
        &self.runs
    }

    pub fn collaborators(&self) -> &Collaborators<H, R> {
        &self.collaborators
    }

    /// Run the pipeline.
    ///
    /// On the interactive branch with a clean working directory required the
    /// run is wrapped in a cancellation scope: an interrupt aborts the run with
    /// [`ReleaseError::Aborted`] and resets the manifests to their committed
    /// content. Commits, tags and pushes already made stay in place.
    pub async fn run(&mut self) -> Result<ReleaseOutcome> {
        let guarded = self.options.is_interactive() && self.options.git.require_clean_working_dir;

        let result = if guarded {
            let scope = CancelScope::with_signal(&self.cancel);
            let token = scope.token().clone();
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(ReleaseError::Aborted),
                result = self.execute() => result,
            }
        } else {
            self.execute().await
        };

        if let Err(ref err) = result {
            if let Some(run) = self.runs.last_mut() {
                run.advance(PipelineStage::Failed);
            }
            if matches!(err, ReleaseError::Aborted) {
                log::warn!("release aborted, resetting {:?}", self.options.pkg_files);
                self.client.reset(&self.options.pkg_files).await;
            }
            log::error!("release failed: {}", err);
            log::debug!("release failure detail: {:?}", err);
        }
        result
    }

    async fn execute(&mut self) -> Result<ReleaseOutcome> {
        let Self {
            options,
            output,
            client,
            collaborators,
            dist_collaborators,
            prompter,
            ctx,
            resolver,
            runs,
            ..
        } = self;

        runs.clear();
        runs.push(PipelineRun::new(PassKind::Primary));

        let name = match &options.name {
            Some(name) => name.clone(),
            None => package_name(client, options).await,
        };
        ctx.set(fields::NAME, name.clone());

        let state = client.init().await.clone();
        ctx.set(fields::BRANCH_NAME, state.current_branch.clone().unwrap_or_default());
        if let Some(tag) = &state.latest_tag {
            ctx.set(fields::LATEST_TAG, tag.clone());
        }
        if let Some(remote) = &state.remote_url {
            set_repo_fields(ctx, remote);
        }
        client.validate().await?;

        let mut pass = PassContext {
            client: &mut *client,
            collaborators: &mut *collaborators,
            options: &*options,
            ctx: &mut *ctx,
            prompter: &*prompter,
            output: &*output,
            run: &mut runs[0],
        };

        pass.hook(Hook::BeforeStart).await?;

        let version = pass.resolve_version(resolver).await?;
        let latest_version = resolver.latest_version().to_string();
        output.info(&format!("Release {} {} → {}", name, latest_version, version));

        let timing = resolver.changelog_timing();
        if timing == ChangelogTiming::Early {
            pass.changelog(state.latest_tag.as_deref()).await?;
        }

        let tag_name = pass.ctx.render(&options.git.tag_name);
        if options.git.tag && pass.client.tag_exists(&tag_name).await {
            return Err(GitError::TagFailed {
                tag: tag_name,
                reason: "tag already exists".to_string(),
            }
            .into());
        }
        pass.ctx.set(fields::TAG_NAME, tag_name);

        pass.bump(&version).await?;
        if timing == ChangelogTiming::Late {
            pass.changelog(state.latest_tag.as_deref()).await?;
        }
        pass.stage().await?;
        pass.release().await?;

        if options.has_dist() {
            let Some(dist_collaborators) = dist_collaborators.as_mut() else {
                return Err(ConfigError::InvalidOption {
                    option: "dist.repo".to_string(),
                    reason: "no release collaborators for the distribution repository".to_string(),
                }
                .into());
            };
            let index = runs.len();
            runs.push(PipelineRun::new(PassKind::Distribution));
            let result = dist::release(dist::DistPass {
                primary: &*client,
                options: &*options,
                collaborators: dist_collaborators,
                ctx: &*ctx,
                prompter: &*prompter,
                output: &*output,
                run: &mut runs[index],
                version: &version,
            })
            .await;
            if let Err(err) = result {
                output.error(&format!("Distribution release failed: {}", err));
                log::error!("distribution pass failed after the primary release: {}", err);
                return Err(err);
            }
        }

        for run in runs.iter_mut() {
            run.advance(PipelineStage::Done);
        }

        let outcome = ReleaseOutcome {
            name,
            changelog: ctx.get_str(fields::CHANGELOG).unwrap_or_default().to_string(),
            latest_version,
            version,
            tag_name: ctx.get_str(fields::TAG_NAME).map(String::from),
            release_url: collaborators.host.get_release_url().map(String::from),
            package_url: if collaborators.registry.is_published() {
                collaborators.registry.get_package_url(ctx)
            } else {
                None
            },
        };
        Ok(outcome)
    }
}

/// Name from the first manifest, else the directory name
async fn package_name(client: &RepositoryClient, options: &ReleaseOptions) -> String {
    for file in &options.pkg_files {
        if let Some(name) = client.shell().read_manifest_name(file).await {
            return name;
        }
    }
    client
        .dir()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "package".to_string())
}

fn set_repo_fields(ctx: &mut ReleaseContext, remote: &str) {
    ctx.set("repo.remote", remote);
    if let Some(slug) = RepoSlug::parse(remote) {
        ctx.set("repo.host", slug.host.clone());
        ctx.set("repo.owner", slug.owner.clone());
        ctx.set("repo.repository", slug.repository.clone());
        ctx.set("repo.project", slug.project());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert!(PipelineStage::Start < PipelineStage::Versioned);
        assert!(PipelineStage::Staged < PipelineStage::Released);
        assert!(PipelineStage::Released < PipelineStage::DistReleased);
    }

    #[test]
    fn test_repo_fields() {
        let mut ctx = ReleaseContext::new(&ReleaseOptions::default()).unwrap();
        set_repo_fields(&mut ctx, "git@github.com:acme/widgets.git");
        assert_eq!(ctx.render("${repo.owner}/${repo.repository}"), "acme/widgets");
        assert_eq!(ctx.get_str("repo.project"), Some("acme/widgets"));
        assert_eq!(ctx.get_str("repo.host"), Some("github.com"));
    }
}

//! The staged release sequence shared by the primary and the distribution
//! pass.

use super::{Collaborators, PipelineRun, PipelineStage};
use crate::changelog::ChangelogGenerator;
use crate::cli::OutputManager;
use crate::config::ReleaseOptions;
use crate::context::{ReleaseContext, fields};
use crate::error::Result;
use crate::git::RepositoryClient;
use crate::github::{ReleaseHost, ReleaseRequest};
use crate::prompt::{PromptName, Prompter};
use crate::publish::{PublishRequest, Registry};
use crate::shell::ExecOptions;
use crate::version::{IncrementSpec, LatestVersionSources, RecommendationEngine, VersionResolver};

/// Lifecycle hook points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    BeforeStart,
    BeforeBump,
    AfterBump,
    BeforeStage,
    AfterRelease,
}

impl Hook {
    pub fn name(self) -> &'static str {
        match self {
            Hook::BeforeStart => "beforeStart",
            Hook::BeforeBump => "beforeBump",
            Hook::AfterBump => "afterBump",
            Hook::BeforeStage => "beforeStage",
            Hook::AfterRelease => "afterRelease",
        }
    }

    fn commands(self, options: &ReleaseOptions) -> &[String] {
        let hooks = &options.hooks;
        match self {
            Hook::BeforeStart => &hooks.before_start,
            Hook::BeforeBump => &hooks.before_bump,
            Hook::AfterBump => &hooks.after_bump,
            Hook::BeforeStage => &hooks.before_stage,
            Hook::AfterRelease => &hooks.after_release,
        }
    }
}

/// Everything one pass borrows while it runs
pub(super) struct PassContext<'a, H, R, P> {
    /// Repository this pass releases
    pub client: &'a mut RepositoryClient,
    /// Remote release and registry collaborators of this pass
    pub collaborators: &'a mut Collaborators<H, R>,
    /// Options of this pass
    pub options: &'a ReleaseOptions,
    /// Context of this pass
    pub ctx: &'a mut ReleaseContext,
    pub prompter: &'a P,
    pub output: &'a OutputManager,
    /// Progress record of this pass
    pub run: &'a mut PipelineRun,
}

impl<H, R, P> PassContext<'_, H, R, P>
where
    H: ReleaseHost,
    R: Registry,
    P: Prompter,
{
    /// Run every command of a hook. Shell hooks also run in dry run; `!`
    /// builtins are mutating and only logged then.
    pub async fn hook(&self, hook: Hook) -> Result<()> {
        for command in hook.commands(self.options) {
            log::debug!("{} hook: {}", hook.name(), command);
            let options = if command.trim_start().starts_with('!') {
                ExecOptions::WRITE
            } else {
                ExecOptions::READ
            };
            self.client.shell().exec(command.as_str(), options, self.ctx).await?;
        }
        Ok(())
    }

    /// Ask before an optional stage. Disabled stages never run; on the
    /// non-interactive branch enabled stages always run.
    async fn confirm(&self, enabled: bool, prompt: PromptName, subject: &str) -> Result<bool> {
        if !enabled {
            return Ok(false);
        }
        if !self.options.is_interactive() {
            return Ok(true);
        }
        let yes = self.prompter.confirm(&prompt.question(subject), true).await?;
        if !yes {
            log::info!("skipped by user: {:?}", prompt);
        }
        Ok(yes)
    }

    /// Decide the next version and record it in the context.
    ///
    /// Sources for the latest version come from the repository state and the
    /// first manifest. Without an increment, recommendation or pre-release
    /// request the interactive branch offers the candidates; otherwise
    /// validation fails.
    pub async fn resolve_version(&mut self, resolver: &mut VersionResolver) -> Result<String> {
        let options = self.options;
        let state = self.client.state().clone();
        let pkg_version = match options.pkg_files.first() {
            Some(file) => self.client.shell().read_manifest_version(file).await,
            None => None,
        };
        let latest = resolver
            .set_latest_version(LatestVersionSources {
                use_source: options.use_source.as_ref(),
                git_tag: state.latest_tag.as_deref(),
                pkg_version: pkg_version.as_deref(),
                is_root_dir: state.is_root_dir,
            })
            .to_string();

        let increment = options
            .increment
            .as_deref()
            .map(str::parse::<IncrementSpec>)
            .transpose()?;
        let recommended = if increment.is_none() && options.recommend {
            let messages = self.client.commit_messages_since(state.latest_tag.as_deref()).await?;
            let recommended = RecommendationEngine::recommend(messages.as_slice());
            log::debug!("recommended increment from {} commit(s): {:?}", messages.len(), recommended);
            recommended
        } else {
            None
        };

        let channel = options.pre_release_channel();
        let decided = resolver
            .bump(increment.as_ref(), channel.as_deref(), recommended)?
            .is_some();

        if !decided && options.is_interactive() {
            let pre_id = channel.as_deref().filter(|id| !id.is_empty());
            let candidates = resolver.candidates(pre_id);
            let choices: Vec<String> = candidates
                .iter()
                .map(|(increment, version)| format!("{} ({})", increment, version))
                .collect();
            let name = self.ctx.get_str(fields::NAME).unwrap_or("package").to_string();
            let index = self
                .prompter
                .select(&PromptName::Increment.question(&name), &choices, 0)
                .await?;
            if let Some((increment, version)) = candidates.into_iter().nth(index) {
                resolver.choose(Some(increment), version);
            }
        }

        let version = resolver.validate()?.to_string();
        self.ctx.set(fields::LATEST_VERSION, latest);
        self.ctx.set(fields::VERSION, version.clone());
        self.run.advance(PipelineStage::Versioned);
        Ok(version)
    }

    /// Generate the changelog into the context
    pub async fn changelog(&mut self, latest_tag: Option<&str>) -> Result<()> {
        let changelog =
            ChangelogGenerator::create(self.client, &self.options.git.changelog, latest_tag, self.ctx).await?;
        self.ctx.set(fields::CHANGELOG, changelog);
        self.run.advance(PipelineStage::Changelogged);
        Ok(())
    }

    /// Bump manifests between the bump hooks
    pub async fn bump(&mut self, version: &str) -> Result<()> {
        self.hook(Hook::BeforeBump).await?;
        let bumped = self.client.shell().bump(&self.options.pkg_files, version).await;
        if !bumped.is_empty() {
            self.output.success(&format!("Bumped {} file(s) to {}", bumped.len(), version));
        }
        self.hook(Hook::AfterBump).await?;
        self.run.advance(PipelineStage::Bumped);
        Ok(())
    }

    /// Stage manifests and the working tree
    pub async fn stage(&mut self) -> Result<()> {
        self.hook(Hook::BeforeStage).await?;
        let dir = self.client.dir();
        let pkg_files: Vec<String> = self
            .options
            .pkg_files
            .iter()
            .filter(|f| self.client.shell().is_dry_run() || dir.join(f).exists())
            .cloned()
            .collect();
        self.client.stage(&pkg_files).await;
        self.client.stage_dir(".").await;
        self.run.advance(PipelineStage::Staged);
        Ok(())
    }

    /// Commit, tag, push, remote release, registry publish, `afterRelease`.
    /// Declining one stage skips only that stage.
    pub async fn release(&mut self) -> Result<()> {
        let git = self.options.git.clone();
        let version = self.ctx.get_str(fields::VERSION).unwrap_or_default().to_string();
        let is_pre_release = semver::Version::parse(&version).is_ok_and(|v| !v.pre.is_empty());

        let message = self.ctx.render(&git.commit_message);
        if self.confirm(git.commit, PromptName::Commit, &message).await? {
            self.client.commit(self.ctx).await?;
            self.run.committed = true;
            self.output.success(&format!("Committed: {}", message));
        }

        let tag_name = self.ctx.render(&self.client.options().tag_name);
        if self.confirm(git.tag, PromptName::Tag, &tag_name).await? {
            let tag = self.client.tag(self.ctx).await?;
            self.ctx.set(fields::TAG_NAME, tag.clone());
            self.run.tagged = true;
            self.output.success(&format!("Tagged: {}", tag));
        }

        if self.confirm(git.push, PromptName::Push, &git.push_repo).await? {
            self.client.push().await?;
            self.run.pushed = true;
            self.output.success(&format!("Pushed to {}", git.push_repo));
        }

        let tag_name = self
            .ctx
            .get_str(fields::TAG_NAME)
            .map(String::from)
            .unwrap_or(tag_name);

        if self
            .confirm(self.options.github.release, PromptName::Release, &tag_name)
            .await?
        {
            let shell = self.client.shell();
            let changelog = self.ctx.get_str(fields::CHANGELOG).unwrap_or_default().to_string();
            let notes = self
                .collaborators
                .host
                .get_notes(shell, self.ctx)
                .await?
                .unwrap_or(changelog);
            let remote_url = self.client.state().remote_url.clone();
            let request = ReleaseRequest {
                version: &version,
                is_pre_release,
                tag_name: &tag_name,
                changelog: &notes,
                remote_url: remote_url.as_deref(),
            };
            if self.collaborators.host.release(request, self.ctx).await? {
                self.collaborators.host.upload_assets(shell).await?;
                if let Some(url) = self.collaborators.host.get_release_url() {
                    self.ctx.set(fields::RELEASE_URL, url);
                }
            }
            self.run.released = self.collaborators.host.is_released();
        }

        let name = self.ctx.get_str(fields::NAME).unwrap_or("package").to_string();
        if self
            .confirm(self.options.registry.publish, PromptName::Publish, &name)
            .await?
        {
            let request = PublishRequest {
                version: &version,
                is_pre_release,
                otp_prompt: self.options.registry.otp_prompt && self.options.is_interactive(),
            };
            self.collaborators
                .registry
                .publish(request, self.client.shell(), self.ctx, self.prompter)
                .await?;
            self.run.published = self.collaborators.registry.is_published();
        }

        self.hook(Hook::AfterRelease).await?;
        self.run.advance(PipelineStage::Released);
        Ok(())
    }
}

//! Package registry publishing.
//!
//! [`Registry`] is the seam the orchestrator calls after the remote release.
//! [`CommandRegistry`] runs the configured publish command (default
//! `cargo publish`) and handles one-time-password challenges.

use crate::cli::OutputManager;
use crate::config::RegistryOptions;
use crate::context::{ReleaseContext, fields};
use crate::error::{CliError, PublishError, ReleaseError, Result};
use crate::prompt::{PromptName, Prompter};
use crate::shell::{ExecOptions, Shell};
use regex::Regex;
use std::future::Future;
use std::sync::LazyLock;

static OTP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(one-time pass|\bEOTP\b|\botp\b|two-factor)").expect("otp regex is valid")
});

/// What to publish
#[derive(Debug, Clone, Copy)]
pub struct PublishRequest<'a> {
    pub version: &'a str,
    pub is_pre_release: bool,
    /// Ask for a one-time password when the registry wants one
    pub otp_prompt: bool,
}

/// Package registry collaborator
pub trait Registry {
    /// Publish the package; `false` when nothing was published (dry run)
    fn publish<P: Prompter>(
        &mut self,
        request: PublishRequest<'_>,
        shell: &Shell,
        ctx: &ReleaseContext,
        prompter: &P,
    ) -> impl Future<Output = Result<bool>>;

    fn is_published(&self) -> bool;

    /// Public URL of the published package
    fn get_package_url(&self, ctx: &ReleaseContext) -> Option<String>;
}

/// Registry driven by a publish command
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    options: RegistryOptions,
    output: OutputManager,
    published: bool,
}

impl CommandRegistry {
    pub fn new(options: RegistryOptions, output: OutputManager) -> Self {
        Self {
            options,
            output,
            published: false,
        }
    }

    /// Distribution tag: configured, else the pre-release id, else `latest`
    fn dist_tag(&self, request: &PublishRequest<'_>) -> String {
        if let Some(tag) = &self.options.tag {
            return tag.clone();
        }
        if request.is_pre_release {
            let pre = request.version.split_once('-').map(|(_, pre)| pre).unwrap_or_default();
            let id = pre.split('.').next().unwrap_or_default();
            if !id.is_empty() && id.parse::<u64>().is_err() {
                return id.to_string();
            }
            return "next".to_string();
        }
        "latest".to_string()
    }
}

fn requires_otp(err: &ReleaseError) -> bool {
    matches!(err, ReleaseError::Cli(CliError::ExecutionFailed { reason, .. }) if OTP_RE.is_match(reason))
}

impl Registry for CommandRegistry {
    async fn publish<P: Prompter>(
        &mut self,
        request: PublishRequest<'_>,
        shell: &Shell,
        ctx: &ReleaseContext,
        prompter: &P,
    ) -> Result<bool> {
        let package = ctx.get_str(fields::NAME).unwrap_or("package").to_string();
        let mut ctx = ctx.clone();
        ctx.set(fields::DIST_TAG, self.dist_tag(&request));
        let command = self.options.publish_command.clone();

        let outcome = match shell.exec(command.as_str(), ExecOptions::WRITE, &ctx).await {
            Err(e) if requires_otp(&e) => {
                if !request.otp_prompt {
                    return Err(PublishError::OtpRequired { package }.into());
                }
                let otp = prompter.input(&PromptName::Otp.question(&package)).await?;
                let retry = format!("{} --otp={}", command, otp.trim());
                shell.exec(retry, ExecOptions::WRITE, &ctx).await
            }
            other => other,
        };

        match outcome {
            Ok(Some(_)) => {
                self.published = true;
                self.output.success(&format!("Published {} {}", package, request.version));
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) if requires_otp(&e) => Err(PublishError::OtpRequired { package }.into()),
            Err(e) => Err(PublishError::PublishFailed {
                package,
                reason: e.to_string(),
            }
            .into()),
        }
    }

    fn is_published(&self) -> bool {
        self.published
    }

    fn get_package_url(&self, ctx: &ReleaseContext) -> Option<String> {
        let template = self.options.package_url.as_deref()?;
        let url = ctx.render(template);
        (!url.contains("${")).then_some(url)
    }
}

//! GitHub releases over the REST API

use super::{ReleaseHost, ReleaseRequest, RepoSlug};
use crate::cli::OutputManager;
use crate::config::GitHubOptions;
use crate::context::ReleaseContext;
use crate::error::{HostingError, ReleaseError, Result};
use crate::shell::{ExecOptions, Shell};
use bytes::Bytes;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Serialize)]
struct CreateRelease<'a> {
    tag_name: &'a str,
    name: &'a str,
    body: &'a str,
    draft: bool,
    prerelease: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct CreatedRelease {
    id: u64,
    html_url: String,
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadedAsset {
    name: String,
    browser_download_url: String,
}

/// GitHub release collaborator
#[derive(Debug)]
pub struct GitHubReleaser {
    options: GitHubOptions,
    token: Option<String>,
    http: reqwest::Client,
    dry_run: bool,
    output: OutputManager,
    created: Option<CreatedRelease>,
    asset_urls: Vec<String>,
}

impl GitHubReleaser {
    /// Create a releaser. The token is read from the `tokenRef` environment
    /// variable (falling back to `GH_TOKEN`); a missing token only fails
    /// when a release is actually created.
    pub fn new(options: GitHubOptions, dry_run: bool, output: OutputManager) -> Result<Self> {
        let token = std::env::var(&options.token_ref)
            .ok()
            .or_else(|| std::env::var("GH_TOKEN").ok())
            .filter(|t| !t.trim().is_empty());
        Self::with_token(options, token, dry_run, output)
    }

    /// Create a releaser with an explicit token
    pub fn with_token(
        options: GitHubOptions,
        token: Option<String>,
        dry_run: bool,
        output: OutputManager,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("release_cutter/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(options.timeout.max(1)))
            .build()
            .map_err(|e| HostingError::Request {
                operation: "create HTTP client".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            options,
            token,
            http,
            dry_run,
            output,
            created: None,
            asset_urls: Vec::new(),
        })
    }

    /// Download URLs of uploaded assets
    pub fn asset_urls(&self) -> &[String] {
        &self.asset_urls
    }

    fn auth(&self) -> Result<HeaderValue> {
        let token = self.token.as_deref().ok_or_else(|| HostingError::MissingToken {
            token_ref: self.options.token_ref.clone(),
        })?;
        HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
            HostingError::Request {
                operation: "authorize".to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn releases_endpoint(&self, slug: &RepoSlug) -> String {
        format!(
            "{}/repos/{}/{}/releases",
            self.options.host.trim_end_matches('/'),
            slug.owner,
            slug.repository
        )
    }

    async fn check<T: serde::de::DeserializeOwned>(
        operation: &str,
        response: std::result::Result<reqwest::Response, reqwest::Error>,
    ) -> Result<T> {
        let request_failed = |reason: String| -> ReleaseError {
            HostingError::Request {
                operation: operation.to_string(),
                reason,
            }
            .into()
        };

        let response = response.map_err(|e| request_failed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(request_failed(format!("status {}: {}", status.as_u16(), text)));
        }
        response
            .json()
            .await
            .map_err(|e| request_failed(format!("Failed to parse response: {}", e)))
    }

    fn asset_paths(&self, base: &std::path::Path) -> Vec<PathBuf> {
        self.options
            .assets
            .iter()
            .flat_map(|pattern| {
                let full = base.join(pattern).to_string_lossy().into_owned();
                glob::glob(&full)
                    .map(|paths| paths.flatten().collect::<Vec<_>>())
                    .unwrap_or_else(|e| {
                        log::warn!("invalid asset pattern '{}': {}", pattern, e);
                        Vec::new()
                    })
            })
            .filter(|p| p.is_file())
            .collect()
    }
}

/// Strip the `{?name,label}` URI template suffix GitHub appends
fn upload_endpoint(upload_url: &str) -> &str {
    upload_url.split('{').next().unwrap_or(upload_url)
}

impl ReleaseHost for GitHubReleaser {
    async fn release(&mut self, request: ReleaseRequest<'_>, ctx: &ReleaseContext) -> Result<bool> {
        let remote = request.remote_url.unwrap_or_default();
        let slug = RepoSlug::parse(remote).ok_or_else(|| HostingError::UnknownRepository {
            remote: remote.to_string(),
        })?;
        let name = ctx.render(&self.options.release_name);
        let prerelease = self.options.pre_release || request.is_pre_release;

        if self.dry_run {
            log::info!("[dry run] create GitHub release {} on {}", request.tag_name, slug.project());
            self.output.exec(
                &format!("POST {} ({})", self.releases_endpoint(&slug), request.tag_name),
                true,
            );
            return Ok(false);
        }

        let body = CreateRelease {
            tag_name: request.tag_name,
            name: &name,
            body: request.changelog,
            draft: self.options.draft,
            prerelease,
        };
        log::debug!("creating GitHub release {:?} for {}", body, slug.project());

        let response = self
            .http
            .post(self.releases_endpoint(&slug))
            .header(AUTHORIZATION, self.auth()?)
            .json(&body)
            .send()
            .await;
        let created: CreatedRelease = Self::check("create release", response).await?;

        log::info!("created release {} ({})", created.id, created.html_url);
        self.output.success(&created.html_url);
        self.created = Some(created);
        Ok(true)
    }

    async fn upload_assets(&mut self, shell: &Shell) -> Result<usize> {
        if self.options.assets.is_empty() {
            return Ok(0);
        }
        let paths = self.asset_paths(&shell.cwd());
        if paths.is_empty() {
            log::warn!("no files match the release assets {:?}", self.options.assets);
            return Ok(0);
        }

        if self.dry_run {
            for path in &paths {
                self.output.exec(&format!("upload {}", path.display()), true);
            }
            return Ok(0);
        }

        let Some(created) = self.created.clone() else {
            log::warn!("no release was created, skipping asset upload");
            return Ok(0);
        };
        let endpoint = upload_endpoint(&created.upload_url);
        let auth = self.auth()?;

        let mut uploaded = 0;
        for path in paths {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(String::from) else {
                continue;
            };
            let content = Bytes::from(tokio::fs::read(&path).await?);
            let response = self
                .http
                .post(endpoint)
                .query(&[("name", file_name.as_str())])
                .header(AUTHORIZATION, auth.clone())
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(content)
                .send()
                .await;
            let asset: UploadedAsset = Self::check("upload asset", response).await?;
            self.output.indent(&format!("✓ Uploaded: {}", asset.name));
            self.asset_urls.push(asset.browser_download_url);
            uploaded += 1;
        }
        Ok(uploaded)
    }

    async fn get_notes(&self, shell: &Shell, ctx: &ReleaseContext) -> Result<Option<String>> {
        match &self.options.release_notes {
            Some(command) if !command.trim().is_empty() => {
                let notes = shell.exec(command.as_str(), ExecOptions::READ, ctx).await?;
                Ok(notes.filter(|n| !n.is_empty()))
            }
            _ => Ok(None),
        }
    }

    fn get_release_url(&self) -> Option<&str> {
        self.created.as_ref().map(|r| r.html_url.as_str())
    }

    fn is_released(&self) -> bool {
        self.created.is_some()
    }
}

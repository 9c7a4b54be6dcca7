//! Release configuration.
//!
//! [`ReleaseOptions`] is the single options object the pipeline consumes. It is
//! assembled once at start-up by [`ReleaseOptions::load`] (defaults, global
//! file, project file), then the CLI layers flags and environment on top and
//! calls [`ReleaseOptions::validate`] before anything touches the repository.

mod loader;

pub use loader::{CONFIG_FILE_NAME, GLOBAL_CONFIG_DIR};

use crate::error::{ConfigError, Result};
use crate::version::IncrementSpec;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// All options recognized by the release pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ReleaseOptions {
    /// Package name (read from the first manifest when unset)
    pub name: Option<String>,
    /// Increment token (`major`, `minor`, ...) or literal version
    pub increment: Option<String>,
    /// Pre-release channel (`true` or a channel id such as `beta`)
    pub pre_release: Option<PreReleaseSetting>,
    /// Pre-release identifier (`alpha`, `beta`, `rc`)
    pub pre_release_id: Option<String>,
    /// Source of the currently released version
    #[serde(rename = "use")]
    pub use_source: Option<VersionSource>,
    /// Derive the increment from conventional commits when none is given
    pub recommend: bool,
    /// Accept a new version that is not greater than the latest one
    pub disable_version_check: bool,
    /// Log mutating commands without executing them
    pub dry_run: bool,
    /// Echo commands and their output
    pub verbose: bool,
    /// Run without prompts
    pub ci: bool,
    /// Manifest files whose version field is bumped
    pub pkg_files: Vec<String>,
    /// Repository client options
    pub git: GitOptions,
    /// Lifecycle hook commands
    pub hooks: HooksOptions,
    /// Remote release options
    pub github: GitHubOptions,
    /// Package registry options
    pub registry: RegistryOptions,
    /// Secondary distribution repository
    pub dist: DistOptions,
}

impl Default for ReleaseOptions {
    fn default() -> Self {
        Self {
            name: None,
            increment: None,
            pre_release: None,
            pre_release_id: None,
            use_source: None,
            recommend: false,
            disable_version_check: false,
            dry_run: false,
            verbose: false,
            ci: false,
            pkg_files: vec!["Cargo.toml".to_string()],
            git: GitOptions::default(),
            hooks: HooksOptions::default(),
            github: GitHubOptions::default(),
            registry: RegistryOptions::default(),
            dist: DistOptions::default(),
        }
    }
}

/// Repository client options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct GitOptions {
    /// Commit log command; `[REV_RANGE]` expands to `<latestTag>..HEAD`
    pub changelog: String,
    pub require_clean_working_dir: bool,
    pub require_upstream: bool,
    pub require_branch: Option<String>,
    /// At least one commit since the latest tag
    pub require_commits: bool,
    pub require_root_dir: bool,
    /// Probe the push target with `git push --dry-run` during validation
    pub require_push_permission: bool,
    /// Fail the commit stage when nothing is staged
    pub require_non_empty_commit: bool,
    /// Stage untracked files too (`git add --all`)
    pub add_untracked_files: bool,
    pub commit: bool,
    pub commit_message: String,
    pub commit_args: Vec<String>,
    pub tag: bool,
    pub tag_name: String,
    /// Prefix stripped from tags when reading the latest version
    pub tag_prefix: Option<String>,
    /// Glob passed to `git describe --match`
    pub tag_match: Option<String>,
    pub tag_annotation: String,
    pub tag_args: Vec<String>,
    pub push: bool,
    pub push_args: Vec<String>,
    /// Remote name or URL to push to
    pub push_repo: String,
}

impl Default for GitOptions {
    fn default() -> Self {
        Self {
            changelog: "git log --pretty=format:\"* %s (%h)\" [REV_RANGE]".to_string(),
            require_clean_working_dir: true,
            require_upstream: true,
            require_branch: None,
            require_commits: false,
            require_root_dir: false,
            require_push_permission: false,
            require_non_empty_commit: false,
            add_untracked_files: false,
            commit: true,
            commit_message: "Release ${version}".to_string(),
            commit_args: Vec::new(),
            tag: true,
            tag_name: "v${version}".to_string(),
            tag_prefix: None,
            tag_match: None,
            tag_annotation: "Release ${version}".to_string(),
            tag_args: Vec::new(),
            push: true,
            push_args: vec!["--follow-tags".to_string()],
            push_repo: "origin".to_string(),
        }
    }
}

impl GitOptions {
    /// Prefix of release tags: `tagPrefix` when set, otherwise the literal
    /// text in front of `${version}` in the tag name template
    pub fn tag_prefix(&self) -> &str {
        if let Some(prefix) = self.tag_prefix.as_deref() {
            return prefix;
        }
        match self.tag_name.find("${version}") {
            Some(idx) if !self.tag_name[..idx].contains("${") => &self.tag_name[..idx],
            _ => "",
        }
    }
}

/// Lifecycle hooks. Each accepts a single command or a list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct HooksOptions {
    #[serde(deserialize_with = "one_or_many")]
    pub before_start: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub before_bump: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub after_bump: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub before_stage: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub after_release: Vec<String>,
}

/// Remote release options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct GitHubOptions {
    pub release: bool,
    pub release_name: String,
    /// Command whose output replaces the changelog as release body
    pub release_notes: Option<String>,
    pub draft: bool,
    /// Force the prerelease flag even for regular versions
    pub pre_release: bool,
    /// Environment variable holding the API token
    pub token_ref: String,
    /// API base URL
    pub host: String,
    /// Glob patterns of files uploaded to the release
    pub assets: Vec<String>,
    /// Request timeout in seconds
    pub timeout: u64,
}

impl Default for GitHubOptions {
    fn default() -> Self {
        Self {
            release: false,
            release_name: "Release ${version}".to_string(),
            release_notes: None,
            draft: false,
            pre_release: false,
            token_ref: "GITHUB_TOKEN".to_string(),
            host: "https://api.github.com".to_string(),
            assets: Vec::new(),
            timeout: 30,
        }
    }
}

/// Package registry options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct RegistryOptions {
    pub publish: bool,
    pub publish_command: String,
    pub package_url: Option<String>,
    /// Distribution tag used for pre-releases
    pub tag: Option<String>,
    /// Ask for a one-time password when the registry requires one
    pub otp_prompt: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            publish: false,
            publish_command: "cargo publish".to_string(),
            package_url: Some("https://crates.io/crates/${name}".to_string()),
            tag: None,
            otp_prompt: true,
        }
    }
}

/// Secondary distribution repository. `git`, `github`, `registry` and `hooks`
/// are partial tables layered over the respective defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct DistOptions {
    pub repo: Option<String>,
    pub stage_dir: PathBuf,
    pub base_dir: PathBuf,
    pub files: Vec<String>,
    pub pkg_files: Option<Vec<String>>,
    pub git: serde_json::Value,
    pub github: serde_json::Value,
    pub registry: serde_json::Value,
    pub hooks: serde_json::Value,
}

impl Default for DistOptions {
    fn default() -> Self {
        Self {
            repo: None,
            stage_dir: PathBuf::from(".stage"),
            base_dir: PathBuf::from("dist"),
            files: vec!["**/*".to_string()],
            pkg_files: None,
            git: serde_json::Value::Null,
            github: serde_json::Value::Null,
            registry: serde_json::Value::Null,
            hooks: serde_json::Value::Null,
        }
    }
}

/// Pre-release setting: `preRelease = true` or `preRelease = "beta"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreReleaseSetting {
    Enabled(bool),
    Channel(String),
}

/// Where the currently released version is read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VersionSource {
    /// Latest git tag
    GitTag,
    /// Version field of the first manifest
    PkgVersion,
    /// Explicit version
    Literal(String),
}

impl FromStr for VersionSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "git.tag" => Ok(Self::GitTag),
            "pkg.version" => Ok(Self::PkgVersion),
            other if semver::Version::parse(other.trim_start_matches('v')).is_ok() => {
                Ok(Self::Literal(other.to_string()))
            }
            other => Err(ConfigError::InvalidOption {
                option: "use".to_string(),
                reason: format!(
                    "expected 'git.tag', 'pkg.version' or a version, got '{}'",
                    other
                ),
            }),
        }
    }
}

impl TryFrom<String> for VersionSource {
    type Error = ConfigError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionSource> for String {
    fn from(source: VersionSource) -> Self {
        source.to_string()
    }
}

impl fmt::Display for VersionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GitTag => write!(f, "git.tag"),
            Self::PkgVersion => write!(f, "pkg.version"),
            Self::Literal(v) => write!(f, "{}", v),
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(cmd) if cmd.trim().is_empty() => Vec::new(),
        OneOrMany::One(cmd) => vec![cmd],
        OneOrMany::Many(cmds) => cmds,
    })
}

impl ReleaseOptions {
    /// Whether stages are gated behind confirmations
    pub fn is_interactive(&self) -> bool {
        !self.ci
    }

    /// Pre-release channel implied by `preRelease` / `preReleaseId`
    pub fn pre_release_channel(&self) -> Option<String> {
        match &self.pre_release {
            Some(PreReleaseSetting::Channel(id)) => Some(id.clone()),
            Some(PreReleaseSetting::Enabled(true)) => {
                Some(self.pre_release_id.clone().unwrap_or_default())
            }
            Some(PreReleaseSetting::Enabled(false)) => None,
            None if self.has_pre_increment() => self.pre_release_id.clone(),
            None => None,
        }
    }

    /// Whether `increment` is one of the `pre*` tokens
    fn has_pre_increment(&self) -> bool {
        matches!(
            self.increment.as_deref().map(str::parse::<IncrementSpec>),
            Some(Ok(IncrementSpec::Token(token))) if token.is_pre()
        )
    }

    /// Whether a distribution pass is configured
    pub fn has_dist(&self) -> bool {
        self.dist.repo.is_some()
    }

    /// Whether the distribution repository names its tags explicitly
    pub fn dist_tag_explicit(&self) -> bool {
        self.dist
            .git
            .as_object()
            .is_some_and(|git| git.contains_key("tagName") || git.contains_key("tagAnnotation"))
    }

    /// Options for the distribution pass: primary `git` options with the
    /// `dist.git` table layered on top; `github`, `registry` and `hooks` start
    /// from defaults so primary hooks and publishes never run twice.
    ///
    /// Files copied into the checkout are new to it, so untracked files are
    /// staged unless `dist.git` says otherwise.
    pub fn for_distribution(&self) -> Result<ReleaseOptions> {
        let mut dist = self.clone();
        let git = GitOptions {
            add_untracked_files: true,
            ..self.git.clone()
        };
        dist.git = overlay(&git, &self.dist.git, "dist.git")?;
        dist.github = overlay(&GitHubOptions::default(), &self.dist.github, "dist.github")?;
        dist.registry = overlay(
            &RegistryOptions::default(),
            &self.dist.registry,
            "dist.registry",
        )?;
        dist.hooks = overlay(&HooksOptions::default(), &self.dist.hooks, "dist.hooks")?;
        dist.pkg_files = self.dist.pkg_files.clone().unwrap_or_default();
        Ok(dist)
    }

    /// Validate the merged options once, before any mutation
    pub fn validate(&self) -> Result<()> {
        if let Some(ref increment) = self.increment {
            increment
                .parse::<IncrementSpec>()
                .map_err(|_| ConfigError::InvalidOption {
                    option: "increment".to_string(),
                    reason: format!(
                        "'{}' is neither an increment (major, minor, patch, premajor, preminor, prepatch, prerelease) nor a version",
                        increment
                    ),
                })?;
        }

        if self.pre_release_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(ConfigError::InvalidOption {
                option: "preReleaseId".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        let pre_release_requested = matches!(
            self.pre_release,
            Some(PreReleaseSetting::Enabled(true) | PreReleaseSetting::Channel(_))
        );
        if self.pre_release_id.is_some() && !pre_release_requested && !self.has_pre_increment() {
            return Err(ConfigError::InvalidOption {
                option: "preReleaseId".to_string(),
                reason: "requires preRelease or a pre-release increment (premajor, preminor, prepatch, prerelease)"
                    .to_string(),
            }
            .into());
        }

        if self.git.push_repo.trim().is_empty() {
            return Err(ConfigError::MissingOption {
                option: "git.pushRepo".to_string(),
            }
            .into());
        }

        if !self.git.tag_name.contains("${version}") {
            return Err(ConfigError::InvalidOption {
                option: "git.tagName".to_string(),
                reason: "must contain ${version}".to_string(),
            }
            .into());
        }

        if self.pkg_files.iter().any(|f| f.trim().is_empty()) {
            return Err(ConfigError::InvalidOption {
                option: "pkgFiles".to_string(),
                reason: "empty path".to_string(),
            }
            .into());
        }

        if self.has_dist() {
            if self.dist.stage_dir.as_os_str().is_empty() {
                return Err(ConfigError::MissingOption {
                    option: "dist.stageDir".to_string(),
                }
                .into());
            }
            // Unknown keys in the partial tables fail here
            self.for_distribution()?;
        }

        Ok(())
    }
}

/// Layer a partial JSON table over `base`, rejecting unknown keys.
fn overlay<T>(base: &T, partial: &serde_json::Value, option: &str) -> Result<T>
where
    T: Serialize + serde::de::DeserializeOwned,
{
    let mut merged = serde_json::to_value(base)?;
    match partial {
        serde_json::Value::Null => {}
        serde_json::Value::Object(fields) => {
            if let Some(target) = merged.as_object_mut() {
                for (key, value) in fields {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        _ => {
            return Err(ConfigError::InvalidOption {
                option: option.to_string(),
                reason: "expected a table".to_string(),
            }
            .into());
        }
    }

    serde_json::from_value(merged).map_err(|e| {
        ConfigError::InvalidOption {
            option: option.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let options = ReleaseOptions::default();
        assert!(options.validate().is_ok());
        assert!(options.is_interactive());
        assert_eq!(options.git.tag_prefix(), "v");
    }

    #[test]
    fn test_tag_prefix_from_template() {
        let mut git = GitOptions::default();
        git.tag_name = "${version}".to_string();
        assert_eq!(git.tag_prefix(), "");
        git.tag_name = "release-${version}".to_string();
        assert_eq!(git.tag_prefix(), "release-");
        git.tag_name = "${name}@${version}".to_string();
        assert_eq!(git.tag_prefix(), "");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let parsed: std::result::Result<ReleaseOptions, _> =
            toml::from_str("increment = \"patch\"\nbogus = true\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_hooks_accept_one_or_many() {
        let options: ReleaseOptions = toml::from_str(
            r#"
[hooks]
beforeBump = "cargo test"
afterRelease = ["echo one", "echo two"]
"#,
        )
        .unwrap();
        assert_eq!(options.hooks.before_bump, vec!["cargo test"]);
        assert_eq!(options.hooks.after_release.len(), 2);
        assert!(options.hooks.before_start.is_empty());
    }

    #[test]
    fn test_invalid_increment_rejected() {
        let options = ReleaseOptions {
            increment: Some("sideways".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(crate::ReleaseError::Config(ConfigError::InvalidOption { .. }))
        ));
    }

    #[test]
    fn test_pre_release_channel() {
        let mut options = ReleaseOptions {
            pre_release: Some(PreReleaseSetting::Channel("beta".to_string())),
            ..Default::default()
        };
        assert_eq!(options.pre_release_channel().as_deref(), Some("beta"));

        options.pre_release = Some(PreReleaseSetting::Enabled(true));
        options.pre_release_id = Some("rc".to_string());
        assert_eq!(options.pre_release_channel().as_deref(), Some("rc"));

        options.pre_release = Some(PreReleaseSetting::Enabled(false));
        assert_eq!(options.pre_release_channel(), None);

        options.pre_release = None;
        options.increment = Some("preminor".to_string());
        assert_eq!(options.pre_release_channel().as_deref(), Some("rc"));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_pre_release_id_requires_pre_release() {
        let options = ReleaseOptions {
            increment: Some("patch".to_string()),
            pre_release_id: Some("beta".to_string()),
            ..Default::default()
        };
        assert_eq!(options.pre_release_channel(), None);
        assert!(matches!(
            options.validate(),
            Err(crate::ReleaseError::Config(ConfigError::InvalidOption { ref option, .. }))
                if option == "preReleaseId"
        ));

        let disabled = ReleaseOptions {
            pre_release: Some(PreReleaseSetting::Enabled(false)),
            ..options.clone()
        };
        assert!(disabled.validate().is_err());

        let enabled = ReleaseOptions {
            pre_release: Some(PreReleaseSetting::Enabled(true)),
            ..options
        };
        assert!(enabled.validate().is_ok());
    }

    #[test]
    fn test_explicit_tag_prefix() {
        let options: ReleaseOptions = toml::from_str("[git]\ntagPrefix = \"release-\"\n").unwrap();
        assert_eq!(options.git.tag_prefix(), "release-");
        assert_eq!(options.git.tag_name, "v${version}");

        let mut resolver = crate::version::VersionResolver::new(options.git.tag_prefix(), false);
        let latest = resolver.set_latest_version(crate::version::LatestVersionSources {
            git_tag: Some("release-1.2.3"),
            ..Default::default()
        });
        assert_eq!(latest, "1.2.3");
    }

    #[test]
    fn test_version_source_parsing() {
        assert_eq!("git.tag".parse::<VersionSource>().unwrap(), VersionSource::GitTag);
        assert_eq!(
            "pkg.version".parse::<VersionSource>().unwrap(),
            VersionSource::PkgVersion
        );
        assert_eq!(
            "1.0.0".parse::<VersionSource>().unwrap(),
            VersionSource::Literal("1.0.0".to_string())
        );
        assert!("nonsense".parse::<VersionSource>().is_err());
    }

    #[test]
    fn test_for_distribution_layers_git_and_resets_hooks() {
        let options: ReleaseOptions = toml::from_str(
            r#"
[hooks]
beforeBump = "make"

[git]
pushRepo = "upstream"

[dist]
repo = "git@example.com:org/dist.git"

[dist.git]
commitMessage = "Dist ${version}"

[dist.hooks]
beforeStage = "ls"
"#,
        )
        .unwrap();
        assert!(options.validate().is_ok());
        assert!(!options.dist_tag_explicit());

        let dist = options.for_distribution().unwrap();
        assert_eq!(dist.git.commit_message, "Dist ${version}");
        assert_eq!(dist.git.push_repo, "upstream");
        assert!(dist.hooks.before_bump.is_empty());
        assert_eq!(dist.hooks.before_stage, vec!["ls"]);
        assert!(dist.pkg_files.is_empty());
        assert!(dist.git.add_untracked_files);
    }

    #[test]
    fn test_for_distribution_rejects_unknown_keys() {
        let options: ReleaseOptions = toml::from_str(
            r#"
[dist]
repo = "git@example.com:org/dist.git"

[dist.git]
pushRepoo = "typo"
"#,
        )
        .unwrap();
        assert!(options.validate().is_err());
    }
}

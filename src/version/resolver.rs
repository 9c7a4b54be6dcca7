//! Version resolution state machine.

use super::{Increment, VersionComputer};
use crate::config::VersionSource;
use crate::error::{Result, VersionError};
use semver::Version;
use std::fmt;
use std::str::FromStr;

/// Increment option: a token or a literal target version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncrementSpec {
    Token(Increment),
    Literal(Version),
}

impl FromStr for IncrementSpec {
    type Err = VersionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(token) = s.parse::<Increment>() {
            return Ok(IncrementSpec::Token(token));
        }
        Version::parse(s.strip_prefix('v').unwrap_or(s))
            .map(IncrementSpec::Literal)
            .map_err(|_| VersionError::UnknownIncrement {
                increment: s.to_string(),
            })
    }
}

impl fmt::Display for IncrementSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncrementSpec::Token(token) => write!(f, "{}", token),
            IncrementSpec::Literal(version) => write!(f, "{}", version),
        }
    }
}

/// Resolver lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Uninitialized,
    LatestKnown,
    Decided,
    Validated,
}

/// When the changelog is generated relative to the manifest bump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangelogTiming {
    /// Before the bump: the recommendation and the changelog read the same
    /// commit range
    Early,
    /// After the bump
    Late,
}

/// Outcome of version resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionDecision {
    pub latest_version: String,
    pub increment: Option<Increment>,
    pub pre_release_id: Option<String>,
    /// `None` until decided
    pub version: Option<String>,
    pub is_pre_release: bool,
    pub is_recommendation: bool,
}

/// Inputs for [`VersionResolver::set_latest_version`]
#[derive(Debug, Clone, Default)]
pub struct LatestVersionSources<'a> {
    /// Explicit `use` override
    pub use_source: Option<&'a VersionSource>,
    /// Latest git tag
    pub git_tag: Option<&'a str>,
    /// Version field of the first manifest
    pub pkg_version: Option<&'a str>,
    /// Running from the manifest's root directory
    pub is_root_dir: bool,
}

/// Pre-release request: `None` for a regular release, `Some("")` for
/// numeric pre-releases, `Some(id)` for a named channel
pub type PreReleaseRequest<'a> = Option<&'a str>;

/// Determines the current and the next version.
///
/// `uninitialized → latest-known → decided → validated`
#[derive(Debug, Clone)]
pub struct VersionResolver {
    state: ResolverState,
    decision: VersionDecision,
    tag_prefix: String,
    disable_version_check: bool,
}

impl VersionResolver {
    pub fn new(tag_prefix: impl Into<String>, disable_version_check: bool) -> Self {
        Self {
            state: ResolverState::Uninitialized,
            decision: VersionDecision::default(),
            tag_prefix: tag_prefix.into(),
            disable_version_check,
        }
    }

    pub fn state(&self) -> ResolverState {
        self.state
    }

    pub fn decision(&self) -> &VersionDecision {
        &self.decision
    }

    /// Latest released version
    pub fn latest_version(&self) -> &str {
        &self.decision.latest_version
    }

    /// Changelog before or after the bump
    pub fn changelog_timing(&self) -> ChangelogTiming {
        if self.decision.is_recommendation {
            ChangelogTiming::Early
        } else {
            ChangelogTiming::Late
        }
    }

    /// Pick the current version: `use` override, then the manifest version
    /// (only from the manifest's root directory), then the latest tag, then
    /// `0.0.0`. A tag prefix is stripped.
    pub fn set_latest_version(&mut self, sources: LatestVersionSources<'_>) -> &str {
        let from_tag = sources.git_tag.and_then(|tag| self.parse_tag(tag));
        let from_pkg = sources
            .pkg_version
            .filter(|_| sources.is_root_dir)
            .and_then(|v| self.parse_tag(v));

        let chosen = match sources.use_source {
            Some(VersionSource::Literal(v)) => self.parse_tag(v),
            Some(VersionSource::GitTag) => from_tag,
            Some(VersionSource::PkgVersion) => from_pkg,
            None => from_pkg.or(from_tag),
        };

        let latest = chosen.unwrap_or_else(|| Version::new(0, 0, 0));
        log::debug!("latest version: {}", latest);
        self.decision.latest_version = latest.to_string();
        self.state = ResolverState::LatestKnown;
        &self.decision.latest_version
    }

    fn parse_tag(&self, raw: &str) -> Option<Version> {
        let raw = raw.trim();
        let stripped = raw.strip_prefix(self.tag_prefix.as_str()).unwrap_or(raw);
        let parsed = Version::parse(stripped)
            .or_else(|_| Version::parse(stripped.trim_start_matches('v')))
            .ok();
        if parsed.is_none() {
            log::warn!("ignoring '{}': not a semantic version", raw);
        }
        parsed
    }

    fn latest(&self) -> Result<Version> {
        Version::parse(&self.decision.latest_version).map_err(|source| {
            VersionError::ParseFailed {
                version: self.decision.latest_version.clone(),
                source,
            }
            .into()
        })
    }

    /// Decide the next version.
    ///
    /// An explicit increment wins. Without one, a `recommended` increment is
    /// used and flagged as a recommendation. A pre-release request promotes
    /// `major|minor|patch` to their `pre*` forms (or to `prerelease` when the
    /// latest version already is one). With no increment, no recommendation
    /// and no pre-release request the version stays undecided.
    pub fn bump(
        &mut self,
        increment: Option<&IncrementSpec>,
        pre_release: PreReleaseRequest<'_>,
        recommended: Option<Increment>,
    ) -> Result<Option<&str>> {
        let latest = self.latest()?;
        let pre_id = pre_release.filter(|id| !id.is_empty()).map(String::from);

        let (token, is_recommendation) = match increment {
            Some(IncrementSpec::Literal(version)) => {
                self.decide(version.clone(), None, false, pre_id);
                return Ok(self.decision.version.as_deref());
            }
            Some(IncrementSpec::Token(token)) => (Some(*token), false),
            None => match recommended {
                Some(token) => (Some(token), true),
                None => (None, false),
            },
        };

        let token = match (token, pre_release) {
            (Some(token), Some(_)) if !token.is_pre() => Some(if latest.pre.is_empty() {
                token.to_pre()
            } else {
                Increment::Prerelease
            }),
            (None, Some(_)) => Some(if latest.pre.is_empty() {
                Increment::Prepatch
            } else {
                Increment::Prerelease
            }),
            (token, _) => token,
        };

        let Some(token) = token else {
            log::debug!("no increment given or recommended, version undecided");
            return Ok(None);
        };

        let next = VersionComputer::increment(&latest, token, pre_id.as_deref())?;
        self.decide(next, Some(token), is_recommendation, pre_id);
        Ok(self.decision.version.as_deref())
    }

    /// Candidate versions for interactive selection
    pub fn candidates(&self, pre_id: Option<&str>) -> Vec<(Increment, Version)> {
        let Ok(latest) = self.latest() else {
            return Vec::new();
        };
        Increment::ALL
            .iter()
            .filter_map(|token| {
                VersionComputer::increment(&latest, *token, pre_id)
                    .ok()
                    .map(|version| (*token, version))
            })
            .collect()
    }

    /// Record an interactively chosen version
    pub fn choose(&mut self, increment: Option<Increment>, version: Version) {
        let pre_id = self.decision.pre_release_id.clone();
        self.decide(version, increment, false, pre_id);
    }

    fn decide(
        &mut self,
        version: Version,
        increment: Option<Increment>,
        is_recommendation: bool,
        pre_release_id: Option<String>,
    ) {
        log::debug!(
            "next version: {} (increment: {:?}, recommended: {})",
            version,
            increment,
            is_recommendation
        );
        self.decision.is_pre_release = !version.pre.is_empty();
        self.decision.version = Some(version.to_string());
        self.decision.increment = increment;
        self.decision.is_recommendation = is_recommendation;
        self.decision.pre_release_id = pre_release_id;
        self.state = ResolverState::Decided;
    }

    /// Ensure a usable version exists before mutations run
    pub fn validate(&mut self) -> Result<&str> {
        let Some(raw) = self.decision.version.clone() else {
            return Err(VersionError::Invalid {
                version: String::new(),
                reason: "no version was decided".to_string(),
            }
            .into());
        };

        let version = Version::parse(&raw).map_err(|source| VersionError::ParseFailed {
            version: raw.clone(),
            source,
        })?;

        if !self.disable_version_check {
            let latest = self.latest()?;
            if version <= latest {
                return Err(VersionError::Invalid {
                    version: raw,
                    reason: format!("must be greater than the latest version {}", latest),
                }
                .into());
            }
        }

        self.state = ResolverState::Validated;
        Ok(self.decision.version.as_deref().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(latest: &str) -> VersionResolver {
        let mut resolver = VersionResolver::new("v", false);
        resolver.set_latest_version(LatestVersionSources {
            git_tag: Some(latest),
            ..Default::default()
        });
        resolver
    }

    fn token(s: &str) -> IncrementSpec {
        s.parse().unwrap()
    }

    #[test]
    fn test_latest_version_priority() {
        let mut r = VersionResolver::new("v", false);
        assert_eq!(r.set_latest_version(LatestVersionSources::default()), "0.0.0");

        let sources = LatestVersionSources {
            git_tag: Some("v1.0.0"),
            pkg_version: Some("1.1.0"),
            is_root_dir: true,
            ..Default::default()
        };
        assert_eq!(r.set_latest_version(sources.clone()), "1.1.0");

        let outside_root = LatestVersionSources {
            is_root_dir: false,
            ..sources.clone()
        };
        assert_eq!(r.set_latest_version(outside_root), "1.0.0");

        let tag_source = VersionSource::GitTag;
        let forced = LatestVersionSources {
            use_source: Some(&tag_source),
            ..sources.clone()
        };
        assert_eq!(r.set_latest_version(forced), "1.0.0");

        let literal = VersionSource::Literal("3.0.0".to_string());
        let forced = LatestVersionSources {
            use_source: Some(&literal),
            ..sources
        };
        assert_eq!(r.set_latest_version(forced), "3.0.0");
        assert_eq!(r.state(), ResolverState::LatestKnown);
    }

    #[test]
    fn test_unprefixed_tag_is_accepted() {
        let r = resolver("1.2.3");
        assert_eq!(r.latest_version(), "1.2.3");
    }

    #[test]
    fn test_explicit_increment() {
        let mut r = resolver("v1.2.3");
        assert_eq!(r.bump(Some(&token("minor")), None, None).unwrap(), Some("1.3.0"));
        assert!(!r.decision().is_recommendation);
        assert_eq!(r.changelog_timing(), ChangelogTiming::Late);
        assert_eq!(r.validate().unwrap(), "1.3.0");
        assert_eq!(r.state(), ResolverState::Validated);
    }

    #[test]
    fn test_recommendation_is_early() {
        let mut r = resolver("v1.2.3");
        assert_eq!(r.bump(None, None, Some(Increment::Major)).unwrap(), Some("2.0.0"));
        assert!(r.decision().is_recommendation);
        assert_eq!(r.changelog_timing(), ChangelogTiming::Early);
    }

    #[test]
    fn test_explicit_increment_beats_recommendation() {
        let mut r = resolver("v1.2.3");
        r.bump(Some(&token("patch")), None, Some(Increment::Major)).unwrap();
        assert_eq!(r.decision().version.as_deref(), Some("1.2.4"));
        assert!(!r.decision().is_recommendation);
    }

    #[test]
    fn test_undecided_leaves_version_empty() {
        let mut r = resolver("v1.2.3");
        assert_eq!(r.bump(None, None, None).unwrap(), None);
        assert_eq!(r.state(), ResolverState::LatestKnown);
        assert!(matches!(
            r.validate(),
            Err(crate::ReleaseError::Version(VersionError::Invalid { .. }))
        ));
    }

    #[test]
    fn test_pre_release_channel() {
        let mut r = resolver("v1.2.3");
        assert_eq!(r.bump(Some(&token("minor")), Some("beta"), None).unwrap(), Some("1.3.0-beta.0"));
        assert!(r.decision().is_pre_release);
        assert_eq!(r.decision().increment, Some(Increment::Preminor));

        let mut r = resolver("v1.3.0-beta.0");
        assert_eq!(r.bump(None, Some("beta"), None).unwrap(), Some("1.3.0-beta.1"));

        let mut r = resolver("v1.2.3");
        assert_eq!(r.bump(None, Some(""), None).unwrap(), Some("1.2.4-0"));
    }

    #[test]
    fn test_literal_version() {
        let mut r = resolver("v1.2.3");
        assert_eq!(r.bump(Some(&token("v2.0.0")), None, None).unwrap(), Some("2.0.0"));
        assert_eq!(r.decision().increment, None);
    }

    #[test]
    fn test_version_must_increase() {
        let mut r = resolver("v1.2.3");
        r.bump(Some(&token("1.0.0")), None, None).unwrap();
        assert!(r.validate().is_err());

        let mut lenient = VersionResolver::new("v", true);
        lenient.set_latest_version(LatestVersionSources {
            git_tag: Some("v1.2.3"),
            ..Default::default()
        });
        lenient.bump(Some(&token("1.0.0")), None, None).unwrap();
        assert!(lenient.validate().is_ok());
    }

    #[test]
    fn test_candidates_and_choice() {
        let mut r = resolver("v0.9.0");
        let candidates = r.candidates(None);
        assert_eq!(candidates.len(), Increment::ALL.len());
        assert_eq!(candidates[0], (Increment::Patch, Version::new(0, 9, 1)));

        r.choose(Some(Increment::Minor), Version::new(0, 10, 0));
        assert_eq!(r.validate().unwrap(), "0.10.0");
    }

    #[test]
    fn test_increment_spec_parsing() {
        assert_eq!(token("major"), IncrementSpec::Token(Increment::Major));
        assert_eq!(token("1.0.0-rc.1").to_string(), "1.0.0-rc.1");
        assert!("bigger".parse::<IncrementSpec>().is_err());
    }
}

//! Increment recommendation from conventional commits.

use super::Increment;
use regex::Regex;
use std::sync::LazyLock;

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<type>[A-Za-z]+)(?:\([^)]*\))?(?P<breaking>!)?:\s").expect("header regex is valid")
});

static BREAKING_FOOTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^BREAKING[ -]CHANGE:").expect("footer regex is valid")
});

/// Kind of change a single commit carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangeLevel {
    Patch,
    Feature,
    Breaking,
}

/// Derives an increment from the commit messages since the latest release.
///
/// Breaking changes (`type!:` headers or a `BREAKING CHANGE:` footer) give
/// `major`, `feat` commits give `minor`, anything else gives `patch`. No
/// commits means no recommendation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    /// Classify one full commit message (header plus body)
    pub fn classify(message: &str) -> ChangeLevel {
        let message = message.trim();
        if BREAKING_FOOTER_RE.is_match(message) {
            return ChangeLevel::Breaking;
        }
        let header = message.lines().next().unwrap_or_default();
        match HEADER_RE.captures(header) {
            Some(caps) if caps.name("breaking").is_some() => ChangeLevel::Breaking,
            Some(caps) if caps["type"].eq_ignore_ascii_case("feat") => ChangeLevel::Feature,
            _ => ChangeLevel::Patch,
        }
    }

    /// Recommended increment for a set of commit messages
    pub fn recommend<S: AsRef<str>>(messages: &[S]) -> Option<Increment> {
        let level = messages
            .iter()
            .filter(|m| !m.as_ref().trim().is_empty())
            .map(|m| Self::classify(m.as_ref()))
            .max()?;

        Some(match level {
            ChangeLevel::Breaking => Increment::Major,
            ChangeLevel::Feature => Increment::Minor,
            ChangeLevel::Patch => Increment::Patch,
        })
    }
}

//! Semantic version increments.

use crate::error::{Result, VersionError};
use semver::{Prerelease, Version};
use std::fmt;
use std::str::FromStr;

/// Increment token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Increment {
    Major,
    Minor,
    Patch,
    Premajor,
    Preminor,
    Prepatch,
    Prerelease,
}

impl Increment {
    /// Every token, in prompt order
    pub const ALL: [Increment; 7] = [
        Increment::Patch,
        Increment::Minor,
        Increment::Major,
        Increment::Prepatch,
        Increment::Preminor,
        Increment::Premajor,
        Increment::Prerelease,
    ];

    /// Whether the increment produces a pre-release
    pub fn is_pre(self) -> bool {
        matches!(
            self,
            Increment::Premajor | Increment::Preminor | Increment::Prepatch | Increment::Prerelease
        )
    }

    /// Pre-release counterpart of a regular increment
    pub fn to_pre(self) -> Increment {
        match self {
            Increment::Major => Increment::Premajor,
            Increment::Minor => Increment::Preminor,
            Increment::Patch => Increment::Prepatch,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Increment::Major => "major",
            Increment::Minor => "minor",
            Increment::Patch => "patch",
            Increment::Premajor => "premajor",
            Increment::Preminor => "preminor",
            Increment::Prepatch => "prepatch",
            Increment::Prerelease => "prerelease",
        }
    }
}

impl fmt::Display for Increment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Increment {
    type Err = VersionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "major" => Ok(Increment::Major),
            "minor" => Ok(Increment::Minor),
            "patch" => Ok(Increment::Patch),
            "premajor" => Ok(Increment::Premajor),
            "preminor" => Ok(Increment::Preminor),
            "prepatch" => Ok(Increment::Prepatch),
            "prerelease" | "pre" => Ok(Increment::Prerelease),
            _ => Err(VersionError::UnknownIncrement {
                increment: s.to_string(),
            }),
        }
    }
}

/// Pure version arithmetic, following the usual semver increment rules:
///
/// - `major` / `minor` / `patch` reset the lower components and drop any
///   pre-release; a pre-release of the target version is promoted as-is
///   (`2.0.0-1` + `major` = `2.0.0`).
/// - `pre*` apply the regular increment, then start the pre-release at
///   `<id>.0` (or `0` without an id).
/// - `prerelease` bumps the last numeric identifier of an existing
///   pre-release, or behaves like `prepatch` on a regular version.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionComputer;

impl VersionComputer {
    /// Apply `increment` to `version`
    pub fn increment(version: &Version, increment: Increment, pre_id: Option<&str>) -> Result<Version> {
        let pre_id = pre_id.filter(|id| !id.is_empty());
        let mut next = version.clone();
        next.build = semver::BuildMetadata::EMPTY;

        match increment {
            Increment::Major => {
                if version.pre.is_empty() || version.minor != 0 || version.patch != 0 {
                    next.major += 1;
                }
                next.minor = 0;
                next.patch = 0;
                next.pre = Prerelease::EMPTY;
            }
            Increment::Minor => {
                if version.pre.is_empty() || version.patch != 0 {
                    next.minor += 1;
                }
                next.patch = 0;
                next.pre = Prerelease::EMPTY;
            }
            Increment::Patch => {
                if version.pre.is_empty() {
                    next.patch += 1;
                }
                next.pre = Prerelease::EMPTY;
            }
            Increment::Premajor => {
                next.major += 1;
                next.minor = 0;
                next.patch = 0;
                next.pre = start_pre(pre_id)?;
            }
            Increment::Preminor => {
                next.minor += 1;
                next.patch = 0;
                next.pre = start_pre(pre_id)?;
            }
            Increment::Prepatch => {
                next.patch += 1;
                next.pre = start_pre(pre_id)?;
            }
            Increment::Prerelease => {
                if version.pre.is_empty() {
                    next.patch += 1;
                    next.pre = start_pre(pre_id)?;
                } else {
                    next.pre = bump_pre(&version.pre, pre_id)?;
                }
            }
        }

        Ok(next)
    }
}

fn start_pre(pre_id: Option<&str>) -> Result<Prerelease> {
    let raw = match pre_id {
        Some(id) => format!("{}.0", id),
        None => "0".to_string(),
    };
    parse_pre(&raw)
}

fn bump_pre(current: &Prerelease, pre_id: Option<&str>) -> Result<Prerelease> {
    let mut parts: Vec<String> = current.as_str().split('.').map(String::from).collect();

    if let Some(id) = pre_id
        && parts.first().map(String::as_str) != Some(id)
    {
        return start_pre(Some(id));
    }

    match parts.iter().rposition(|p| p.parse::<u64>().is_ok()) {
        Some(idx) => {
            let n: u64 = parts[idx].parse().unwrap_or(0);
            parts[idx] = (n + 1).to_string();
        }
        None => parts.push("0".to_string()),
    }
    parse_pre(&parts.join("."))
}

fn parse_pre(raw: &str) -> Result<Prerelease> {
    Prerelease::new(raw).map_err(|source| {
        VersionError::ParseFailed {
            version: raw.to_string(),
            source,
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inc(version: &str, increment: Increment, id: Option<&str>) -> String {
        VersionComputer::increment(&Version::parse(version).unwrap(), increment, id)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_regular_increments() {
        assert_eq!(inc("1.2.3", Increment::Major, None), "2.0.0");
        assert_eq!(inc("1.2.3", Increment::Minor, None), "1.3.0");
        assert_eq!(inc("1.2.3", Increment::Patch, None), "1.2.4");
        assert_eq!(inc("1.2.3+build.7", Increment::Patch, None), "1.2.4");
    }

    #[test]
    fn test_regular_increments_promote_prereleases() {
        assert_eq!(inc("2.0.0-beta.1", Increment::Major, None), "2.0.0");
        assert_eq!(inc("1.2.0-rc.0", Increment::Minor, None), "1.2.0");
        assert_eq!(inc("1.2.3-0", Increment::Patch, None), "1.2.3");
        assert_eq!(inc("1.2.3-0", Increment::Major, None), "2.0.0");
    }

    #[test]
    fn test_pre_increments() {
        assert_eq!(inc("1.2.3", Increment::Premajor, None), "2.0.0-0");
        assert_eq!(inc("1.2.3", Increment::Preminor, Some("beta")), "1.3.0-beta.0");
        assert_eq!(inc("1.2.3", Increment::Prepatch, Some("alpha")), "1.2.4-alpha.0");
    }

    #[test]
    fn test_prerelease() {
        assert_eq!(inc("1.2.3", Increment::Prerelease, None), "1.2.4-0");
        assert_eq!(inc("1.2.3-0", Increment::Prerelease, None), "1.2.3-1");
        assert_eq!(inc("1.2.3-beta.1", Increment::Prerelease, Some("beta")), "1.2.3-beta.2");
        assert_eq!(inc("1.2.3-beta.1", Increment::Prerelease, Some("rc")), "1.2.3-rc.0");
        assert_eq!(inc("1.2.3-beta", Increment::Prerelease, None), "1.2.3-beta.0");
    }

    #[test]
    fn test_increment_tokens() {
        assert_eq!("minor".parse::<Increment>().unwrap(), Increment::Minor);
        assert_eq!("PreRelease".parse::<Increment>().unwrap(), Increment::Prerelease);
        assert!("sideways".parse::<Increment>().is_err());
        assert_eq!(Increment::Major.to_pre(), Increment::Premajor);
        assert!(Increment::Prepatch.is_pre());
        assert!(!Increment::Patch.is_pre());
    }
}

//! Release context: the merged options plus runtime fields, as seen by
//! hook commands and templates.
//!
//! Templates reference fields with `${field.path}` (e.g. `${version}`,
//! `${git.pushRepo}`, `${repo.owner}`). Placeholders that do not resolve are
//! left in the output untouched.

use crate::config::ReleaseOptions;
use crate::error::Result;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9_.\-]+)\}").expect("placeholder regex is valid")
});

/// Runtime fields set by the orchestrator between stages
pub mod fields {
    pub const NAME: &str = "name";
    pub const VERSION: &str = "version";
    pub const LATEST_VERSION: &str = "latestVersion";
    pub const LATEST_TAG: &str = "latestTag";
    pub const TAG_NAME: &str = "tagName";
    pub const CHANGELOG: &str = "changelog";
    pub const BRANCH_NAME: &str = "branchName";
    pub const RELEASE_DATE: &str = "releaseDate";
    pub const RELEASE_URL: &str = "releaseUrl";
    pub const REPO: &str = "repo";
    /// Registry distribution tag, only while publishing
    pub const DIST_TAG: &str = "tag";
}

/// Options snapshot plus runtime-computed values
#[derive(Debug, Clone)]
pub struct ReleaseContext {
    values: Map<String, Value>,
}

impl ReleaseContext {
    /// Build a context from validated options
    pub fn new(options: &ReleaseOptions) -> Result<Self> {
        let values = match serde_json::to_value(options)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let mut ctx = Self { values };
        ctx.set(
            fields::RELEASE_DATE,
            chrono::Utc::now().format("%Y-%m-%d").to_string(),
        );
        Ok(ctx)
    }

    /// Context for another options set (distribution pass) keeping runtime fields
    pub fn with_options(&self, options: &ReleaseOptions) -> Result<Self> {
        let mut ctx = Self::new(options)?;
        for key in [
            fields::NAME,
            fields::VERSION,
            fields::LATEST_VERSION,
            fields::CHANGELOG,
            fields::RELEASE_DATE,
        ] {
            if let Some(value) = self.values.get(key) {
                ctx.values.insert(key.to_string(), value.clone());
            }
        }
        Ok(ctx)
    }

    /// Set a runtime field, replacing any previous value
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let (parents, leaf) = match key.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, key),
        };
        let mut target = &mut self.values;
        for part in parents.into_iter().flat_map(|p| p.split('.')) {
            let entry = target
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(map) = entry else {
                return;
            };
            target = map;
        }
        target.insert(leaf.to_string(), value.into());
    }

    /// Set a runtime field only if it has no value yet.
    /// Returns whether the value was stored.
    pub fn set_once(&mut self, key: &str, value: impl Into<Value>) -> bool {
        if self.get(key).is_some_and(|v| !v.is_null()) {
            log::debug!("Context field '{}' already set, keeping existing value", key);
            return false;
        }
        self.set(key, value);
        true
    }

    /// Look up a dotted path
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.values.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Look up a dotted path as a string
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Resolve `${field.path}` placeholders
    pub fn render(&self, template: &str) -> String {
        PLACEHOLDER_RE
            .replace_all(template, |caps: &regex::Captures<'_>| {
                match self.get(&caps[1]) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Null) | None => caps[0].to_string(),
                    Some(Value::Array(items)) => items
                        .iter()
                        .map(|item| match item {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(" "),
                    Some(other) => other.to_string(),
                }
            })
            .into_owned()
    }
}

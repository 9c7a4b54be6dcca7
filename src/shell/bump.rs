//! Manifest version bump.
//!
//! JSON manifests (`package.json`-shaped) keep their key order and
//! indentation; TOML manifests are edited in place with `toml_edit` so
//! comments and layout survive.

use super::Shell;
use crate::error::BumpError;
use std::path::{Path, PathBuf};

impl Shell {
    /// Rewrite the version field of each manifest.
    ///
    /// Manifests that are missing or unparseable are logged as
    /// "could not bump" and skipped. Returns the files that were rewritten.
    pub async fn bump(&self, files: &[String], version: &str) -> Vec<PathBuf> {
        let mut bumped = Vec::new();

        for file in files {
            let path = self.resolve(file);

            if self.dry_run {
                let display = format!("bump {} to {}", file, version);
                log::info!("[dry run] {}", display);
                self.output.exec(&display, true);
                continue;
            }

            match bump_manifest(&path, version).await {
                Ok(()) => {
                    log::debug!("bumped {} to {}", path.display(), version);
                    bumped.push(path);
                }
                Err(e) => {
                    log::warn!("{}", e);
                    self.output.warn(&e.to_string());
                }
            }
        }

        bumped
    }

    /// Read the version field of a manifest
    pub async fn read_manifest_version(&self, file: &str) -> Option<String> {
        let path = self.resolve(file);
        let content = tokio::fs::read_to_string(&path).await.ok()?;
        match manifest_kind(&path) {
            ManifestKind::Toml => read_toml_version(&content),
            ManifestKind::Json => read_json_version(&content),
            ManifestKind::Unknown => {
                read_json_version(&content).or_else(|| read_toml_version(&content))
            }
        }
    }

    /// Read the package name of a manifest
    pub async fn read_manifest_name(&self, file: &str) -> Option<String> {
        let path = self.resolve(file);
        let content = tokio::fs::read_to_string(&path).await.ok()?;
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&content) {
            return value.get("name")?.as_str().map(String::from);
        }
        let doc = content.parse::<toml_edit::DocumentMut>().ok()?;
        doc.get("package")?.get("name")?.as_str().map(String::from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ManifestKind {
    Json,
    Toml,
    Unknown,
}

fn manifest_kind(path: &Path) -> ManifestKind {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => ManifestKind::Json,
        Some("toml") => ManifestKind::Toml,
        _ => ManifestKind::Unknown,
    }
}

async fn bump_manifest(path: &Path, version: &str) -> Result<(), BumpError> {
    if !path.is_file() {
        return Err(BumpError::Missing {
            path: path.to_path_buf(),
        });
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BumpError::Unparseable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let updated = match manifest_kind(path) {
        ManifestKind::Json => bump_json(path, &content, version)?,
        ManifestKind::Toml => bump_toml(path, &content, version)?,
        ManifestKind::Unknown => bump_json(path, &content, version)
            .or_else(|_| bump_toml(path, &content, version))?,
    };

    tokio::fs::write(path, updated)
        .await
        .map_err(|e| BumpError::Unparseable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn bump_json(path: &Path, content: &str, version: &str) -> Result<String, BumpError> {
    let mut doc: serde_json::Value =
        serde_json::from_str(content).map_err(|e| BumpError::Unparseable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let object = doc.as_object_mut().ok_or_else(|| BumpError::Unparseable {
        path: path.to_path_buf(),
        reason: "not a JSON object".to_string(),
    })?;
    match object.get_mut("version") {
        Some(field) if field.is_string() => *field = serde_json::Value::from(version),
        _ => {
            return Err(BumpError::NoVersionField {
                path: path.to_path_buf(),
            });
        }
    }

    let indent = detect_indent(content);
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    serde::Serialize::serialize(&doc, &mut serializer).map_err(|e| BumpError::Unparseable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut rendered = String::from_utf8_lossy(&out).into_owned();
    if content.ends_with('\n') {
        rendered.push('\n');
    }
    Ok(rendered)
}

/// Indentation of the first indented line; two spaces when none is found
fn detect_indent(content: &str) -> String {
    content
        .lines()
        .skip(1)
        .map(|line| {
            line.chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .collect::<String>()
        })
        .find(|indent| !indent.is_empty())
        .unwrap_or_else(|| "  ".to_string())
}

fn bump_toml(path: &Path, content: &str, version: &str) -> Result<String, BumpError> {
    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| BumpError::Unparseable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let updated = set_version_item(
        doc.get_mut("package").and_then(|p| p.get_mut("version")),
        version,
    ) || set_version_item(
        doc.get_mut("workspace")
            .and_then(|w| w.get_mut("package"))
            .and_then(|p| p.get_mut("version")),
        version,
    ) || set_version_item(doc.get_mut("version"), version);

    if !updated {
        return Err(BumpError::NoVersionField {
            path: path.to_path_buf(),
        });
    }
    Ok(doc.to_string())
}

/// Replace a string version value, keeping its surrounding whitespace/comments
fn set_version_item(item: Option<&mut toml_edit::Item>, version: &str) -> bool {
    let Some(value) = item.and_then(|i| i.as_value_mut()) else {
        return false;
    };
    if !value.is_str() {
        return false;
    }
    let decor = value.decor().clone();
    *value = toml_edit::Value::from(version);
    *value.decor_mut() = decor;
    true
}

fn read_json_version(content: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(content).ok()?;
    value.get("version")?.as_str().map(String::from)
}

fn read_toml_version(content: &str) -> Option<String> {
    let doc = content.parse::<toml_edit::DocumentMut>().ok()?;
    doc.get("package")
        .and_then(|p| p.get("version"))
        .and_then(|v| v.as_str())
        .or_else(|| {
            doc.get("workspace")
                .and_then(|w| w.get("package"))
                .and_then(|p| p.get("version"))
                .and_then(|v| v.as_str())
        })
        .or_else(|| doc.get("version").and_then(|v| v.as_str()))
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputManager;

    #[test]
    fn test_bump_json_preserves_indent_and_order() {
        let content = "{\n    \"name\": \"pkg\",\n    \"version\": \"1.0.0\",\n    \"private\": true\n}\n";
        let out = bump_json(Path::new("package.json"), content, "1.1.0").unwrap();
        assert_eq!(
            out,
            "{\n    \"name\": \"pkg\",\n    \"version\": \"1.1.0\",\n    \"private\": true\n}\n"
        );
    }

    #[test]
    fn test_bump_json_tabs() {
        let content = "{\n\t\"version\": \"0.1.0\"\n}";
        let out = bump_json(Path::new("manifest.json"), content, "0.2.0").unwrap();
        assert_eq!(out, "{\n\t\"version\": \"0.2.0\"\n}");
    }

    #[test]
    fn test_bump_toml_keeps_comments() {
        let content = "[package]\nname = \"demo\"\nversion = \"1.2.3\" # current\nedition = \"2021\"\n";
        let out = bump_toml(Path::new("Cargo.toml"), content, "1.2.4").unwrap();
        assert_eq!(
            out,
            "[package]\nname = \"demo\"\nversion = \"1.2.4\" # current\nedition = \"2021\"\n"
        );
    }

    #[test]
    fn test_bump_toml_workspace_version() {
        let content = "[workspace.package]\nversion = \"0.3.0\"\n\n[package]\nname = \"a\"\nversion.workspace = true\n";
        let out = bump_toml(Path::new("Cargo.toml"), content, "0.4.0").unwrap();
        assert!(out.contains("version = \"0.4.0\""));
        assert!(out.contains("version.workspace = true"));
    }

    #[test]
    fn test_bump_toml_without_version_fails() {
        let err = bump_toml(Path::new("x.toml"), "[package]\nname = \"a\"\n", "1.0.0").unwrap_err();
        assert!(matches!(err, BumpError::NoVersionField { .. }));
    }

    #[tokio::test]
    async fn test_bump_skips_missing_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "{\n  \"version\": \"1.0.0\"\n}\n").unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        let shell = Shell::new(dir.path(), false, OutputManager::quiet());

        let files = vec![
            "missing.json".to_string(),
            "broken.json".to_string(),
            "package.json".to_string(),
        ];
        let bumped = shell.bump(&files, "1.0.1").await;

        assert_eq!(bumped, vec![dir.path().join("package.json")]);
        assert_eq!(
            shell.read_manifest_version("package.json").await.as_deref(),
            Some("1.0.1")
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("broken.json")).unwrap(),
            "{ not json"
        );
    }

    #[tokio::test]
    async fn test_bump_empty_list_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let shell = Shell::new(dir.path(), false, OutputManager::quiet());
        assert!(shell.bump(&[], "1.0.0").await.is_empty());
    }

    #[tokio::test]
    async fn test_bump_dry_run_leaves_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"a\"\nversion = \"1.0.0\"\n").unwrap();
        let shell = Shell::new(dir.path(), true, OutputManager::quiet());

        let bumped = shell.bump(&["Cargo.toml".to_string()], "2.0.0").await;
        assert!(bumped.is_empty());
        assert_eq!(
            shell.read_manifest_version("Cargo.toml").await.as_deref(),
            Some("1.0.0")
        );
        assert_eq!(shell.read_manifest_name("Cargo.toml").await.as_deref(), Some("a"));
    }
}

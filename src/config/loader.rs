//! Layered configuration loading: defaults, global file, project file.

use super::ReleaseOptions;
use crate::error::{ConfigError, Result};
use std::path::{Path, PathBuf};

/// Project configuration file, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = ".release.toml";

/// Directory under the platform config dir holding `config.toml`
pub const GLOBAL_CONFIG_DIR: &str = "release_cutter";

impl ReleaseOptions {
    /// Load options for the repository at `cwd`.
    ///
    /// `explicit` replaces the project file lookup; it must exist. The global
    /// file (`<config dir>/release_cutter/config.toml`) is optional.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        let mut merged = toml::Table::new();

        if let Some(global) = global_config_path()
            && global.is_file()
        {
            log::debug!("Loading global configuration from {}", global.display());
            merge_tables(&mut merged, read_table(&global)?);
        }

        let project = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::ParseFailed {
                        path: path.to_path_buf(),
                        reason: "file not found".to_string(),
                    }
                    .into());
                }
                Some(path.to_path_buf())
            }
            None => Some(cwd.join(CONFIG_FILE_NAME)).filter(|p| p.is_file()),
        };

        if let Some(ref path) = project {
            log::debug!("Loading configuration from {}", path.display());
            merge_tables(&mut merged, read_table(path)?);
        }

        let source = project.unwrap_or_else(|| cwd.join(CONFIG_FILE_NAME));
        toml::Value::Table(merged)
            .try_into::<ReleaseOptions>()
            .map_err(|e| {
                ConfigError::ParseFailed {
                    path: source,
                    reason: e.to_string(),
                }
                .into()
            })
    }

    /// Apply environment overrides (`CI`, `RELEASE_CUTTER_CI`)
    pub fn apply_env(&mut self) {
        let truthy = |name: &str| {
            std::env::var(name)
                .map(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(false)
        };
        if truthy("CI") || truthy("RELEASE_CUTTER_CI") {
            self.ci = true;
        }
    }
}

fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(GLOBAL_CONFIG_DIR).join("config.toml"))
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| {
        ConfigError::ParseFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Deep-merge `overlay` into `base`; nested tables merge, everything else replaces.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

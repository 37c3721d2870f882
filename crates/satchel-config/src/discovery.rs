//! Locating and layering config files.
//!
//! Layers, lowest precedence first:
//! 1. `$SATCHEL_CONFIG_DIR/config.toml`, else `<platform config dir>/satchel/config.toml`
//! 2. `satchel.toml` in the project directory
//!
//! An explicit `--config` file is read with [`load_config_file`] and merged
//! over the result by the caller.

use std::path::{Path, PathBuf};

use crate::{ConfigError, Result, SatchelConfig};

const PROJECT_FILE: &str = "satchel.toml";
const USER_FILE: &str = "config.toml";
const CONFIG_DIR_ENV: &str = "SATCHEL_CONFIG_DIR";

/// A config file that discovery looked at.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// False when the file is absent or failed to parse.
    pub loaded: bool,
}

/// Merged configuration plus a record of how it was assembled.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: SatchelConfig,
    /// Every candidate layer, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// One entry per layer that exists but could not be used.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of the layers that contributed to `config`.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Discover and merge the user and project layers.
///
/// `project_dir` defaults to the working directory. A layer that fails to
/// read or parse is skipped with a warning rather than failing discovery.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    let project = project_dir.map_or_else(|| PathBuf::from(PROJECT_FILE), |d| d.join(PROJECT_FILE));
    let user = xdg_config_dir().map(|d| d.join(USER_FILE));
    Ok(merge_layers(user.into_iter().chain([project])))
}

/// Read and parse one config file.
pub fn load_config_file(path: &Path) -> Result<SatchelConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    SatchelConfig::from_toml(&contents)
}

/// Directory holding the user config and the CLI's log files.
///
/// `SATCHEL_CONFIG_DIR` wins over the platform default when set and non-empty.
pub fn xdg_config_dir() -> Option<PathBuf> {
    match std::env::var(CONFIG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|d| d.join("satchel")),
    }
}

fn merge_layers(paths: impl IntoIterator<Item = PathBuf>) -> LoadedConfig {
    let mut loaded = LoadedConfig {
        config: SatchelConfig::new(),
        sources: Vec::new(),
        warnings: Vec::new(),
    };

    for path in paths {
        let layer = if path.is_file() {
            match load_config_file(&path) {
                Ok(layer) => Some(layer),
                Err(e) => {
                    loaded.warnings.push(format!("skipping {}: {e}", path.display()));
                    None
                }
            }
        } else {
            None
        };

        let found = layer.is_some();
        if let Some(layer) = layer {
            loaded.config.merge(layer);
        }
        loaded.sources.push(ConfigSource { path, loaded: found });
    }

    loaded
}

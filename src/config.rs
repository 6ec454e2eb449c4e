use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that points at an alternative config file.
pub const CONFIG_PATH_ENV: &str = "REGRESSION_MAKER_CONFIG";

pub const DEFAULT_DESCRIPTION: &str = "No description provided.";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoaderSettings {
    /// Rows scanned by the CSV reader to infer column types
    pub csv_infer_schema_length: usize,
    /// Single-byte field separator for delimited text
    pub csv_separator: char,
    /// Table to read from SQLite files; `None` means "the only table in the file"
    pub sqlite_table: Option<String>,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            csv_infer_schema_length: 10_000,
            csv_separator: ',',
            sqlite_table: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TrainerSettings {
    /// Pivot magnitude below which a normalized feature column counts as dependent
    pub rank_tolerance: f64,
}

impl Default for TrainerSettings {
    fn default() -> Self {
        Self {
            rank_tolerance: 1e-9,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StoreSettings {
    /// Description written when the user leaves it blank
    pub default_description: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            default_description: DEFAULT_DESCRIPTION.to_owned(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub loader: LoaderSettings,
    pub trainer: TrainerSettings,
    pub store: StoreSettings,
}

pub fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("regression-maker")
        .join("config.json")
}

/// Loads the config at the standard location, falling back to defaults.
pub fn load_app_config() -> AppConfig {
    load_app_config_from(&get_config_path())
}

/// Loads the config at `path`. A missing or unparsable file yields defaults.
pub fn load_app_config_from(path: &Path) -> AppConfig {
    if path.exists()
        && let Ok(content) = std::fs::read_to_string(path)
    {
        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => return config,
            Err(e) => {
                tracing::warn!("Ignoring unreadable config {}: {e}", path.display());
            }
        }
    }

    AppConfig::default()
}

pub fn save_app_config(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    Ok(())
}

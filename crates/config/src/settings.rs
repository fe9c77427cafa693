// Config file: <config_dir>/fedlink/config.toml
//
// Every field is optional. Unset fields fall through to environment
// variables and built-in defaults when the profile is resolved.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk settings, as written by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Platform invoke endpoint, e.g. `http://10.99.92.39:8865/janus/invoke/v1`
    pub base_url: Option<String>,
    /// Platform access token. Prefer FEDLINK_TOKEN over storing it here.
    pub token: Option<String>,
    pub namespace_id: Option<String>,
    pub username: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Deployment suffix appended to every method identifier
    pub method_suffix: Option<String>,
    pub export_page_size: Option<u32>,
}

impl Settings {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fedlink");
        config_dir.join("config.toml")
    }

    /// Get the config file path for display
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`, falling back to defaults.
    ///
    /// A missing file is normal. An unreadable or unparsable file is logged
    /// and ignored so a broken config never blocks flag/env usage.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("no config file at {}", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("ignoring {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("cannot read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }
}

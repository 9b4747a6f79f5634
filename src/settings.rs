//! User settings file
//!
//! Optional defaults loaded from `~/.kubepeek/config.toml`. Command-line
//! flags always take precedence over values from the file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Namespace used when neither the flag nor the file names one
pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Kubeconfig path used when neither `--kubeconfig` nor `KUBECONFIG` is set
    pub kubeconfig: Option<String>,

    /// Namespace used when `--namespace` is not given
    pub namespace: Option<String>,

    pub logs: LogSettings,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    pub tail_lines: Option<i64>,
    pub timestamps: bool,
}

impl Settings {
    /// Default settings file location
    pub fn default_path() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(home.join(".kubepeek").join("config.toml"))
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).context(format!("Failed to read settings file {}", path.display()));
            }
        };
        Self::parse(&content).context(format!("Invalid settings file {}", path.display()))
    }

    /// Load from the default location, if there is one
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn namespace(&self, flag: Option<&str>) -> String {
        flag.or(self.namespace.as_deref())
            .unwrap_or(DEFAULT_NAMESPACE)
            .to_string()
    }
}

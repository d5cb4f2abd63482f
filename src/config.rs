use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::request::AlphaMode;

/// Default form values for the CLI and GUI.
///
/// # Loading
///
/// ```rust,no_run
/// use img2ico::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.defaults.corner_radius = 0;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Starting values for size and corner radius.
    pub defaults: ConversionDefaults,
    /// Where icons go and how corner masks treat existing alpha.
    pub output: OutputConfig,
}

/// Size and radius used when the user does not pick any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionDefaults {
    pub width: u32,
    pub height: u32,
    pub corner_radius: u32,
}

/// Output behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory. `None` or blank means the working directory.
    pub output_dir: Option<String>,
    pub alpha_mode: AlphaMode,
}

impl Default for ConversionDefaults {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            corner_radius: 10,
        }
    }
}

impl Config {
    /// Resolve the config file path — same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        log::debug!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Configured output directory, with blank strings treated as unset.
    pub fn output_dir(&self) -> Option<&str> {
        self.output
            .output_dir
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

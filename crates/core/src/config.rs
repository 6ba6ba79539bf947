use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const ENV_CONFIG_PATH: &str = "YUVPSNR_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub comparison: ComparisonConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Drop frame pairs whose second luma plane is entirely zero.
    pub skip_blank_frames: bool,
    /// Frame cap used when none is given on the command line.
    pub max_frames: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: Option<String>,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            skip_blank_frames: true,
            max_frames: None,
        }
    }
}

impl AppConfig {
    /// Missing or empty files yield the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config TOML: {}", path.display()))
    }

    /// Load from [`config_path`], or defaults when no path is configured.
    pub fn load(cli_override: Option<&Path>) -> Result<Self> {
        match config_path(cli_override) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// The command-line cap wins over `max_frames`.
    pub fn frame_cap(&self, cli_num: Option<u64>) -> Option<u64> {
        cli_num.or(self.comparison.max_frames)
    }
}

/// Resolve the config file with 2-tier priority:
/// 1. CLI override if provided
/// 2. YUVPSNR_CONFIG environment variable
pub fn config_path(cli_override: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_override {
        return Some(path.to_path_buf());
    }

    env::var_os(ENV_CONFIG_PATH).map(PathBuf::from)
}

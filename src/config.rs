//! Application configuration, stored as TOML.

use anyhow::{Context, Result};
use pp_vision::ReadSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_LOG_FILTER: &str = "papers_tas=debug,pp_vision=info,pp_capture=info";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TasConfig {
    /// Directory holding `manifest.json` and the game assets it names.
    pub data_dir: PathBuf,
    /// Tracing filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub recognition: RecognitionConfig,
    pub capture: CaptureConfig,
}

impl Default for TasConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            recognition: RecognitionConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Per-channel slack when comparing synthesized glyphs.
    pub text_tolerance: u8,
    /// Columns scanned left of detected text when a field is aligned.
    pub alignment_backoff: u32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        let defaults = ReadSettings::default();
        Self {
            text_tolerance: defaults.tolerance,
            alignment_backoff: defaults.alignment_backoff,
        }
    }
}

impl RecognitionConfig {
    pub fn read_settings(&self) -> ReadSettings {
        ReadSettings {
            tolerance: self.text_tolerance,
            alignment_backoff: self.alignment_backoff,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Window titles to look for, matched case-insensitively as substrings.
    pub window_titles: Vec<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            window_titles: pp_capture::GAME_WINDOW_TITLES
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

/// Load configuration from file, falling back to defaults if it does not exist.
pub fn load_config(path: &Path) -> Result<TasConfig> {
    if !path.exists() {
        info!("No config at {}, using defaults", path.display());
        return Ok(TasConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: TasConfig =
        toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &TasConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

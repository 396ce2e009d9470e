//! TOML configuration file loading
//!
//! Supports `~/.config/pathsense/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct PathsenseConfigFile {
    /// Announcement behavior
    #[serde(default)]
    pub guidance: GuidanceFileConfig,

    /// Speech engine selection and voice
    #[serde(default)]
    pub speech: SpeechFileConfig,
}

/// `[guidance]` section
#[derive(Debug, Default, Deserialize)]
pub struct GuidanceFileConfig {
    /// Speak scene announcements at all
    pub speech_enabled: Option<bool>,

    /// "low", "medium" or "high"
    pub verbosity: Option<String>,

    /// Describe the whole scene (true) or only the closest object (false)
    pub announce_all: Option<bool>,

    /// Detector score a detection must exceed
    pub min_confidence: Option<f64>,

    /// Batches closer together than this are skipped
    pub min_tick_interval_ms: Option<u64>,
}

/// `[speech]` section
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// "console" or "command"
    pub engine: Option<String>,

    /// Program to run for the command engine (e.g. "espeak-ng")
    pub command: Option<String>,

    /// Arguments for the program; supports `{text}`, `{wpm}`, `{voice}`
    pub args: Option<Vec<String>>,

    pub rate: Option<f32>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
    pub voice: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `PathsenseConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> PathsenseConfigFile {
    let Some(path) = config_file_path() else {
        return PathsenseConfigFile::default();
    };

    if !path.exists() {
        return PathsenseConfigFile::default();
    }

    match read_config_file(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            PathsenseConfigFile::default()
        }
    }
}

/// Read and parse a specific config file
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML
pub fn read_config_file(path: &Path) -> Result<PathsenseConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Return the config file path: `~/.config/pathsense/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("pathsense").join("config.toml"))
}

//! Configuration management for pathsense
//!
//! Sources, highest priority first: environment variables, the TOML file
//! (see [`file`]), built-in defaults. The binary layers its CLI flags on top.

pub mod file;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::detection::DEFAULT_MIN_CONFIDENCE;
use crate::speech::VoiceOptions;
use crate::{Error, Result};

use self::file::PathsenseConfigFile;

/// Default spacing between processed detection batches
pub const DEFAULT_MIN_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// How much detail scene descriptions carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Low,
    #[default]
    Medium,
    High,
}

impl Verbosity {
    /// Next level in the `low → medium → high → low` cycle
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High => Self::Low,
        }
    }

    /// Maximum objects named individually in a scene description
    #[must_use]
    pub const fn scene_limit(self) -> Option<usize> {
        match self {
            Self::Low => Some(2),
            Self::Medium => Some(4),
            Self::High => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Verbosity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(Error::Config(format!(
                "invalid verbosity '{other}' (expected low, medium or high)"
            ))),
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-controlled switches consulted live by the policy engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuidanceSettings {
    /// Scene announcements are spoken at all
    pub speech_enabled: bool,
    pub verbosity: Verbosity,
    /// Describe the whole scene (true) or report only the closest object
    pub announce_all: bool,
}

impl Default for GuidanceSettings {
    fn default() -> Self {
        Self {
            speech_enabled: true,
            verbosity: Verbosity::Medium,
            announce_all: true,
        }
    }
}

/// Which speech backend to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeechEngineKind {
    /// Print utterances to stdout
    #[default]
    Console,
    /// Run an external synthesizer per utterance
    Command,
}

impl FromStr for SpeechEngineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "command" => Ok(Self::Command),
            other => Err(Error::Config(format!(
                "invalid speech engine '{other}' (expected console or command)"
            ))),
        }
    }
}

impl fmt::Display for SpeechEngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Console => write!(f, "console"),
            Self::Command => write!(f, "command"),
        }
    }
}

/// Speech backend configuration
#[derive(Debug, Clone, Default)]
pub struct SpeechConfig {
    pub engine: SpeechEngineKind,
    /// Program for [`SpeechEngineKind::Command`]
    pub command: Option<String>,
    /// Arguments for the program
    pub args: Vec<String>,
    /// Base voice for every utterance
    pub voice: VoiceOptions,
}

/// pathsense configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Initial guidance switches
    pub guidance: GuidanceSettings,

    /// Detections must score strictly above this
    pub min_confidence: f64,

    /// Batches arriving sooner than this after the last one are skipped
    pub min_tick_interval: Duration,

    pub speech: SpeechConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            guidance: GuidanceSettings::default(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            min_tick_interval: DEFAULT_MIN_TICK_INTERVAL,
            speech: SpeechConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the environment and config file
    ///
    /// With `path` set, that file must exist and parse. Without it the
    /// standard location is used if present.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file is unreadable or any value
    /// is invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let fc = match path {
            Some(path) => file::read_config_file(path)?,
            None => file::load_config_file(),
        };
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with environment lookups
    ///
    /// # Errors
    ///
    /// Returns error if any value is invalid
    pub fn from_sources(fc: PathsenseConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let speech_enabled = match env("PATHSENSE_SPEECH_ENABLED") {
            Some(v) => parse_bool("PATHSENSE_SPEECH_ENABLED", &v)?,
            None => fc
                .guidance
                .speech_enabled
                .unwrap_or(defaults.guidance.speech_enabled),
        };

        let announce_all = match env("PATHSENSE_ANNOUNCE_ALL") {
            Some(v) => parse_bool("PATHSENSE_ANNOUNCE_ALL", &v)?,
            None => fc
                .guidance
                .announce_all
                .unwrap_or(defaults.guidance.announce_all),
        };

        let verbosity = env("PATHSENSE_VERBOSITY")
            .or(fc.guidance.verbosity)
            .map(|v| v.parse::<Verbosity>())
            .transpose()?
            .unwrap_or_default();

        let min_confidence = match env("PATHSENSE_MIN_CONFIDENCE") {
            Some(v) => v.trim().parse::<f64>().map_err(|e| {
                Error::Config(format!("invalid PATHSENSE_MIN_CONFIDENCE '{v}': {e}"))
            })?,
            None => fc.guidance.min_confidence.unwrap_or(defaults.min_confidence),
        };
        if !(0.0..1.0).contains(&min_confidence) {
            return Err(Error::Config(format!(
                "min_confidence must be in [0, 1), got {min_confidence}"
            )));
        }

        let min_tick_interval = fc
            .guidance
            .min_tick_interval_ms
            .map_or(defaults.min_tick_interval, Duration::from_millis);

        let engine = env("PATHSENSE_SPEECH_ENGINE")
            .or(fc.speech.engine)
            .map(|v| v.parse::<SpeechEngineKind>())
            .transpose()?
            .unwrap_or_default();

        let command = env("PATHSENSE_SPEECH_COMMAND").or(fc.speech.command);

        let base_voice = VoiceOptions::default();
        let voice = VoiceOptions {
            rate: fc.speech.rate.unwrap_or(base_voice.rate),
            pitch: fc.speech.pitch.unwrap_or(base_voice.pitch),
            volume: fc.speech.volume.unwrap_or(base_voice.volume),
            voice: fc.speech.voice,
        };

        let config = Self {
            guidance: GuidanceSettings {
                speech_enabled,
                verbosity,
                announce_all,
            },
            min_confidence,
            min_tick_interval,
            speech: SpeechConfig {
                engine,
                command,
                args: fc.speech.args.unwrap_or_default(),
                voice,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns error describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        if self.speech.engine == SpeechEngineKind::Command
            && self.speech.command.as_deref().is_none_or(|c| c.trim().is_empty())
        {
            return Err(Error::Config(
                "speech engine 'command' requires a speech command".to_string(),
            ));
        }

        let voice = &self.speech.voice;
        if !(voice.rate.is_finite() && voice.rate > 0.0) {
            return Err(Error::Config(format!("speech rate must be positive, got {}", voice.rate)));
        }
        if !(voice.pitch.is_finite() && voice.pitch > 0.0) {
            return Err(Error::Config(format!("speech pitch must be positive, got {}", voice.pitch)));
        }
        if !(0.0..=1.0).contains(&voice.volume) {
            return Err(Error::Config(format!(
                "speech volume must be in [0, 1], got {}",
                voice.volume
            )));
        }

        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("invalid boolean for {key}: '{value}'"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_verbosity_cycle_and_parse() {
        assert_eq!(Verbosity::Low.next(), Verbosity::Medium);
        assert_eq!(Verbosity::Medium.next(), Verbosity::High);
        assert_eq!(Verbosity::High.next(), Verbosity::Low);
        assert_eq!("HIGH".parse::<Verbosity>().unwrap(), Verbosity::High);
        assert!("loud".parse::<Verbosity>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(PathsenseConfigFile::default(), env(&[])).unwrap();

        assert!(config.guidance.speech_enabled);
        assert!(config.guidance.announce_all);
        assert_eq!(config.guidance.verbosity, Verbosity::Medium);
        assert!((config.min_confidence - 0.60).abs() < f64::EPSILON);
        assert_eq!(config.min_tick_interval, Duration::from_millis(500));
        assert_eq!(config.speech.engine, SpeechEngineKind::Console);
        assert!((config.speech.voice.rate - 1.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_env_overrides_file() {
        let fc: PathsenseConfigFile = toml::from_str(
            r#"
            [guidance]
            verbosity = "low"
            announce_all = true
            min_tick_interval_ms = 250
            "#,
        )
        .unwrap();

        let config = Config::from_sources(
            fc,
            env(&[
                ("PATHSENSE_VERBOSITY", "high"),
                ("PATHSENSE_ANNOUNCE_ALL", "false"),
            ]),
        )
        .unwrap();

        assert_eq!(config.guidance.verbosity, Verbosity::High);
        assert!(!config.guidance.announce_all);
        assert_eq!(config.min_tick_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_command_engine_requires_command() {
        let err = Config::from_sources(
            PathsenseConfigFile::default(),
            env(&[("PATHSENSE_SPEECH_ENGINE", "command")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let config = Config::from_sources(
            PathsenseConfigFile::default(),
            env(&[
                ("PATHSENSE_SPEECH_ENGINE", "command"),
                ("PATHSENSE_SPEECH_COMMAND", "espeak-ng"),
            ]),
        )
        .unwrap();
        assert_eq!(config.speech.command.as_deref(), Some("espeak-ng"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(
            Config::from_sources(
                PathsenseConfigFile::default(),
                env(&[("PATHSENSE_MIN_CONFIDENCE", "1.5")])
            )
            .is_err()
        );
        assert!(
            Config::from_sources(
                PathsenseConfigFile::default(),
                env(&[("PATHSENSE_SPEECH_ENABLED", "maybe")])
            )
            .is_err()
        );
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[speech]\nrate = 1.4\nvoice = \"en-gb\"\n").unwrap();

        let fc = file::read_config_file(&path).unwrap();
        let config = Config::from_sources(fc, env(&[])).unwrap();

        assert!((config.speech.voice.rate - 1.4).abs() < f32::EPSILON);
        assert_eq!(config.speech.voice.voice.as_deref(), Some("en-gb"));
    }
}

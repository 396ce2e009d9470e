//! Error types for Pathsense

use thiserror::Error;

/// Result type alias for Pathsense operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Pathsense
///
/// Nothing on the per-tick path surfaces these to callers; they come from
/// configuration loading, engine construction and the input source.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Text-to-speech engine error
    #[error("speech error: {0}")]
    Speech(String),

    /// Detection input error
    #[error("detection error: {0}")]
    Detection(String),

    /// Runtime driver error (worker gone, channel closed)
    #[error("runtime error: {0}")]
    Runtime(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

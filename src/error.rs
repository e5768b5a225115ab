//! Error types for the Parley gateway

use thiserror::Error;

/// Result type alias for Parley operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which side of a language pair a capability belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityRole {
    /// The language being spoken into the microphone
    Source,
    /// The language being spoken back
    Target,
}

impl std::fmt::Display for CapabilityRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Target => write!(f, "target"),
        }
    }
}

/// Errors that can occur in the Parley gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error (capture or playback hardware)
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech recognition error
    #[error("recognition error: {0}")]
    Recognition(String),

    /// A required language capability is not installed
    #[error("no installed {kind} capability for {role} language {lang}")]
    CapabilityMissing {
        /// Source or target side of the requested pair
        role: CapabilityRole,
        /// The capability kind ("recognition" or "translation")
        kind: &'static str,
        /// The language code
        lang: String,
    },

    /// Translation engine error
    #[error("translation error: {0}")]
    Translation(String),

    /// A single TTS backend failed to produce a usable artifact
    #[error("synthesis backend {backend} failed: {reason}")]
    Synthesis {
        /// Backend identifier
        backend: String,
        /// What went wrong
        reason: String,
    },

    /// Audio playback error
    #[error("playback error: {0}")]
    Playback(String),

    /// A stage exceeded its deadline
    #[error("{stage} timed out after {seconds}s")]
    Timeout {
        /// The pipeline stage that hung
        stage: &'static str,
        /// The deadline that was exceeded
        seconds: u64,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

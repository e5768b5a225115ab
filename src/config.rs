//! Configuration management for the Parley gateway
//!
//! Everything environment-specific lives here: the supported language
//! table, recognizer and translator engine settings, the ordered TTS
//! backend chain, capture tuning, and stage timeouts. The core pipeline
//! depends only on these injected values, never on hardcoded paths.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::{Error, Result};

/// Parley gateway configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Supported languages: code → display name
    pub languages: BTreeMap<String, String>,

    /// Speech recognition engine
    pub recognizer: RecognizerConfig,

    /// Translation engine
    pub translator: TranslatorConfig,

    /// Speech synthesis chain
    pub synthesis: SynthesisConfig,

    /// Microphone capture tuning
    pub capture: CaptureConfig,

    /// HTTP API server
    pub api: ApiConfig,
}

/// Which kind of external engine backs a capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// A local executable invoked per request
    Command,
    /// An HTTP service
    Http,
}

/// Speech recognition engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Engine kind
    pub kind: EngineKind,

    /// Recognizer executable (command kind)
    pub program: String,

    /// Argument template for the command kind. Placeholders: `{model}`,
    /// `{input}`, `{lang}`
    pub args: Vec<String>,

    /// Per-language acoustic model directories (command kind)
    pub model_dirs: BTreeMap<String, PathBuf>,

    /// Transcription endpoint (http kind)
    pub url: String,

    /// Model identifier sent to the endpoint (http kind)
    pub model: String,

    /// Environment variable holding the API key (http kind)
    pub api_key_env: String,

    /// Per-call deadline in seconds
    pub timeout_secs: u64,
}

/// Translation engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Engine kind
    pub kind: EngineKind,

    /// Translator executable (command kind). Text is written to stdin.
    pub program: String,

    /// Argument template for the command kind. Placeholders: `{from}`, `{to}`
    pub args: Vec<String>,

    /// Translation endpoint (http kind, LibreTranslate-compatible)
    pub url: String,

    /// Environment variable holding the API key (http kind)
    pub api_key_env: String,

    /// Intermediate language for two-hop translation when no direct
    /// capability exists between a pair
    pub pivot: String,

    /// Per-call deadline in seconds
    pub timeout_secs: u64,
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Ordered backend chain; earlier entries are preferred
    pub backends: Vec<TtsBackendConfig>,

    /// An artifact smaller than this is treated as a failed synthesis even
    /// when the backend reported success
    pub min_artifact_bytes: u64,

    /// Per-backend deadline in seconds
    pub attempt_timeout_secs: u64,

    /// Directory for transient audio artifacts; system temp dir when unset
    pub artifact_dir: Option<PathBuf>,
}

/// One entry in the TTS backend chain
#[derive(Debug, Clone, Deserialize)]
pub struct TtsBackendConfig {
    /// Backend identifier used in diagnostics
    pub id: String,

    /// Engine kind
    pub kind: EngineKind,

    /// Synthesizer executable (command kind)
    #[serde(default)]
    pub program: String,

    /// Argument template for the command kind. Placeholders: `{voice}`,
    /// `{output}`, `{textfile}`
    #[serde(default)]
    pub args: Vec<String>,

    /// Language code → engine voice name (command kind). A language with
    /// no entry uses its code as the voice name.
    #[serde(default)]
    pub voices: BTreeMap<String, String>,

    /// Speech endpoint (http kind, OpenAI-compatible)
    #[serde(default)]
    pub url: String,

    /// Model identifier (http kind)
    #[serde(default)]
    pub model: String,

    /// Voice identifier (http kind)
    #[serde(default)]
    pub voice: String,

    /// Environment variable holding the API key (http kind)
    #[serde(default)]
    pub api_key_env: String,
}

/// Microphone capture tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Samples per PCM frame pushed into the capture queue
    pub frame_samples: usize,

    /// Capture queue capacity in frames; the producer blocks when full
    pub queue_frames: usize,

    /// How long to wait for a finalized utterance before giving up
    pub utterance_timeout_secs: u64,
}

/// HTTP API server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Port to listen on
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            recognizer: RecognizerConfig::default(),
            translator: TranslatorConfig::default(),
            synthesis: SynthesisConfig::default(),
            capture: CaptureConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::Command,
            program: "vosk-transcriber".to_string(),
            args: vec![
                "-m".to_string(),
                "{model}".to_string(),
                "-i".to_string(),
                "{input}".to_string(),
            ],
            model_dirs: default_model_dirs(),
            url: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            model: "whisper-1".to_string(),
            api_key_env: "PARLEY_STT_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::Command,
            program: "argos-translate".to_string(),
            args: vec![
                "--from".to_string(),
                "{from}".to_string(),
                "--to".to_string(),
                "{to}".to_string(),
            ],
            url: "http://localhost:5000/translate".to_string(),
            api_key_env: "PARLEY_TRANSLATE_API_KEY".to_string(),
            pivot: "en".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            backends: default_backends(),
            min_artifact_bytes: 1000,
            attempt_timeout_secs: 20,
            artifact_dir: None,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frame_samples: 1600,
            queue_frames: 32,
            utterance_timeout_secs: 30,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 5190 }
    }
}

/// The six languages the gateway supports out of the box
fn default_languages() -> BTreeMap<String, String> {
    [
        ("en", "English"),
        ("hi", "Hindi"),
        ("es", "Spanish"),
        ("de", "German"),
        ("ja", "Japanese"),
        ("zh", "Chinese"),
    ]
    .into_iter()
    .map(|(code, name)| (code.to_string(), name.to_string()))
    .collect()
}

/// Default offline recognizer model locations
fn default_model_dirs() -> BTreeMap<String, PathBuf> {
    [
        ("en", "models/vosk-model-small-en-us-0.15"),
        ("hi", "models/vosk-model-small-hi-0.22"),
        ("es", "models/vosk-model-small-es-0.42"),
        ("de", "models/vosk-model-de-0.21"),
        ("ja", "models/vosk-model-small-ja-0.22"),
        ("zh", "models/vosk-model-small-cn-0.22"),
    ]
    .into_iter()
    .map(|(code, dir)| (code.to_string(), PathBuf::from(dir)))
    .collect()
}

/// Default synthesis chain: platform speech command, then eSpeak, then an
/// OpenAI-compatible speech API. Order is a policy choice — broader
/// language coverage and higher fidelity first.
fn default_backends() -> Vec<TtsBackendConfig> {
    vec![
        TtsBackendConfig {
            id: "system".to_string(),
            kind: EngineKind::Command,
            program: "say".to_string(),
            args: vec![
                "-o".to_string(),
                "{output}".to_string(),
                "-f".to_string(),
                "{textfile}".to_string(),
            ],
            voices: BTreeMap::new(),
            url: String::new(),
            model: String::new(),
            voice: String::new(),
            api_key_env: String::new(),
        },
        TtsBackendConfig {
            id: "espeak".to_string(),
            kind: EngineKind::Command,
            program: "espeak".to_string(),
            args: vec![
                "-v".to_string(),
                "{voice}".to_string(),
                "-w".to_string(),
                "{output}".to_string(),
                "-s".to_string(),
                "130".to_string(),
                "-p".to_string(),
                "50".to_string(),
                "-f".to_string(),
                "{textfile}".to_string(),
            ],
            voices: espeak_voices(),
            url: String::new(),
            model: String::new(),
            voice: String::new(),
            api_key_env: String::new(),
        },
        TtsBackendConfig {
            id: "speech-api".to_string(),
            kind: EngineKind::Http,
            program: String::new(),
            args: Vec::new(),
            voices: BTreeMap::new(),
            url: "https://api.openai.com/v1/audio/speech".to_string(),
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            api_key_env: "PARLEY_TTS_API_KEY".to_string(),
        },
    ]
}

/// eSpeak voice names per language. Japanese and Chinese fall back to an
/// English variant voice; eSpeak's coverage there is poor.
fn espeak_voices() -> BTreeMap<String, String> {
    [
        ("en", "en"),
        ("hi", "hi"),
        ("es", "es"),
        ("de", "de"),
        ("ja", "en+f5"),
        ("zh", "en+f5"),
    ]
    .into_iter()
    .map(|(code, voice)| (code.to_string(), voice.to_string()))
    .collect()
}

/// Default config file location (`~/.config/parley/parley.toml` on Linux)
#[must_use]
pub fn default_config_path() -> PathBuf {
    directories::ProjectDirs::from("dev", "parley", "parley").map_or_else(
        || PathBuf::from("parley.toml"),
        |d| d.config_dir().join("parley.toml"),
    )
}

impl Config {
    /// Load configuration from an explicit path, or from the default
    /// location. A missing file yields the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self> {
        let path = path.map_or_else(default_config_path, PathBuf::from);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)?;

        tracing::debug!(path = %path.display(), "loaded configuration");
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency
    ///
    /// # Errors
    ///
    /// Returns error if the pivot language is not in the supported set or
    /// the synthesis chain is empty.
    pub fn validate(&self) -> Result<()> {
        if !self.languages.contains_key(&self.translator.pivot) {
            return Err(Error::Config(format!(
                "pivot language {} is not in the supported set",
                self.translator.pivot
            )));
        }
        if self.synthesis.backends.is_empty() {
            return Err(Error::Config(
                "synthesis.backends must list at least one backend".to_string(),
            ));
        }
        Ok(())
    }

    /// Display name for a language code, if supported
    #[must_use]
    pub fn language_name(&self, code: &str) -> Option<&str> {
        self.languages.get(code).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.languages.len(), 6);
        assert_eq!(config.translator.pivot, "en");
        assert_eq!(config.synthesis.min_artifact_bytes, 1000);
        assert_eq!(config.synthesis.backends.len(), 3);
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [translator]
            pivot = "es"

            [api]
            port = 8080
            "#,
        )
        .unwrap();

        assert_eq!(config.translator.pivot, "es");
        assert_eq!(config.api.port, 8080);
        // untouched sections keep their defaults
        assert_eq!(config.capture.frame_samples, 1600);
    }

    #[test]
    fn rejects_unknown_pivot() {
        let mut config = Config::default();
        config.translator.pivot = "xx".to_string();
        assert!(config.validate().is_err());
    }
}

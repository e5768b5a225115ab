//! Speech-to-text engines
//!
//! The recognizer is an opaque capability: give it captured WAV audio and
//! a language, get text back (possibly empty — silence is a valid result,
//! not an error). Two engines are provided: an offline recognizer CLI and
//! a Whisper-style HTTP endpoint.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{EngineKind, RecognizerConfig};
use crate::exec;
use crate::{Error, Result};

/// One finalized, recognized span of speech
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    /// Recognized text; empty when no speech was detected
    pub text: String,
}

impl Utterance {
    /// An utterance with no recognized speech
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            text: String::new(),
        }
    }

    /// Whether any speech was recognized
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Turns captured audio into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe WAV audio in the given language
    ///
    /// # Errors
    ///
    /// Returns error if the engine fails or times out. An empty transcript
    /// is a success, not an error.
    async fn transcribe(&self, wav: Vec<u8>, lang: &str) -> Result<String>;
}

/// Build the configured transcriber
///
/// # Errors
///
/// Returns error if the http kind is selected without its API key in the
/// environment.
pub fn build_transcriber(config: &RecognizerConfig) -> Result<Arc<dyn Transcriber>> {
    match config.kind {
        EngineKind::Command => Ok(Arc::new(CommandTranscriber::new(config))),
        EngineKind::Http => {
            let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                Error::Config(format!(
                    "recognizer requires {} in the environment",
                    config.api_key_env
                ))
            })?;
            Ok(Arc::new(HttpTranscriber::new(config, api_key)))
        }
    }
}

/// Offline recognizer invoked as a subprocess over the captured WAV
pub struct CommandTranscriber {
    program: String,
    args: Vec<String>,
    model_dirs: std::collections::BTreeMap<String, std::path::PathBuf>,
    timeout: Duration,
}

impl CommandTranscriber {
    /// Create from recognizer configuration
    #[must_use]
    pub fn new(config: &RecognizerConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            model_dirs: config.model_dirs.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl Transcriber for CommandTranscriber {
    async fn transcribe(&self, wav: Vec<u8>, lang: &str) -> Result<String> {
        let model = self
            .model_dirs
            .get(lang)
            .ok_or_else(|| Error::Recognition(format!("no recognizer model for {lang}")))?;

        let mut input = tempfile::Builder::new()
            .prefix("parley-rec-")
            .suffix(".wav")
            .tempfile()?;
        input.write_all(&wav)?;
        input.flush()?;

        let args = exec::fill_args(
            &self.args,
            &[
                ("model", &model.display().to_string()),
                ("input", &input.path().display().to_string()),
                ("lang", lang),
            ],
        );

        let output =
            exec::run_with_timeout(&self.program, &args, None, "recognition", self.timeout).await?;

        if !output.status.success() {
            return Err(Error::Recognition(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                exec::stderr_snippet(&output)
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::info!(lang, transcript = %text, "transcription complete");
        Ok(text)
    }
}

/// Response from a Whisper-style transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Whisper-style HTTP transcription endpoint
pub struct HttpTranscriber {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl HttpTranscriber {
    /// Create from recognizer configuration and a resolved API key
    #[must_use]
    pub fn new(config: &RecognizerConfig, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            api_key,
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, wav: Vec<u8>, lang: &str) -> Result<String> {
        tracing::debug!(audio_bytes = wav.len(), lang, "starting transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav)
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Recognition(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", lang.to_string());

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout {
                        stage: "recognition",
                        seconds: self.timeout.as_secs(),
                    }
                } else {
                    Error::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::Recognition(format!(
                "transcription API error {status}: {body}"
            )));
        }

        let result: WhisperResponse = response.json().await?;
        tracing::info!(lang, transcript = %result.text, "transcription complete");
        Ok(result.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_utterance_is_empty() {
        assert!(Utterance::empty().is_empty());
        assert!(
            Utterance {
                text: "   ".to_string()
            }
            .is_empty()
        );
        assert!(
            !Utterance {
                text: "hello".to_string()
            }
            .is_empty()
        );
    }
}

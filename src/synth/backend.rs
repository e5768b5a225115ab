//! Text-to-speech backends
//!
//! Each backend turns (text, lang) into an audio artifact at a caller
//! chosen path, or fails. Backends never verify their own output — the
//! orchestrator checks the artifact independently, because an engine can
//! report success and still write a near-empty file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{EngineKind, SynthesisConfig, TtsBackendConfig};
use crate::exec;
use crate::{Error, Result};

/// One concrete text-to-speech engine
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Identifier used in diagnostics and attempt records
    fn id(&self) -> &str;

    /// Whether the backend can currently be used (program on PATH, API
    /// key in the environment). Used for capability reporting; the
    /// orchestrator still tries every backend in order.
    fn available(&self) -> bool;

    /// Synthesize `text` in `lang` into an audio file at `output`
    ///
    /// # Errors
    ///
    /// Returns error if the engine fails, times out, or is unusable
    async fn synthesize(&self, text: &str, lang: &str, output: &Path) -> Result<()>;
}

/// Build the configured backend chain, preserving order
#[must_use]
pub fn build_backends(config: &SynthesisConfig) -> Vec<Arc<dyn SpeechBackend>> {
    let timeout = Duration::from_secs(config.attempt_timeout_secs);
    config
        .backends
        .iter()
        .map(|backend| match backend.kind {
            EngineKind::Command => {
                Arc::new(CommandSpeechBackend::new(backend, timeout)) as Arc<dyn SpeechBackend>
            }
            EngineKind::Http => Arc::new(HttpSpeechBackend::new(backend, timeout)),
        })
        .collect()
}

/// Synthesizer invoked as a subprocess (eSpeak, platform speech command).
/// The text goes through a temp UTF-8 file rather than the command line,
/// so shells and codepages never mangle it.
pub struct CommandSpeechBackend {
    id: String,
    program: String,
    args: Vec<String>,
    voices: BTreeMap<String, String>,
    timeout: Duration,
}

impl CommandSpeechBackend {
    /// Create from one backend chain entry
    #[must_use]
    pub fn new(config: &TtsBackendConfig, timeout: Duration) -> Self {
        Self {
            id: config.id.clone(),
            program: config.program.clone(),
            args: config.args.clone(),
            voices: config.voices.clone(),
            timeout,
        }
    }

    /// The engine voice for a language; the code itself when unmapped
    fn voice_for<'a>(&'a self, lang: &'a str) -> &'a str {
        self.voices.get(lang).map_or(lang, String::as_str)
    }
}

#[async_trait]
impl SpeechBackend for CommandSpeechBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    async fn synthesize(&self, text: &str, lang: &str, output: &Path) -> Result<()> {
        let mut text_file = tempfile::Builder::new()
            .prefix("parley-text-")
            .suffix(".txt")
            .tempfile()?;
        text_file.write_all(text.as_bytes())?;
        text_file.flush()?;

        let args = exec::fill_args(
            &self.args,
            &[
                ("voice", self.voice_for(lang)),
                ("output", &output.display().to_string()),
                ("textfile", &text_file.path().display().to_string()),
            ],
        );

        let result =
            exec::run_with_timeout(&self.program, &args, None, "synthesis", self.timeout).await?;

        if !result.status.success() {
            return Err(Error::Synthesis {
                backend: self.id.clone(),
                reason: format!(
                    "{} exited with {}: {}",
                    self.program,
                    result.status,
                    exec::stderr_snippet(&result)
                ),
            });
        }

        Ok(())
    }
}

/// OpenAI-compatible speech API backend; the response body is the audio
pub struct HttpSpeechBackend {
    id: String,
    client: reqwest::Client,
    url: String,
    model: String,
    voice: String,
    api_key_env: String,
    timeout: Duration,
}

impl HttpSpeechBackend {
    /// Create from one backend chain entry
    #[must_use]
    pub fn new(config: &TtsBackendConfig, timeout: Duration) -> Self {
        Self {
            id: config.id.clone(),
            client: reqwest::Client::new(),
            url: config.url.clone(),
            model: config.model.clone(),
            voice: config.voice.clone(),
            api_key_env: config.api_key_env.clone(),
            timeout,
        }
    }
}

#[async_trait]
impl SpeechBackend for HttpSpeechBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn available(&self) -> bool {
        !self.url.is_empty() && std::env::var(&self.api_key_env).is_ok()
    }

    async fn synthesize(&self, text: &str, _lang: &str, output: &Path) -> Result<()> {
        let api_key = std::env::var(&self.api_key_env).map_err(|_| Error::Synthesis {
            backend: self.id.clone(),
            reason: format!("{} not set in the environment", self.api_key_env),
        })?;

        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
        }

        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
        };

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout {
                        stage: "synthesis",
                        seconds: self.timeout.as_secs(),
                    }
                } else {
                    Error::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis {
                backend: self.id.clone(),
                reason: format!("speech API error {status}: {body}"),
            });
        }

        let audio = response.bytes().await?;
        tokio::fs::write(output, &audio).await?;
        Ok(())
    }
}

//! Speech synthesis fallback chain
//!
//! Backends are tried in their configured order until one produces a
//! verifiable artifact. Verification is independent of the backend's own
//! return status: the artifact must exist and carry at least the
//! configured minimum bytes, because an engine can report success and
//! still write a truncated or empty file.
//!
//! Artifacts are transient and exclusively owned by one request. Every
//! file any backend touched is deleted before control returns — the
//! paths are RAII temp files, so early returns, playback failures, and
//! panics all release them.
//!
//! When the whole chain fails the text is surfaced to the human directly
//! and the outcome is degraded, not failed: the caller always receives
//! the translated content in some form.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;

use crate::config::SynthesisConfig;
use crate::synth::SpeechBackend;
use crate::voice::Player;
use crate::{Error, Result};

/// What one backend attempt produced
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// A verified artifact of this many bytes
    Produced {
        /// Verified artifact size
        bytes: u64,
    },
    /// No usable artifact
    Failed {
        /// What went wrong (engine error, timeout, or verification)
        reason: String,
    },
}

/// Record of one backend attempt, kept for diagnostics
#[derive(Debug, Clone)]
pub struct SynthesisAttempt {
    /// Backend identifier
    pub backend: String,
    /// Artifact path the backend was given (deleted by the time the
    /// orchestrator returns)
    pub artifact: String,
    /// What happened
    pub outcome: AttemptOutcome,
}

/// Terminal outcome of one synthesis request
#[derive(Debug, Clone)]
pub enum SynthesisOutcome {
    /// A backend produced audio and it was played
    Spoken {
        /// The backend that won
        backend: String,
    },
    /// No audio reached the speaker; the text was surfaced directly
    Degraded {
        /// Why audio could not be delivered
        reason: String,
    },
    /// Nothing to speak; no backend was invoked
    NoText,
}

/// Result of one synthesis request: the attempt trail plus the outcome
#[derive(Debug)]
pub struct SynthesisResult {
    /// One entry per backend tried, in order
    pub attempts: Vec<SynthesisAttempt>,
    /// Terminal outcome
    pub outcome: SynthesisOutcome,
}

impl SynthesisResult {
    /// Whether the request fell back to textual output
    #[must_use]
    pub const fn degraded(&self) -> bool {
        matches!(self.outcome, SynthesisOutcome::Degraded { .. })
    }

    const fn no_text() -> Self {
        Self {
            attempts: Vec::new(),
            outcome: SynthesisOutcome::NoText,
        }
    }
}

/// Owns the backend chain and its fallback policy
pub struct SpeechSynthesisOrchestrator {
    backends: Vec<Arc<dyn SpeechBackend>>,
    min_artifact_bytes: u64,
    attempt_timeout: Duration,
    artifact_dir: Option<PathBuf>,
}

impl SpeechSynthesisOrchestrator {
    /// Create an orchestrator over an ordered backend chain
    #[must_use]
    pub fn new(backends: Vec<Arc<dyn SpeechBackend>>, config: &SynthesisConfig) -> Self {
        Self {
            backends,
            min_artifact_bytes: config.min_artifact_bytes,
            attempt_timeout: Duration::from_secs(config.attempt_timeout_secs),
            artifact_dir: config.artifact_dir.clone(),
        }
    }

    /// The configured backends, in priority order
    #[must_use]
    pub fn backends(&self) -> &[Arc<dyn SpeechBackend>] {
        &self.backends
    }

    /// Synthesize `text` in `lang` and play it through `player`
    ///
    /// # Errors
    ///
    /// Only temp-file creation can error out (disk full); everything a
    /// backend or the player does wrong is absorbed into the result.
    pub async fn speak(
        &self,
        text: &str,
        lang: &str,
        player: &dyn Player,
    ) -> Result<SynthesisResult> {
        if text.is_empty() {
            tracing::warn!(lang, "no text to speak");
            return Ok(SynthesisResult::no_text());
        }

        tracing::info!(lang, "synthesizing speech");

        let mut attempts = Vec::new();
        // every artifact lives here until return; dropping deletes it
        let mut artifacts: Vec<NamedTempFile> = Vec::new();
        let mut chosen: Option<(String, usize)> = None;

        for backend in &self.backends {
            let artifact = self.fresh_artifact()?;
            let path = artifact.path().to_path_buf();
            artifacts.push(artifact);

            match self.attempt(backend.as_ref(), text, lang, &path).await {
                Ok(bytes) => {
                    tracing::info!(backend = backend.id(), bytes, "synthesis succeeded");
                    attempts.push(SynthesisAttempt {
                        backend: backend.id().to_string(),
                        artifact: path.display().to_string(),
                        outcome: AttemptOutcome::Produced { bytes },
                    });
                    chosen = Some((backend.id().to_string(), artifacts.len() - 1));
                    break;
                }
                Err(e) => {
                    tracing::warn!(backend = backend.id(), error = %e, "backend failed, trying next");
                    attempts.push(SynthesisAttempt {
                        backend: backend.id().to_string(),
                        artifact: path.display().to_string(),
                        outcome: AttemptOutcome::Failed {
                            reason: e.to_string(),
                        },
                    });
                }
            }
        }

        let outcome = match chosen {
            Some((backend, index)) => match player.play(artifacts[index].path()).await {
                Ok(()) => SynthesisOutcome::Spoken { backend },
                Err(e) => {
                    tracing::error!(error = %e, "playback failed");
                    surface_text(text, lang);
                    SynthesisOutcome::Degraded {
                        reason: format!("playback failed: {e}"),
                    }
                }
            },
            None => {
                tracing::error!(lang, "all synthesis backends failed, text output only");
                surface_text(text, lang);
                SynthesisOutcome::Degraded {
                    reason: "all synthesis backends failed".to_string(),
                }
            }
        };

        // artifacts (used and failed alike) are deleted here on drop
        Ok(SynthesisResult { attempts, outcome })
    }

    /// Run one backend with a deadline and verify its artifact
    async fn attempt(
        &self,
        backend: &dyn SpeechBackend,
        text: &str,
        lang: &str,
        path: &Path,
    ) -> Result<u64> {
        tokio::time::timeout(self.attempt_timeout, backend.synthesize(text, lang, path))
            .await
            .map_err(|_| Error::Timeout {
                stage: "synthesis",
                seconds: self.attempt_timeout.as_secs(),
            })??;

        verify_artifact(path, self.min_artifact_bytes).map_err(|reason| Error::Synthesis {
            backend: backend.id().to_string(),
            reason,
        })
    }

    /// A fresh uniquely-named artifact path, deleted when dropped
    fn fresh_artifact(&self) -> Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("parley-tts-").suffix(".wav");

        let artifact = match &self.artifact_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(artifact)
    }
}

/// Check the artifact independently of the backend's return status: it
/// must exist and be at least `min_bytes` long
fn verify_artifact(path: &Path, min_bytes: u64) -> std::result::Result<u64, String> {
    let metadata =
        std::fs::metadata(path).map_err(|e| format!("artifact missing: {e}"))?;

    let bytes = metadata.len();
    if bytes < min_bytes {
        return Err(format!(
            "artifact too small: {bytes} bytes (minimum {min_bytes})"
        ));
    }

    Ok(bytes)
}

/// Last-resort delivery: the human gets the text even without audio
fn surface_text(text: &str, lang: &str) {
    println!("\n===> [speech ({lang})]: {text}\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_rejects_small_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.wav");
        std::fs::write(&path, vec![0u8; 10]).unwrap();

        assert!(verify_artifact(&path, 1000).is_err());
        assert_eq!(verify_artifact(&path, 10).unwrap(), 10);
    }

    #[test]
    fn verification_rejects_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        assert!(verify_artifact(&dir.path().join("nope.wav"), 1).is_err());
    }
}

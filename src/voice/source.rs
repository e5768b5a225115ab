//! Utterance capture
//!
//! Composes microphone capture, endpointing, and transcription into a
//! single capability: wait for the speaker to finish one utterance and
//! return its text. The capture device runs on a blocking thread; the
//! cpal callback produces frames, this consumer drains them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::config::CaptureConfig;
use crate::voice::capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
use crate::voice::endpoint::UtteranceDetector;
use crate::voice::transcribe::{Transcriber, Utterance};
use crate::{Error, Result};

/// How long to tolerate a capture device delivering no frames at all
const FRAME_WAIT: Duration = Duration::from_secs(5);

/// Produces one finalized utterance per call
#[async_trait]
pub trait SpeechSource: Send + Sync {
    /// Capture and recognize the next utterance in the given language.
    /// Silence until the deadline yields an empty utterance, which is a
    /// valid terminal outcome rather than an error.
    ///
    /// # Errors
    ///
    /// Returns error on device failure, a hung device (typed timeout), or
    /// a recognition engine failure.
    async fn next_utterance(&self, lang: &str) -> Result<Utterance>;
}

/// Microphone-backed speech source
pub struct MicrophoneSource {
    capture: CaptureConfig,
    transcriber: Arc<dyn Transcriber>,
}

impl MicrophoneSource {
    /// Create a new microphone source
    #[must_use]
    pub fn new(capture: CaptureConfig, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            capture,
            transcriber,
        }
    }
}

#[async_trait]
impl SpeechSource for MicrophoneSource {
    async fn next_utterance(&self, lang: &str) -> Result<Utterance> {
        let capture = self.capture.clone();
        let deadline = Duration::from_secs(self.capture.utterance_timeout_secs);

        tracing::info!(lang, "listening");
        let samples = tokio::task::spawn_blocking(move || capture_segment(&capture, deadline))
            .await
            .map_err(|e| Error::Audio(format!("capture task failed: {e}")))??;

        if samples.is_empty() {
            tracing::info!(lang, "no speech captured");
            return Ok(Utterance::empty());
        }

        let wav = samples_to_wav(&samples, SAMPLE_RATE)?;
        let text = self.transcriber.transcribe(wav, lang).await?;
        Ok(Utterance { text })
    }
}

/// Drain capture frames through the endpoint detector until the utterance
/// is finalized or the deadline passes. Runs on a blocking thread; the
/// cpal stream lives entirely within this call.
fn capture_segment(config: &CaptureConfig, deadline: Duration) -> Result<Vec<i16>> {
    let mut capture = AudioCapture::new(config)?;
    let rx = capture.start()?;
    let mut detector = UtteranceDetector::new();
    let start = Instant::now();

    loop {
        let remaining = deadline.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            tracing::debug!("utterance deadline reached");
            break;
        }

        match rx.recv_timeout(remaining.min(FRAME_WAIT)) {
            Ok(frame) => {
                if detector.feed(&frame) {
                    break;
                }
            }
            Err(Error::Timeout { .. }) => {
                if start.elapsed() >= deadline {
                    break;
                }
                // frames should arrive continuously even in silence;
                // none at all means the device is hung
                capture.stop();
                return Err(Error::Timeout {
                    stage: "capture",
                    seconds: FRAME_WAIT.as_secs(),
                });
            }
            Err(e) => {
                capture.stop();
                return Err(e);
            }
        }
    }

    capture.stop();
    Ok(detector.take_samples())
}

//! Utterance endpointing
//!
//! Decides where a spoken utterance ends in the capture stream: speech
//! starts when frame energy crosses a threshold, and the utterance is
//! finalized after a trailing silence window. One detector produces at
//! most one finalized utterance per session.

/// Minimum frame energy to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech to accept an utterance (in samples at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800; // 0.3 seconds

/// Silence duration that ends an utterance (in samples)
const SILENCE_SAMPLES: usize = 8000; // 0.5 seconds

/// State of the endpoint detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Waiting for speech to start
    Idle,
    /// Speech detected, accumulating the utterance
    Capturing,
    /// Trailing silence observed, utterance finalized
    Complete,
}

/// Detects the end of one spoken utterance
pub struct UtteranceDetector {
    state: EndpointState,
    samples: Vec<i16>,
    speech_samples: usize,
    silence_counter: usize,
}

impl Default for UtteranceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceDetector {
    /// Create a detector in the idle state
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: EndpointState::Idle,
            samples: Vec::new(),
            speech_samples: 0,
            silence_counter: 0,
        }
    }

    /// Feed one PCM frame. Returns true once the utterance is finalized;
    /// frames fed after that are ignored.
    pub fn feed(&mut self, frame: &[i16]) -> bool {
        if self.state == EndpointState::Complete {
            return true;
        }

        let energy = frame_energy(frame);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            EndpointState::Idle => {
                if is_speech {
                    self.state = EndpointState::Capturing;
                    self.samples.extend_from_slice(frame);
                    self.speech_samples = frame.len();
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech started");
                }
            }
            EndpointState::Capturing => {
                self.samples.extend_from_slice(frame);

                if is_speech {
                    self.speech_samples += frame.len();
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += frame.len();
                }

                if self.silence_counter > SILENCE_SAMPLES
                    && self.speech_samples > MIN_SPEECH_SAMPLES
                {
                    self.state = EndpointState::Complete;
                    tracing::debug!(samples = self.samples.len(), "utterance finalized");
                    return true;
                }

                // too much silence without enough speech: discard and rearm
                if self.silence_counter > SILENCE_SAMPLES * 2 {
                    tracing::trace!("noise burst discarded");
                    self.reset();
                }
            }
            EndpointState::Complete => {}
        }

        false
    }

    /// Take the finalized samples, leaving the detector empty
    pub fn take_samples(&mut self) -> Vec<i16> {
        std::mem::take(&mut self.samples)
    }

    /// Whether any speech has been observed yet
    #[must_use]
    pub fn heard_speech(&self) -> bool {
        self.state != EndpointState::Idle || !self.samples.is_empty()
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> EndpointState {
        self.state
    }

    /// Reset to idle, discarding buffered samples
    pub fn reset(&mut self) {
        self.state = EndpointState::Idle;
        self.samples.clear();
        self.speech_samples = 0;
        self.silence_counter = 0;
    }
}

/// RMS energy of one frame, normalized to [0, 1]
#[allow(clippy::cast_precision_loss)]
fn frame_energy(frame: &[i16]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = frame
        .iter()
        .map(|&s| {
            let normalized = f32::from(s) / 32768.0;
            normalized * normalized
        })
        .sum();
    (sum_squares / frame.len() as f32).sqrt()
}

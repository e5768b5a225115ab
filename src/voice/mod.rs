//! Voice processing module
//!
//! Handles audio capture, utterance endpointing, speech recognition, and
//! playback. Recognition engines are opaque: feed them captured audio,
//! get text back.

mod capture;
mod endpoint;
mod playback;
mod source;
mod transcribe;

pub use capture::{AudioCapture, FrameReceiver, SAMPLE_RATE, samples_to_wav};
pub use endpoint::{EndpointState, UtteranceDetector};
pub use playback::{AudioPlayback, Player};
pub use source::{MicrophoneSource, SpeechSource};
pub use transcribe::{
    CommandTranscriber, HttpTranscriber, Transcriber, Utterance, build_transcriber,
};

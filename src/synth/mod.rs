//! Speech synthesis module
//!
//! An ordered chain of TTS backends behind a common trait. The
//! orchestrator owns the fallback policy, artifact verification, and the
//! guaranteed cleanup of transient audio files.

mod backend;
mod orchestrator;

pub use backend::{CommandSpeechBackend, HttpSpeechBackend, SpeechBackend, build_backends};
pub use orchestrator::{
    AttemptOutcome, SpeechSynthesisOrchestrator, SynthesisAttempt, SynthesisOutcome,
    SynthesisResult,
};

//! Parley Gateway - offline-first voice-to-voice translation
//!
//! This library provides the core functionality for the Parley gateway:
//! - Microphone capture and utterance endpointing
//! - Speech recognition through pluggable engines
//! - Text translation with a direct-then-pivot fallback policy
//! - Speech synthesis through an ordered backend chain with guaranteed
//!   artifact cleanup and graceful degradation to textual output
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    Interfaces                         │
//! │        CLI (parley)   │   HTTP API (axum)            │
//! └───────────────────────┬──────────────────────────────┘
//!                         │
//! ┌───────────────────────▼──────────────────────────────┐
//! │                 SessionController                     │
//! │  capture ▸ recognize ▸ translate ▸ synthesize ▸ play │
//! └───────────────────────┬──────────────────────────────┘
//!                         │
//! ┌───────────────────────▼──────────────────────────────┐
//! │              External engines (opaque)                │
//! │  recognizer CLI/API │ translator CLI/API │ TTS chain │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod capabilities;
pub mod config;
pub mod daemon;
pub mod error;
mod exec;
pub mod session;
pub mod synth;
pub mod translate;
pub mod voice;

pub use capabilities::{CapabilityProbe, CapabilityTable, LanguageCapabilities, MissingCapability};
pub use config::Config;
pub use daemon::Daemon;
pub use error::{CapabilityRole, Error, Result};
pub use session::{SessionController, SessionResponse};

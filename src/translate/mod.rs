//! Text translation module
//!
//! The engine is an opaque capability behind a trait; the orchestrator
//! owns the direct-then-pivot fallback policy.

mod engine;
mod orchestrator;

pub use engine::{CommandTranslator, HttpTranslator, TranslationEngine, build_engine};
pub use orchestrator::{TranslatePath, TranslationOrchestrator, TranslationResult};

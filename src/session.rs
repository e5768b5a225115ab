//! Session control
//!
//! One request, one sequential flow: capture and recognize, then
//! translate, then synthesize and play. Each stage's failure is captured
//! into the response instead of aborting the session, and a downstream
//! failure never erases an upstream result — recognized text survives a
//! failed translation, translated text survives silent speakers.

use std::sync::Arc;

use serde::Serialize;

use crate::capabilities::{CapabilityTable, MissingCapability};
use crate::synth::SpeechSynthesisOrchestrator;
use crate::translate::{TranslationOrchestrator, TranslationResult};
use crate::voice::{Player, SpeechSource};

/// What one request produced, including partial results
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// What the speaker said; empty when no speech was captured
    pub recognized_text: String,

    /// The translation, when one was produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,

    /// True when translated text exists but audio could not be delivered
    pub degraded: bool,

    /// Stage failure description, when a stage failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Capabilities the request needed but the process lacks
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_capabilities: Vec<MissingCapability>,
}

impl SessionResponse {
    fn empty() -> Self {
        Self {
            recognized_text: String::new(),
            translated_text: None,
            degraded: false,
            error: None,
            missing_capabilities: Vec::new(),
        }
    }

    fn failed_early(error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::empty()
        }
    }
}

/// Sequences the stages of one voice translation request
pub struct SessionController {
    table: Arc<CapabilityTable>,
    source: Arc<dyn SpeechSource>,
    translator: TranslationOrchestrator,
    synthesizer: SpeechSynthesisOrchestrator,
    player: Arc<dyn Player>,
}

impl SessionController {
    /// Create a controller over the injected stage capabilities
    #[must_use]
    pub fn new(
        table: Arc<CapabilityTable>,
        source: Arc<dyn SpeechSource>,
        translator: TranslationOrchestrator,
        synthesizer: SpeechSynthesisOrchestrator,
        player: Arc<dyn Player>,
    ) -> Self {
        Self {
            table,
            source,
            translator,
            synthesizer,
            player,
        }
    }

    /// Handle one voice translation request: listen in `source_lang`,
    /// speak the translation in `target_lang`
    pub async fn handle_request(&self, source_lang: &str, target_lang: &str) -> SessionResponse {
        tracing::info!(source = source_lang, target = target_lang, "session started");

        // fail fast before touching the microphone
        if !self.table.supported(source_lang) {
            return SessionResponse::failed_early(format!(
                "unsupported source language: {source_lang}"
            ));
        }
        if !self.table.supported(target_lang) {
            return SessionResponse::failed_early(format!(
                "unsupported target language: {target_lang}"
            ));
        }

        let missing = self.table.missing_for(source_lang, target_lang);
        if !missing.is_empty() {
            tracing::warn!(
                source = source_lang,
                target = target_lang,
                missing = missing.len(),
                "missing capabilities, refusing request"
            );
            return SessionResponse {
                error: Some("required language capabilities are not installed".to_string()),
                missing_capabilities: missing,
                ..SessionResponse::empty()
            };
        }

        let utterance = match self.source.next_utterance(source_lang).await {
            Ok(utterance) => utterance,
            Err(e) => {
                tracing::error!(error = %e, "capture/recognition failed");
                return SessionResponse::failed_early(e.to_string());
            }
        };

        // silence is a valid terminal outcome, not an error
        if utterance.is_empty() {
            tracing::info!("no speech captured, session complete");
            return SessionResponse::empty();
        }

        self.complete_with_text(&utterance.text, source_lang, target_lang)
            .await
    }

    /// Run the text half of the pipeline (translate, synthesize, play)
    /// against already-recognized text.
    pub async fn complete_with_text(
        &self,
        recognized: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> SessionResponse {
        let (translated_text, error) = match self
            .translator
            .translate(recognized, source_lang, target_lang)
            .await
        {
            TranslationResult::Success { text, via } => {
                tracing::info!(via = %via, "translation complete");
                (Some(text), None)
            }
            TranslationResult::Failure { cause, via } => {
                tracing::error!(via = %via, error = %cause, "translation failed");
                (None, Some(format!("translation failed: {cause}")))
            }
        };

        let mut degraded = false;
        let mut error = error;

        if let Some(text) = &translated_text {
            match self
                .synthesizer
                .speak(text, target_lang, self.player.as_ref())
                .await
            {
                Ok(result) => degraded = result.degraded(),
                Err(e) => {
                    // temp-file creation failed; the text still stands
                    tracing::error!(error = %e, "synthesis could not start");
                    degraded = true;
                    error.get_or_insert_with(|| e.to_string());
                }
            }
        }

        SessionResponse {
            recognized_text: recognized.to_string(),
            translated_text,
            degraded,
            error,
            missing_capabilities: Vec::new(),
        }
    }
}

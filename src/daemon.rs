//! Daemon - the gateway service
//!
//! Composition root: probes the configured engines once, assembles the
//! immutable capability table, wires the orchestrators together, and
//! serves the HTTP API. All state built here is read-only for the life
//! of the process; changing capabilities means restarting.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::api::{ApiServer, ApiState};
use crate::capabilities::{CapabilityProbe, CapabilityTable};
use crate::config::Config;
use crate::session::SessionController;
use crate::synth::{SpeechBackend, SpeechSynthesisOrchestrator, build_backends};
use crate::translate::{TranslationEngine, TranslationOrchestrator, build_engine};
use crate::voice::{AudioPlayback, MicrophoneSource, build_transcriber};
use crate::Result;

/// The assembled gateway service
pub struct Daemon {
    state: Arc<ApiState>,
    port: u16,
}

impl Daemon {
    /// Probe engines, assemble the capability table, and wire the
    /// pipeline
    ///
    /// # Errors
    ///
    /// Returns error if an engine is misconfigured or no audio output
    /// device is available
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let transcriber = build_transcriber(&config.recognizer)?;
        let engine = build_engine(&config.translator)?;

        let table = Arc::new(assemble_table(&config, engine.as_ref()).await);

        let backends = build_backends(&config.synthesis);
        report_backends(&backends);

        let source = Arc::new(MicrophoneSource::new(config.capture.clone(), transcriber));
        let translator = TranslationOrchestrator::new(Arc::clone(&engine), Arc::clone(&table));
        let synthesizer = SpeechSynthesisOrchestrator::new(backends.clone(), &config.synthesis);
        let player = Arc::new(AudioPlayback::new()?);

        let controller = Arc::new(SessionController::new(
            Arc::clone(&table),
            source,
            translator,
            synthesizer,
            player,
        ));

        let state = Arc::new(ApiState {
            controller,
            table,
            backends,
            mic: Mutex::new(()),
        });

        Ok(Self {
            state,
            port: config.api.port,
        })
    }

    /// Serve the HTTP API until interrupted
    ///
    /// # Errors
    ///
    /// Returns error if the server fails to bind or run
    pub async fn run(self) -> Result<()> {
        ApiServer::new(self.state, self.port).run().await
    }
}

/// Probe the translation engine and the recognizer models, then build
/// the immutable table
pub async fn assemble_table(config: &Config, engine: &dyn TranslationEngine) -> CapabilityTable {
    let translation_languages: BTreeSet<String> = match engine.installed_languages().await {
        Ok(languages) => languages,
        Err(e) => {
            tracing::warn!(error = %e, "could not query installed translation languages");
            BTreeSet::new()
        }
    };

    let probe = CapabilityProbe {
        translation_languages,
        recognition_languages: CapabilityProbe::recognition_from_config(config),
    };

    CapabilityTable::assemble(config, &probe)
}

/// Log which synthesis backends look usable right now
fn report_backends(backends: &[Arc<dyn SpeechBackend>]) {
    for backend in backends {
        if backend.available() {
            tracing::info!(backend = backend.id(), "synthesis backend available");
        } else {
            tracing::warn!(
                backend = backend.id(),
                "synthesis backend not currently usable"
            );
        }
    }
}

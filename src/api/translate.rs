//! Voice translation endpoints
//!
//! `POST /api/translate` runs one full session: listen, recognize,
//! translate, speak. `GET /api/capabilities` reports what the process
//! can currently do per language and per pair.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::session::SessionResponse;

/// Build the translation router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/translate", post(translate))
        .route("/api/capabilities", get(capabilities))
        .with_state(state)
}

/// One voice translation request
#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    /// Language spoken into the microphone
    pub source: String,

    /// Language to speak back
    pub target: String,
}

/// Run one full voice translation session
///
/// The response always carries whatever partial results were obtained;
/// stage failures are reported in-band, not as HTTP errors.
async fn translate(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<TranslateRequest>,
) -> Json<SessionResponse> {
    // one microphone, one session at a time
    let _mic = state.mic.lock().await;

    let response = state
        .controller
        .handle_request(&request.source, &request.target)
        .await;

    Json(response)
}

/// Per-language capability report
#[derive(Debug, Serialize)]
pub struct LanguageReport {
    pub name: String,
    pub recognition: bool,
    pub translation: bool,
}

/// Per-pair translation availability
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairReport {
    pub source_available: bool,
    pub target_available: bool,
    pub can_translate: bool,
}

/// Synthesis backend availability
#[derive(Debug, Serialize)]
pub struct BackendReport {
    pub id: String,
    pub available: bool,
}

/// Everything the process can currently do
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitiesResponse {
    pub languages: BTreeMap<String, LanguageReport>,
    pub translation_pairs: BTreeMap<String, PairReport>,
    pub synthesis_backends: Vec<BackendReport>,
    pub pivot: String,
}

/// Report per-language, per-pair, and per-backend availability
async fn capabilities(State(state): State<Arc<ApiState>>) -> Json<CapabilitiesResponse> {
    let languages: BTreeMap<String, LanguageReport> = state
        .table
        .languages()
        .map(|(code, caps)| {
            (
                code.to_string(),
                LanguageReport {
                    name: caps.name.clone(),
                    recognition: caps.recognition,
                    translation: caps.translation,
                },
            )
        })
        .collect();

    let mut translation_pairs = BTreeMap::new();
    for source in languages.keys() {
        for target in languages.keys() {
            if source == target {
                continue;
            }
            let source_available = state.table.has_translation(source);
            let target_available = state.table.has_translation(target);
            translation_pairs.insert(
                format!("{source}-{target}"),
                PairReport {
                    source_available,
                    target_available,
                    can_translate: source_available && target_available,
                },
            );
        }
    }

    let synthesis_backends = state
        .backends
        .iter()
        .map(|backend| BackendReport {
            id: backend.id().to_string(),
            available: backend.available(),
        })
        .collect();

    Json(CapabilitiesResponse {
        languages,
        translation_pairs,
        synthesis_backends,
        pivot: state.table.pivot().to_string(),
    })
}

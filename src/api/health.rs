//! Health check endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use super::ApiState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed readiness response
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
}

/// Individual readiness checks
#[derive(Serialize)]
pub struct ReadinessChecks {
    pub recognition: CheckResult,
    pub translation: CheckResult,
    pub synthesis: CheckResult,
}

/// Result of a single readiness check
#[derive(Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    const fn ok() -> Self {
        Self {
            status: "ok",
            message: None,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            status: "fail",
            message: Some(message.into()),
        }
    }

    fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: "unavailable",
            message: Some(message.into()),
        }
    }
}

/// Liveness probe - is the service running?
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe - can the gateway serve a translation request?
async fn ready(State(state): State<Arc<ApiState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let recognition = check_recognition(&state);
    let translation = check_translation(&state);
    let synthesis = check_synthesis(&state);

    // a gateway with no usable TTS backend still serves requests (text
    // fallback), so synthesis does not gate readiness
    let all_ok = recognition.status == "ok" && translation.status == "ok";

    let status = if all_ok { "ok" } else { "degraded" };
    let http_status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(ReadinessResponse {
            status,
            checks: ReadinessChecks {
                recognition,
                translation,
                synthesis,
            },
        }),
    )
}

/// At least one language must have a usable recognizer
fn check_recognition(state: &ApiState) -> CheckResult {
    let usable = state
        .table
        .languages()
        .filter(|(_, caps)| caps.recognition)
        .count();
    if usable == 0 {
        CheckResult::fail("no language has a usable recognizer")
    } else {
        CheckResult::ok()
    }
}

/// At least one language must be installed in the translation engine
fn check_translation(state: &ApiState) -> CheckResult {
    let installed = state
        .table
        .languages()
        .filter(|(_, caps)| caps.translation)
        .count();
    if installed == 0 {
        CheckResult::fail("no language is installed in the translation engine")
    } else {
        CheckResult::ok()
    }
}

/// Whether any configured TTS backend is currently usable
fn check_synthesis(state: &ApiState) -> CheckResult {
    if state.backends.iter().any(|b| b.available()) {
        CheckResult::ok()
    } else {
        CheckResult::unavailable("no backend currently usable, text fallback only")
    }
}

/// Build health router (liveness only, no state needed)
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Build readiness router (needs state for checks)
pub fn ready_router(state: Arc<ApiState>) -> Router {
    Router::new().route("/ready", get(ready)).with_state(state)
}

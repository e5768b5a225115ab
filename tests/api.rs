//! API endpoint integration tests

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use tokio::sync::Mutex;
use tower::ServiceExt;

use parley_gateway::api::{ApiState, health, translate};
use parley_gateway::config::SynthesisConfig;
use parley_gateway::synth::{SpeechBackend, SpeechSynthesisOrchestrator};
use parley_gateway::translate::{TranslationEngine, TranslationOrchestrator};
use parley_gateway::SessionController;

mod common;
use common::{BackendScript, FakeBackend, FakeEngine, FakePlayer, FakeSource, full_table};

/// Build a test API router over a fully faked pipeline
fn build_test_router(artifact_dir: &std::path::Path) -> Router {
    let table = Arc::new(full_table(&["en", "hi"]));
    let engine = Arc::new(FakeEngine::new(&[("en", "hi", Ok("नमस्ते"))]));
    let backend = Arc::new(FakeBackend::new("fake-tts", BackendScript::Write(2000)));
    let backends: Vec<Arc<dyn SpeechBackend>> = vec![backend];

    let synthesis = SynthesisConfig {
        min_artifact_bytes: 100,
        artifact_dir: Some(artifact_dir.to_path_buf()),
        ..SynthesisConfig::default()
    };

    let controller = Arc::new(SessionController::new(
        Arc::clone(&table),
        Arc::new(FakeSource::hearing("hello")),
        TranslationOrchestrator::new(engine as Arc<dyn TranslationEngine>, Arc::clone(&table)),
        SpeechSynthesisOrchestrator::new(backends.clone(), &synthesis),
        Arc::new(FakePlayer::new()),
    ));

    let state = Arc::new(ApiState {
        controller,
        table,
        backends,
        mic: Mutex::new(()),
    });

    Router::new()
        .merge(health::router())
        .merge(health::ready_router(Arc::clone(&state)))
        .merge(translate::router(state))
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["checks"]["recognition"]["status"], "ok");
    assert_eq!(json["checks"]["translation"]["status"], "ok");
    assert_eq!(json["checks"]["synthesis"]["status"], "ok");
}

#[tokio::test]
async fn test_capabilities_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/capabilities")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["pivot"], "en");
    assert_eq!(json["languages"]["hi"]["recognition"], true);
    assert_eq!(json["translationPairs"]["en-hi"]["canTranslate"], true);
    assert_eq!(json["synthesisBackends"][0]["id"], "fake-tts");
    assert_eq!(json["synthesisBackends"][0]["available"], true);
}

#[tokio::test]
async fn test_translate_endpoint_full_session() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/translate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"source":"en","target":"hi"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["recognizedText"], "hello");
    assert_eq!(json["translatedText"], "नमस्ते");
    assert_eq!(json["degraded"], false);
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn test_translate_endpoint_reports_missing_capability() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/translate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"source":"en","target":"de"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    // "de" is not in the test table; the error is in-band, not an HTTP error
    let json = json_body(response).await;
    assert_eq!(json["recognizedText"], "");
    assert!(json["error"].as_str().unwrap().contains("unsupported"));
}

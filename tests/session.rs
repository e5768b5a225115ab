//! End-to-end session sequencing tests
//!
//! Drives the controller with fakes at every boundary and checks the
//! partial-result guarantees: a downstream failure never erases an
//! upstream success, silence ends the session early, and missing
//! capabilities are reported before the microphone is touched.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use parley_gateway::SessionController;
use parley_gateway::capabilities::CapabilityTable;
use parley_gateway::config::SynthesisConfig;
use parley_gateway::synth::{SpeechBackend, SpeechSynthesisOrchestrator};
use parley_gateway::translate::{TranslationEngine, TranslationOrchestrator};

mod common;
use common::{BackendScript, FakeBackend, FakeEngine, FakePlayer, FakeSource, full_table, table_from};

struct Fixture {
    source: Arc<FakeSource>,
    engine: Arc<FakeEngine>,
    backend: Arc<FakeBackend>,
    player: Arc<FakePlayer>,
    controller: SessionController,
}

/// Wire a controller out of fakes; artifacts land in `artifact_dir`
fn fixture(
    table: CapabilityTable,
    heard: &str,
    pairs: &[(&str, &str, Result<&str, &str>)],
    backend_script: BackendScript,
    artifact_dir: &std::path::Path,
) -> Fixture {
    let table = Arc::new(table);
    let source = Arc::new(FakeSource::hearing(heard));
    let engine = Arc::new(FakeEngine::new(pairs));
    let backend = Arc::new(FakeBackend::new("fake-tts", backend_script));
    let player = Arc::new(FakePlayer::new());

    let synthesis = SynthesisConfig {
        min_artifact_bytes: 100,
        artifact_dir: Some(artifact_dir.to_path_buf()),
        ..SynthesisConfig::default()
    };

    let translator = TranslationOrchestrator::new(
        Arc::clone(&engine) as Arc<dyn TranslationEngine>,
        Arc::clone(&table),
    );
    let synthesizer = SpeechSynthesisOrchestrator::new(
        vec![Arc::clone(&backend) as Arc<dyn SpeechBackend>],
        &synthesis,
    );

    let controller = SessionController::new(
        table,
        Arc::clone(&source) as Arc<dyn parley_gateway::voice::SpeechSource>,
        translator,
        synthesizer,
        Arc::clone(&player) as Arc<dyn parley_gateway::voice::Player>,
    );

    Fixture {
        source,
        engine,
        backend,
        player,
        controller,
    }
}

#[tokio::test]
async fn full_pipeline_hello_to_hindi() {
    let dir = tempfile::tempdir().unwrap();
    let f = fixture(
        full_table(&["en", "hi"]),
        "hello",
        &[("en", "hi", Ok("नमस्ते"))],
        BackendScript::Write(2000),
        dir.path(),
    );

    let response = f.controller.handle_request("en", "hi").await;

    assert_eq!(response.recognized_text, "hello");
    assert_eq!(response.translated_text.as_deref(), Some("नमस्ते"));
    assert!(!response.degraded);
    assert!(response.error.is_none());
    assert!(response.missing_capabilities.is_empty());
    assert_eq!(f.player.play_count(), 1);
}

#[tokio::test]
async fn silence_ends_the_session_without_translation_or_synthesis() {
    let dir = tempfile::tempdir().unwrap();
    let f = fixture(
        full_table(&["en", "hi"]),
        "",
        &[("en", "hi", Ok("नमस्ते"))],
        BackendScript::Write(2000),
        dir.path(),
    );

    let response = f.controller.handle_request("en", "hi").await;

    assert_eq!(response.recognized_text, "");
    assert!(response.translated_text.is_none());
    assert!(!response.degraded);
    assert!(response.error.is_none());
    assert_eq!(f.engine.calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn translation_failure_keeps_the_recognized_text() {
    let dir = tempfile::tempdir().unwrap();
    let f = fixture(
        full_table(&["en", "hi"]),
        "hello",
        &[("en", "hi", Err("model corrupted"))],
        BackendScript::Write(2000),
        dir.path(),
    );

    let response = f.controller.handle_request("en", "hi").await;

    assert_eq!(response.recognized_text, "hello");
    assert!(response.translated_text.is_none());
    let error = response.error.expect("translation failure should be reported");
    assert!(error.contains("model corrupted"));
    // nothing to speak, so the chain is never started
    assert_eq!(f.backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn synthesis_degradation_keeps_the_translated_text() {
    let dir = tempfile::tempdir().unwrap();
    let f = fixture(
        full_table(&["en", "hi"]),
        "hello",
        &[("en", "hi", Ok("नमस्ते"))],
        BackendScript::Fail,
        dir.path(),
    );

    let response = f.controller.handle_request("en", "hi").await;

    assert_eq!(response.recognized_text, "hello");
    assert_eq!(response.translated_text.as_deref(), Some("नमस्ते"));
    assert!(response.degraded);
    assert_eq!(f.player.play_count(), 0);
}

#[tokio::test]
async fn missing_capabilities_fail_before_capture() {
    let dir = tempfile::tempdir().unwrap();
    // target language has no translation installed
    let f = fixture(
        table_from([("en", true, true), ("hi", false, false)]),
        "hello",
        &[],
        BackendScript::Write(2000),
        dir.path(),
    );

    let response = f.controller.handle_request("en", "hi").await;

    assert!(response.error.is_some());
    assert_eq!(response.missing_capabilities.len(), 1);
    assert_eq!(response.missing_capabilities[0].role, "target");
    assert_eq!(response.missing_capabilities[0].kind, "translation");
    assert_eq!(response.missing_capabilities[0].lang, "hi");
    // the microphone was never opened
    assert_eq!(f.source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unsupported_language_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let f = fixture(
        full_table(&["en", "hi"]),
        "hello",
        &[],
        BackendScript::Write(2000),
        dir.path(),
    );

    let response = f.controller.handle_request("en", "xx").await;

    assert!(response.error.unwrap().contains("unsupported target language"));
    assert_eq!(f.source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn identity_pair_echoes_the_utterance() {
    let dir = tempfile::tempdir().unwrap();
    let f = fixture(
        // recognition only; identity pairs never consult translation
        table_from([("en", true, false)]),
        "testing one two",
        &[],
        BackendScript::Write(2000),
        dir.path(),
    );

    let response = f.controller.handle_request("en", "en").await;

    assert_eq!(response.recognized_text, "testing one two");
    assert_eq!(response.translated_text.as_deref(), Some("testing one two"));
    assert!(!response.degraded);
    assert_eq!(f.engine.calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.player.play_count(), 1);
}

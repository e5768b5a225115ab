//! Shared test fakes
//!
//! The pipeline is exercised hardware-free: fakes implement the capability
//! traits and record what they were asked to do.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use parley_gateway::capabilities::{CapabilityTable, LanguageCapabilities};
use parley_gateway::synth::SpeechBackend;
use parley_gateway::translate::TranslationEngine;
use parley_gateway::voice::{Player, SpeechSource, Utterance};
use parley_gateway::{Error, Result};

/// Capability table where every listed language can do everything
pub fn full_table(langs: &[&str]) -> CapabilityTable {
    table_from(langs.iter().map(|&code| (code, true, true)))
}

/// Capability table built from (code, recognition, translation) rows
pub fn table_from<'a>(rows: impl IntoIterator<Item = (&'a str, bool, bool)>) -> CapabilityTable {
    let languages: BTreeMap<String, LanguageCapabilities> = rows
        .into_iter()
        .map(|(code, recognition, translation)| {
            (
                code.to_string(),
                LanguageCapabilities {
                    name: code.to_uppercase(),
                    recognition,
                    translation,
                },
            )
        })
        .collect();
    CapabilityTable::from_parts(languages, "en")
}

/// Speech source that "hears" a fixed utterance
pub struct FakeSource {
    text: String,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn hearing(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SpeechSource for FakeSource {
    async fn next_utterance(&self, _lang: &str) -> Result<Utterance> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Utterance {
            text: self.text.clone(),
        })
    }
}

/// Translation engine backed by a fixed (from, to) -> result map
pub struct FakeEngine {
    responses: HashMap<(String, String), std::result::Result<String, String>>,
    pub calls: AtomicUsize,
}

impl FakeEngine {
    pub fn new(pairs: &[(&str, &str, std::result::Result<&str, &str>)]) -> Self {
        let responses = pairs
            .iter()
            .map(|(from, to, result)| {
                (
                    ((*from).to_string(), (*to).to_string()),
                    result.map(str::to_string).map_err(str::to_string),
                )
            })
            .collect();
        Self {
            responses,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TranslationEngine for FakeEngine {
    async fn installed_languages(&self) -> Result<BTreeSet<String>> {
        Ok(BTreeSet::new())
    }

    async fn translate(&self, _text: &str, from: &str, to: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(&(from.to_string(), to.to_string())) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(reason)) => Err(Error::Translation(reason.clone())),
            None => Err(Error::Translation(format!("no model for {from}->{to}"))),
        }
    }
}

/// What a fake backend should do when invoked
pub enum BackendScript {
    /// Write an artifact of this many bytes and report success
    Write(usize),
    /// Report failure without writing anything
    Fail,
    /// Never return (exercises the per-attempt deadline)
    Hang,
}

/// Scripted TTS backend that records how often it was invoked
pub struct FakeBackend {
    id: String,
    script: BackendScript,
    pub calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new(id: &str, script: BackendScript) -> Self {
        Self {
            id: id.to_string(),
            script,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SpeechBackend for FakeBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn available(&self) -> bool {
        true
    }

    async fn synthesize(&self, _text: &str, _lang: &str, output: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            BackendScript::Write(bytes) => {
                std::fs::write(output, vec![0u8; *bytes])?;
                Ok(())
            }
            BackendScript::Fail => Err(Error::Synthesis {
                backend: self.id.clone(),
                reason: "engine exploded".to_string(),
            }),
            BackendScript::Hang => {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }
}

/// Player that records what it was asked to play instead of making noise
pub struct FakePlayer {
    fail: bool,
    pub played: Mutex<Vec<PathBuf>>,
}

impl FakePlayer {
    pub fn new() -> Self {
        Self {
            fail: false,
            played: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            played: Mutex::new(Vec::new()),
        }
    }

    pub fn play_count(&self) -> usize {
        self.played.lock().unwrap().len()
    }
}

#[async_trait]
impl Player for FakePlayer {
    async fn play(&self, path: &Path) -> Result<()> {
        // the artifact must still exist while it is being played
        assert!(path.exists(), "artifact deleted before playback");
        self.played.lock().unwrap().push(path.to_path_buf());
        if self.fail {
            return Err(Error::Playback("speaker unplugged".to_string()));
        }
        Ok(())
    }
}

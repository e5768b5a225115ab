//! Translation engines
//!
//! Given (text, from, to), return translated text or fail. Engines also
//! report which languages they have installed; the capability table is
//! assembled from that at startup.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{EngineKind, TranslatorConfig};
use crate::exec;
use crate::{Error, Result};

/// Translates text between installed languages
#[async_trait]
pub trait TranslationEngine: Send + Sync {
    /// Languages the engine has models installed for
    ///
    /// # Errors
    ///
    /// Returns error if the engine cannot be queried
    async fn installed_languages(&self) -> Result<BTreeSet<String>>;

    /// Translate `text` from `from` to `to`
    ///
    /// # Errors
    ///
    /// Returns error if no model covers the pair or the engine fails
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String>;
}

/// Build the configured translation engine
///
/// # Errors
///
/// Returns error if the http kind is selected with an unusable URL
pub fn build_engine(config: &TranslatorConfig) -> Result<Arc<dyn TranslationEngine>> {
    match config.kind {
        EngineKind::Command => Ok(Arc::new(CommandTranslator::new(config))),
        EngineKind::Http => {
            if config.url.is_empty() {
                return Err(Error::Config(
                    "translator.url required for the http engine".to_string(),
                ));
            }
            Ok(Arc::new(HttpTranslator::new(config)))
        }
    }
}

/// Offline translator invoked as a subprocess; text goes in on stdin,
/// the translation comes back on stdout
pub struct CommandTranslator {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandTranslator {
    /// Create from translator configuration
    #[must_use]
    pub fn new(config: &TranslatorConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl TranslationEngine for CommandTranslator {
    async fn installed_languages(&self) -> Result<BTreeSet<String>> {
        let args = vec!["--list-languages".to_string()];
        let output =
            exec::run_with_timeout(&self.program, &args, None, "translation", self.timeout).await?;

        if !output.status.success() {
            return Err(Error::Translation(format!(
                "{} --list-languages exited with {}: {}",
                self.program,
                output.status,
                exec::stderr_snippet(&output)
            )));
        }

        let languages = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();
        Ok(languages)
    }

    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String> {
        let args = exec::fill_args(&self.args, &[("from", from), ("to", to)]);
        let output = exec::run_with_timeout(
            &self.program,
            &args,
            Some(text.as_bytes()),
            "translation",
            self.timeout,
        )
        .await?;

        if !output.status.success() {
            return Err(Error::Translation(format!(
                "{from}->{to} failed: {}",
                exec::stderr_snippet(&output)
            )));
        }

        let result = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::debug!(from, to, "translated");
        Ok(result)
    }
}

/// Response from a LibreTranslate-compatible endpoint
#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// One language entry from the `/languages` endpoint
#[derive(Deserialize)]
struct LanguageEntry {
    code: String,
}

/// LibreTranslate-compatible HTTP translation engine
pub struct HttpTranslator {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpTranslator {
    /// Create from translator configuration; the API key is read from the
    /// configured environment variable if set
    #[must_use]
    pub fn new(config: &TranslatorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            api_key: std::env::var(&config.api_key_env).ok(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// The sibling `/languages` endpoint of the translate URL
    fn languages_url(&self) -> String {
        self.url
            .strip_suffix("/translate")
            .map_or_else(|| format!("{}/languages", self.url), |base| {
                format!("{base}/languages")
            })
    }
}

#[async_trait]
impl TranslationEngine for HttpTranslator {
    async fn installed_languages(&self) -> Result<BTreeSet<String>> {
        let response = self
            .client
            .get(self.languages_url())
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Translation(format!(
                "languages query failed with {}",
                response.status()
            )));
        }

        let entries: Vec<LanguageEntry> = response.json().await?;
        Ok(entries.into_iter().map(|entry| entry.code).collect())
    }

    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String> {
        #[derive(serde::Serialize)]
        struct TranslateRequest<'a> {
            q: &'a str,
            source: &'a str,
            target: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            api_key: Option<&'a str>,
        }

        let request = TranslateRequest {
            q: text,
            source: from,
            target: to,
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout {
                        stage: "translation",
                        seconds: self.timeout.as_secs(),
                    }
                } else {
                    Error::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Translation(format!(
                "{from}->{to} failed with {status}: {body}"
            )));
        }

        let result: TranslateResponse = response.json().await?;
        tracing::debug!(from, to, "translated");
        Ok(result.translated_text)
    }
}

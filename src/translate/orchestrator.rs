//! Translation fallback policy
//!
//! Direct translation first; when that fails and neither side is the
//! pivot language, a two-hop attempt through the pivot. On total failure
//! the direct attempt's error is the one surfaced — it names the pair the
//! caller actually asked for. Exactly one direct and at most one two-hop
//! attempt; the engine is a local model lookup, not a flaky network call,
//! so there is no retry loop.

use std::sync::Arc;

use serde::Serialize;

use crate::capabilities::CapabilityTable;
use crate::error::CapabilityRole;
use crate::translate::TranslationEngine;
use crate::{Error, Result};

/// Which route produced (or last attempted) the translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslatePath {
    /// Single hop, source directly to target
    Direct,
    /// Two hops through the pivot language
    Pivot,
}

impl std::fmt::Display for TranslatePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Pivot => write!(f, "pivot"),
        }
    }
}

/// Outcome of one translation request
#[derive(Debug)]
pub enum TranslationResult {
    /// Translation produced
    Success {
        /// The translated text
        text: String,
        /// The route that produced it
        via: TranslatePath,
    },
    /// No translation could be produced
    Failure {
        /// The surfaced cause (the direct attempt's error)
        cause: Error,
        /// The last route attempted
        via: TranslatePath,
    },
}

impl TranslationResult {
    /// The translated text, if any
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Success { text, .. } => Some(text),
            Self::Failure { .. } => None,
        }
    }

    /// Whether a translation was produced
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Owns the direct-then-pivot translation policy
pub struct TranslationOrchestrator {
    engine: Arc<dyn TranslationEngine>,
    table: Arc<CapabilityTable>,
}

impl TranslationOrchestrator {
    /// Create an orchestrator over an engine and capability table
    #[must_use]
    pub fn new(engine: Arc<dyn TranslationEngine>, table: Arc<CapabilityTable>) -> Self {
        Self { engine, table }
    }

    /// Translate `text` from `source` to `target`
    ///
    /// Empty text and identity pairs short-circuit without touching the
    /// engine; so does a missing language capability.
    pub async fn translate(&self, text: &str, source: &str, target: &str) -> TranslationResult {
        if text.is_empty() {
            return TranslationResult::Success {
                text: String::new(),
                via: TranslatePath::Direct,
            };
        }

        if source == target {
            return TranslationResult::Success {
                text: text.to_string(),
                via: TranslatePath::Direct,
            };
        }

        if !self.table.has_translation(source) {
            return TranslationResult::Failure {
                cause: Error::CapabilityMissing {
                    role: CapabilityRole::Source,
                    kind: "translation",
                    lang: source.to_string(),
                },
                via: TranslatePath::Direct,
            };
        }
        if !self.table.has_translation(target) {
            return TranslationResult::Failure {
                cause: Error::CapabilityMissing {
                    role: CapabilityRole::Target,
                    kind: "translation",
                    lang: target.to_string(),
                },
                via: TranslatePath::Direct,
            };
        }

        let direct_err = match self.engine.translate(text, source, target).await {
            Ok(result) => {
                tracing::info!(source, target, "translated directly");
                return TranslationResult::Success {
                    text: result,
                    via: TranslatePath::Direct,
                };
            }
            Err(e) => e,
        };

        let pivot = self.table.pivot();
        if source == pivot || target == pivot {
            tracing::warn!(source, target, error = %direct_err, "translation failed");
            return TranslationResult::Failure {
                cause: direct_err,
                via: TranslatePath::Direct,
            };
        }

        tracing::warn!(
            source,
            target,
            pivot,
            error = %direct_err,
            "direct translation failed, attempting two-hop"
        );

        match self.two_hop(text, source, pivot, target).await {
            Ok(result) => {
                tracing::info!(source, target, pivot, "translated via pivot");
                TranslationResult::Success {
                    text: result,
                    via: TranslatePath::Pivot,
                }
            }
            Err(pivot_err) => {
                // the direct error names the pair the caller asked for;
                // the pivot error only describes the workaround
                tracing::warn!(source, target, pivot, error = %pivot_err, "two-hop translation failed");
                TranslationResult::Failure {
                    cause: direct_err,
                    via: TranslatePath::Pivot,
                }
            }
        }
    }

    /// Chain source→pivot→target
    async fn two_hop(&self, text: &str, source: &str, pivot: &str, target: &str) -> Result<String> {
        let intermediate = self.engine.translate(text, source, pivot).await?;
        tracing::debug!(source, pivot, "first hop complete");
        self.engine.translate(&intermediate, pivot, target).await
    }
}

//! Language capability table
//!
//! Built once at startup from configuration plus engine probing, then
//! shared read-only across sessions. Orchestrators receive the table at
//! construction; rebuilding it requires a restart.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::{Config, EngineKind};
use crate::error::CapabilityRole;

/// What one supported language can do
#[derive(Debug, Clone, Serialize)]
pub struct LanguageCapabilities {
    /// Display name ("Hindi")
    pub name: String,

    /// A recognizer model or endpoint is available for this language
    pub recognition: bool,

    /// The translation engine has this language installed
    pub translation: bool,
}

/// A capability the requested pair needs but the process does not have
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingCapability {
    /// "source" or "target"
    pub role: String,

    /// "recognition" or "translation"
    pub kind: String,

    /// Language code
    pub lang: String,
}

impl MissingCapability {
    fn new(role: CapabilityRole, kind: &str, lang: &str) -> Self {
        Self {
            role: role.to_string(),
            kind: kind.to_string(),
            lang: lang.to_string(),
        }
    }
}

/// Results of probing the installed engines at startup
#[derive(Debug, Clone, Default)]
pub struct CapabilityProbe {
    /// Languages the translation engine reports as installed
    pub translation_languages: BTreeSet<String>,

    /// Languages with a usable recognizer
    pub recognition_languages: BTreeSet<String>,
}

impl CapabilityProbe {
    /// Determine recognizer availability from configuration alone: the
    /// command kind needs the per-language model directory on disk, the
    /// http kind needs its API key in the environment.
    #[must_use]
    pub fn recognition_from_config(config: &Config) -> BTreeSet<String> {
        match config.recognizer.kind {
            EngineKind::Command => config
                .languages
                .keys()
                .filter(|code| {
                    config
                        .recognizer
                        .model_dirs
                        .get(*code)
                        .is_some_and(|dir| dir.exists())
                })
                .cloned()
                .collect(),
            EngineKind::Http => {
                if std::env::var(&config.recognizer.api_key_env).is_ok() {
                    config.languages.keys().cloned().collect()
                } else {
                    BTreeSet::new()
                }
            }
        }
    }
}

/// Immutable per-language capability registry
#[derive(Debug, Clone)]
pub struct CapabilityTable {
    languages: BTreeMap<String, LanguageCapabilities>,
    pivot: String,
}

impl CapabilityTable {
    /// Assemble the table from the configured language set and probe
    /// results
    #[must_use]
    pub fn assemble(config: &Config, probe: &CapabilityProbe) -> Self {
        let languages = config
            .languages
            .iter()
            .map(|(code, name)| {
                (
                    code.clone(),
                    LanguageCapabilities {
                        name: name.clone(),
                        recognition: probe.recognition_languages.contains(code),
                        translation: probe.translation_languages.contains(code),
                    },
                )
            })
            .collect();

        let table = Self {
            languages,
            pivot: config.translator.pivot.clone(),
        };

        tracing::info!(
            languages = table.languages.len(),
            recognition = probe.recognition_languages.len(),
            translation = probe.translation_languages.len(),
            pivot = %table.pivot,
            "capability table assembled"
        );

        table
    }

    /// Build a table directly from parts (used by tests and fakes)
    #[must_use]
    pub fn from_parts(
        languages: BTreeMap<String, LanguageCapabilities>,
        pivot: impl Into<String>,
    ) -> Self {
        Self {
            languages,
            pivot: pivot.into(),
        }
    }

    /// Is this language in the supported set at all?
    #[must_use]
    pub fn supported(&self, lang: &str) -> bool {
        self.languages.contains_key(lang)
    }

    /// Does the translation engine have this language installed?
    #[must_use]
    pub fn has_translation(&self, lang: &str) -> bool {
        self.languages.get(lang).is_some_and(|c| c.translation)
    }

    /// Is a recognizer available for this language?
    #[must_use]
    pub fn has_recognition(&self, lang: &str) -> bool {
        self.languages.get(lang).is_some_and(|c| c.recognition)
    }

    /// The configured pivot language for two-hop translation
    #[must_use]
    pub fn pivot(&self) -> &str {
        &self.pivot
    }

    /// Everything a session needs that the process lacks for this pair.
    /// Recognition is only needed on the source side; translation on both.
    #[must_use]
    pub fn missing_for(&self, source: &str, target: &str) -> Vec<MissingCapability> {
        let mut missing = Vec::new();

        if !self.has_recognition(source) {
            missing.push(MissingCapability::new(
                CapabilityRole::Source,
                "recognition",
                source,
            ));
        }

        // identity pairs never touch the translation engine
        if source != target {
            if !self.has_translation(source) {
                missing.push(MissingCapability::new(
                    CapabilityRole::Source,
                    "translation",
                    source,
                ));
            }
            if !self.has_translation(target) {
                missing.push(MissingCapability::new(
                    CapabilityRole::Target,
                    "translation",
                    target,
                ));
            }
        }

        missing
    }

    /// Iterate supported languages with their capabilities
    pub fn languages(&self) -> impl Iterator<Item = (&str, &LanguageCapabilities)> {
        self.languages.iter().map(|(code, caps)| (code.as_str(), caps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, bool, bool)]) -> CapabilityTable {
        let languages = entries
            .iter()
            .map(|(code, recognition, translation)| {
                (
                    (*code).to_string(),
                    LanguageCapabilities {
                        name: (*code).to_uppercase(),
                        recognition: *recognition,
                        translation: *translation,
                    },
                )
            })
            .collect();
        CapabilityTable::from_parts(languages, "en")
    }

    #[test]
    fn missing_for_reports_each_side() {
        let table = table(&[("en", true, true), ("hi", false, false)]);

        let missing = table.missing_for("hi", "en");
        assert_eq!(missing.len(), 2);
        assert_eq!(missing[0].role, "source");
        assert_eq!(missing[0].kind, "recognition");
        assert_eq!(missing[1].kind, "translation");
        assert_eq!(missing[1].lang, "hi");
    }

    #[test]
    fn identity_pair_skips_translation_checks() {
        let table = table(&[("en", true, false)]);
        assert!(table.missing_for("en", "en").is_empty());
    }

    #[test]
    fn complete_pair_has_no_gaps() {
        let table = table(&[("en", true, true), ("de", false, true)]);
        assert!(table.missing_for("en", "de").is_empty());
    }
}

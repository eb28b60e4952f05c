//! Few-shot prompt configuration for the formula ranker.
//!
//! Loaded once at start-up from a scenario's `prompt.json` and shared
//! read-only. Its fingerprint identifies the prompt version in logs and on
//! `/health`.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::template::DeclareFormula;
use crate::error::{LemmingError, Result};
use crate::types::Translation;

pub const DEFAULT_HEADER: &str = "Translate natural language sentences into DECLARE patterns. \
Answer with one PATTERN line naming the template and one SYMBOLS line listing its activities.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_header")]
    pub header: String,
    #[serde(default)]
    pub examples: Vec<Translation>,
}

fn default_header() -> String {
    DEFAULT_HEADER.to_string()
}

/// `prompt.json` is either a full config or a bare list of examples.
#[derive(Deserialize)]
#[serde(untagged)]
enum PromptFile {
    Config(PromptConfig),
    Examples(Vec<Translation>),
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER, Vec::new())
    }
}

impl PromptConfig {
    pub fn new(header: impl Into<String>, examples: Vec<Translation>) -> Self {
        Self {
            header: header.into(),
            examples,
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let file: PromptFile = serde_json::from_str(text)
            .map_err(|e| LemmingError::InvalidInput(format!("prompt config: {}", e)))?;
        Ok(match file {
            PromptFile::Config(config) => config,
            PromptFile::Examples(examples) => Self::new(DEFAULT_HEADER, examples),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// SHA-256 over the canonical JSON of the config, hex encoded.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&canonical))
    }

    /// Examples whose formula parses, paired with it.
    pub fn parsed_examples(&self) -> impl Iterator<Item = (&Translation, DeclareFormula)> {
        self.examples
            .iter()
            .filter_map(|t| t.formula.parse().ok().map(|f| (t, f)))
    }

    /// Every activity named by an example formula.
    pub fn activities(&self) -> BTreeSet<String> {
        self.parsed_examples()
            .flat_map(|(_, f)| f.activities)
            .collect()
    }

    /// Few-shot prompt ending with an open `PATTERN:` line for `utterance`.
    pub fn render(&self, utterance: &str) -> String {
        let mut out = String::new();
        out.push_str(&self.header);
        out.push_str("\n\n");
        for (example, formula) in self.parsed_examples() {
            out.push_str(&format!(
                "NL: {}\nPATTERN: {}\nSYMBOLS: {}\n\n",
                example.utterance.trim(),
                formula.template,
                formula.activities.join(", ")
            ));
        }
        out.push_str(&format!("NL: {}\nPATTERN:", utterance.trim()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn example(utterance: &str, formula: &str) -> Translation {
        Translation {
            utterance: utterance.to_string(),
            formula: formula.to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn accepts_bare_example_list() {
        let config = PromptConfig::from_json_str(
            r#"[{"utterance": "Send a Slack", "formula": "Existence Slack"}]"#,
        )
        .unwrap();
        assert_eq!(config.header, DEFAULT_HEADER);
        assert_eq!(config.examples.len(), 1);
    }

    #[test]
    fn render_lists_examples_then_the_query() {
        let config = PromptConfig::new(
            "Header.",
            vec![
                example("After Slack, send Gmail", "Response Slack Gmail"),
                example("garbage", "NotATemplate X"),
            ],
        );
        let prompt = config.render("  Never use Gmail ");
        assert_eq!(
            prompt,
            "Header.\n\nNL: After Slack, send Gmail\nPATTERN: Response\nSYMBOLS: Slack, Gmail\n\nNL: Never use Gmail\nPATTERN:"
        );
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = PromptConfig::new("h", vec![example("x", "Existence A")]);
        let b = PromptConfig::new("h", vec![example("x", "Existence B")]);
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn activities_come_from_parsable_examples() {
        let config = PromptConfig::new(
            "h",
            vec![example("a", "Response Slack Gmail"), example("b", "Absence Teams")],
        );
        let activities: Vec<String> = config.activities().into_iter().collect();
        assert_eq!(activities, vec!["Gmail", "Slack", "Teams"]);
    }
}

//! Offline, deterministic translator driven by cue phrases.
//!
//! Activities are the capitalised words of the utterance (plus any word that
//! names an activity of a prompt example). Each template has cue phrases with
//! a strength; a matching cue yields the template over the activities in order
//! of appearance. Prompt examples similar to the utterance add their template
//! as well.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use regex::Regex;

use super::prompt::PromptConfig;
use super::ranker::Translator;
use super::template::{DeclareFormula, DeclareTemplate};
use crate::error::{LemmingError, Result};

/// Example utterances at least this similar contribute their template.
const MIN_EXAMPLE_SIMILARITY: f64 = 0.5;

const STOPWORDS: &[&str] = &[
    "a", "after", "afterward", "afterwards", "also", "always", "an", "and", "at", "before",
    "both", "but", "do", "does", "each", "either", "every", "eventually", "exactly", "finally",
    "first", "for", "happen", "happens", "i", "if", "immediately", "in", "it", "last", "make",
    "must", "neither", "never", "not", "of", "once", "only", "or", "please", "send", "should",
    "sure", "the", "then", "there", "to", "twice", "use", "we", "when", "whenever", "with",
    "without", "you",
];

struct CueRule {
    template: DeclareTemplate,
    pattern: Regex,
    strength: f64,
    /// The cue names the second activity first ("B only after A").
    reversed: bool,
}

const CUES: &[(DeclareTemplate, &str, f64, bool)] = &[
    (DeclareTemplate::ChainResponse, r"\b(immediately|right|directly)\s+(after|afterwards?|followed)\b", 0.9, false),
    (DeclareTemplate::ChainPrecedence, r"\bonly\s+(immediately|right|directly)\s+after\b", 0.95, true),
    (DeclareTemplate::Succession, r"\bif and only if\b|\balways followed\b.*\bonly after\b", 0.85, false),
    (DeclareTemplate::Response, r"\b(whenever|every time|each time)\b.*\b(afterwards?|after that|later|eventually|then|follow(s|ed)?)\b", 0.9, false),
    (DeclareTemplate::Response, r"\bfollowed by\b", 0.6, false),
    (DeclareTemplate::Precedence, r"\bonly after\b|\bpreceded by\b", 0.8, true),
    (DeclareTemplate::Precedence, r"\b(first|before)\b.*\bbefore\b|\bnot before\b", 0.5, false),
    (DeclareTemplate::RespondedExistence, r"\bif\b.*\b(also|as well|too)\b", 0.7, false),
    (DeclareTemplate::NotCoExistence, r"\b(never|not|cannot|can't)\s+both\b|\bnot together\b", 0.8, false),
    (DeclareTemplate::ExclusiveChoice, r"\beither\b.*\bor\b.*\bnot both\b|\bexactly one of\b", 0.9, false),
    (DeclareTemplate::ExclusiveChoice, r"\beither\b.*\bor\b", 0.5, false),
    (DeclareTemplate::ExistenceTwo, r"\b(at least twice|two times|twice)\b", 0.8, false),
    (DeclareTemplate::Existence, r"\b(at least once|must|make sure|eventually)\b", 0.5, false),
    (DeclareTemplate::Absence, r"\b(never|do not|don't|avoid|without)\b", 0.7, false),
    (DeclareTemplate::Init, r"\b(start|begin)s?\s+with\b|\bfirst\b", 0.6, false),
    (DeclareTemplate::End, r"\b(end|finish)(es)?\s+with\b|\bfinally\b|\blast\b", 0.6, false),
];

pub struct CuePhraseTranslator {
    rules: Vec<CueRule>,
    word: Regex,
}

impl CuePhraseTranslator {
    pub fn new() -> Result<Self> {
        let rules = CUES
            .iter()
            .map(|&(template, pattern, strength, reversed)| {
                let pattern = Regex::new(pattern).map_err(|e| {
                    LemmingError::Internal(anyhow::anyhow!("bad cue pattern for {}: {}", template, e))
                })?;
                Ok(CueRule {
                    template,
                    pattern,
                    strength,
                    reversed,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let word = Regex::new(r"[A-Za-z][A-Za-z0-9_-]*")
            .map_err(|e| LemmingError::Internal(anyhow::anyhow!("bad word pattern: {}", e)))?;
        Ok(Self { rules, word })
    }

    /// Activity names in order of first appearance.
    fn activities(&self, utterance: &str, known: &BTreeSet<String>) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for m in self.word.find_iter(utterance) {
            let token = m.as_str();
            let lower = token.to_lowercase();
            let name = if let Some(k) = known.iter().find(|k| k.to_lowercase() == lower) {
                k.clone()
            } else if token.starts_with(|c: char| c.is_ascii_uppercase())
                && !STOPWORDS.contains(&lower.as_str())
            {
                token.to_string()
            } else {
                continue;
            };
            if !out.contains(&name) {
                out.push(name);
            }
        }
        out
    }

    fn bind(template: DeclareTemplate, activities: &[String], reversed: bool) -> Vec<DeclareFormula> {
        match template.arity() {
            1 => activities
                .iter()
                .filter_map(|a| DeclareFormula::new(template, vec![a.clone()]).ok())
                .collect(),
            _ if activities.len() >= 2 => {
                let (a, b) = if reversed {
                    (activities[1].clone(), activities[0].clone())
                } else {
                    (activities[0].clone(), activities[1].clone())
                };
                DeclareFormula::new(template, vec![a, b]).into_iter().collect()
            }
            _ => Vec::new(),
        }
    }
}

fn words(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn keep_max(scores: &mut BTreeMap<DeclareFormula, f64>, formula: DeclareFormula, score: f64) {
    let entry = scores.entry(formula).or_insert(0.0);
    if score > *entry {
        *entry = score;
    }
}

#[async_trait]
impl Translator for CuePhraseTranslator {
    fn name(&self) -> &str {
        "cue-phrase"
    }

    async fn translate(
        &self,
        utterance: &str,
        prompt: &PromptConfig,
    ) -> Result<BTreeMap<DeclareFormula, f64>> {
        let known = prompt.activities();
        let activities = self.activities(utterance, &known);
        let lower = utterance.to_lowercase();
        let mut scores = BTreeMap::new();

        for rule in &self.rules {
            if !rule.pattern.is_match(&lower) {
                continue;
            }
            for (i, formula) in Self::bind(rule.template, &activities, rule.reversed)
                .into_iter()
                .enumerate()
            {
                // later activities are weaker candidates for unary templates
                let score = rule.strength * if i == 0 { 1.0 } else { 0.8 };
                keep_max(&mut scores, formula, score);
            }
        }

        let utterance_words = words(utterance);
        for (example, formula) in prompt.parsed_examples() {
            let similarity = jaccard(&utterance_words, &words(&example.utterance));
            if similarity < MIN_EXAMPLE_SIMILARITY {
                continue;
            }
            let bound = if activities.len() >= formula.template.arity() {
                Self::bind(formula.template, &activities, false)
                    .into_iter()
                    .next()
            } else {
                Some(formula)
            };
            if let Some(bound) = bound {
                keep_max(&mut scores, bound, similarity);
            }
        }

        tracing::debug!(?activities, candidates = scores.len(), "cue-phrase translation");
        Ok(scores)
    }
}

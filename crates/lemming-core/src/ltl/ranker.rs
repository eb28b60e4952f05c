//! Formula ranking: utterance → ordered candidate formulas.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::prompt::PromptConfig;
use super::template::DeclareFormula;
use crate::error::{LemmingError, Result};
use crate::types::LTLFormula;

/// Opaque natural-language → DECLARE translator.
///
/// Scores are unnormalised; the ranker validates and clamps them.
#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &str;

    async fn translate(
        &self,
        utterance: &str,
        prompt: &PromptConfig,
    ) -> Result<BTreeMap<DeclareFormula, f64>>;
}

#[derive(Clone)]
pub struct FormulaRanker {
    translator: Arc<dyn Translator>,
    prompt: Arc<PromptConfig>,
}

impl FormulaRanker {
    pub fn new(translator: Arc<dyn Translator>, prompt: Arc<PromptConfig>) -> Self {
        Self { translator, prompt }
    }

    pub fn prompt(&self) -> &PromptConfig {
        &self.prompt
    }

    pub fn translator_name(&self) -> &str {
        self.translator.name()
    }

    /// Rank candidate formulas for `utterance`, most confident first.
    ///
    /// An empty result is valid. Confidences are clamped into `[0, 1]`;
    /// a non-finite score is a translation error.
    pub async fn rank(&self, utterance: &str) -> Result<Vec<LTLFormula>> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Err(LemmingError::InvalidInput("utterance is empty".to_string()));
        }

        let scores = self
            .translator
            .translate(utterance, &self.prompt)
            .await
            .map_err(|e| match e {
                LemmingError::Translation(_) => e,
                other => LemmingError::Translation(other.to_string()),
            })?;

        let mut ranked = Vec::with_capacity(scores.len());
        for (formula, score) in scores {
            if !score.is_finite() {
                return Err(LemmingError::Translation(format!(
                    "non-finite score {} for `{}`",
                    score, formula
                )));
            }
            ranked.push(LTLFormula {
                user_prompt: utterance.to_string(),
                formula: formula.to_string(),
                description: formula.describe(),
                confidence: score.clamp(0.0, 1.0),
            });
        }
        ranked.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.formula.cmp(&b.formula))
        });

        tracing::info!(
            translator = self.translator.name(),
            candidates = ranked.len(),
            top = ranked.first().map(|f| f.formula.as_str()).unwrap_or("-"),
            "ranked formulas"
        );
        Ok(ranked)
    }
}

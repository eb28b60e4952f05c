//! OpenAI chat-completions translator.
//!
//! Sends the few-shot prompt, asks for `n` samples, and scores each formula by
//! the fraction of samples that produced it. Samples that do not parse as a
//! DECLARE formula only lower the other scores.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::prompt::PromptConfig;
use super::ranker::Translator;
use super::template::{DeclareFormula, DeclareTemplate};
use crate::error::{LemmingError, Result};

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_SAMPLES: u32 = 5;
const API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Clone)]
pub struct OpenAiTranslator {
    api_key: String,
    client: reqwest::Client,
    model: String,
    samples: u32,
    url: String,
}

impl OpenAiTranslator {
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, DEFAULT_MODEL)
    }

    pub fn with_model(api_key: String, model: &str) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            model: model.to_string(),
            samples: DEFAULT_SAMPLES,
            url: API_URL.to_string(),
        }
    }

    pub fn samples(mut self, samples: u32) -> Self {
        self.samples = samples.max(1);
        self
    }

    /// Point at an OpenAI-compatible endpoint.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    async fn call_api(&self, prompt: &str) -> Result<Vec<String>> {
        let body = serde_json::json!({
            "model": &self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.5,
            "n": self.samples,
            "max_tokens": 64,
            "stop": ["NL:"]
        });

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LemmingError::Translation(format!("OpenAI request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LemmingError::Translation(format!(
                "OpenAI API error {}: {}",
                status, body
            )));
        }

        #[derive(Deserialize)]
        struct Message {
            #[serde(default)]
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            choices: Vec<Choice>,
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| LemmingError::Translation(format!("bad OpenAI response: {}", e)))?;
        Ok(api_response
            .choices
            .into_iter()
            .filter_map(|c| c.message.content)
            .collect())
    }
}

/// Read one completion of the rendered prompt. The completion continues
/// after `PATTERN:`, so the first line is the template and a later
/// `SYMBOLS:` line lists the activities.
pub fn parse_completion(text: &str) -> Option<DeclareFormula> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let first = lines.next()?;
    let template: DeclareTemplate = first
        .strip_prefix("PATTERN:")
        .unwrap_or(first)
        .trim()
        .parse()
        .ok()?;
    let symbols = lines.find_map(|l| l.strip_prefix("SYMBOLS:"))?;
    let activities = symbols
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    DeclareFormula::new(template, activities).ok()
}

/// Sample frequency per distinct formula.
pub fn score_samples(samples: &[String]) -> BTreeMap<DeclareFormula, f64> {
    let mut counts: BTreeMap<DeclareFormula, usize> = BTreeMap::new();
    for sample in samples {
        if let Some(formula) = parse_completion(sample) {
            *counts.entry(formula).or_default() += 1;
        } else {
            tracing::debug!(sample = %sample, "discarding unparseable completion");
        }
    }
    let total = samples.len().max(1) as f64;
    counts
        .into_iter()
        .map(|(formula, n)| (formula, n as f64 / total))
        .collect()
}

#[async_trait]
impl Translator for OpenAiTranslator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn translate(
        &self,
        utterance: &str,
        prompt: &PromptConfig,
    ) -> Result<BTreeMap<DeclareFormula, f64>> {
        let rendered = prompt.render(utterance);
        tracing::debug!(model = %self.model, samples = self.samples, "querying OpenAI");
        let samples = self.call_api(&rendered).await?;
        Ok(score_samples(&samples))
    }
}

//! Process-wide, read-only service state.

use std::sync::Arc;

use lemming_core::landmarks::{LandmarkExtractor, RelaxedLandmarkExtractor};
use lemming_core::ltl::{FormulaRanker, PromptConfig, Translator};
use lemming_core::planner::PlanSearch;
use lemming_core::scenario::ScenarioStore;

use crate::config::Config;

/// Built once at start-up and shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub ranker: Arc<FormulaRanker>,
    pub planner: Arc<dyn PlanSearch>,
    pub extractor: Arc<dyn LandmarkExtractor>,
    pub scenarios: ScenarioStore,
}

impl AppState {
    pub fn new(
        translator: Arc<dyn Translator>,
        prompt: PromptConfig,
        planner: Arc<dyn PlanSearch>,
        scenarios: ScenarioStore,
    ) -> Self {
        Self {
            ranker: Arc::new(FormulaRanker::new(translator, Arc::new(prompt))),
            planner,
            extractor: Arc::new(RelaxedLandmarkExtractor),
            scenarios,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let scenarios = ScenarioStore::new(&config.data_dir);
        let prompt = match &config.prompt_scenario {
            Some(name) => scenarios.prompt_config(name)?,
            None => PromptConfig::default(),
        };
        tracing::info!(
            data_dir = %config.data_dir.display(),
            prompt = %prompt.fingerprint(),
            examples = prompt.examples.len(),
            "prompt configuration resolved"
        );
        Ok(Self::new(
            config.build_translator()?,
            prompt,
            config.build_planner()?,
            scenarios,
        ))
    }
}

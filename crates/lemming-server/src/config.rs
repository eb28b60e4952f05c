//! Process configuration: command-line flags with environment fallbacks.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use lemming_core::ltl::{CuePhraseTranslator, OpenAiTranslator, Translator};
use lemming_core::planner::{ExternalTopQ, GroundedTopQ, PlanSearch, TopQConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TranslatorKind {
    /// OpenAI when a key is configured, cue phrases otherwise
    Auto,
    Openai,
    Cue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PlannerKind {
    /// In-process top-q search
    Grounded,
    /// External planner command
    External,
}

/// Lemming REST server
#[derive(Parser, Debug, Clone)]
#[command(name = "lemming-server")]
#[command(about = "Goal compilation and landmark-based plan disambiguation over HTTP")]
pub struct Config {
    /// Listen address
    #[arg(long, env = "LEMMING_BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind_addr: String,

    /// Directory holding one sub-directory per scenario
    #[arg(long, env = "LEMMING_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Scenario whose prompt.json configures the formula ranker
    #[arg(long, env = "LEMMING_PROMPT_SCENARIO")]
    pub prompt_scenario: Option<String>,

    #[arg(long, env = "LEMMING_TRANSLATOR", value_enum, default_value_t = TranslatorKind::Auto)]
    pub translator: TranslatorKind,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_MODEL")]
    pub openai_model: Option<String>,

    #[arg(long, env = "LEMMING_PLANNER", value_enum, default_value_t = PlannerKind::Grounded)]
    pub planner: PlannerKind,

    /// Planner command line; `{domain}`, `{problem}`, `{k}` and `{q}` are
    /// substituted
    #[arg(long, env = "LEMMING_PLANNER_CMD")]
    pub planner_cmd: Option<String>,

    /// Keep plans with cost within this factor of the best
    #[arg(long, env = "LEMMING_TOPQ_QUALITY", default_value_t = 1.0)]
    pub topq_quality: f64,

    #[arg(long, env = "LEMMING_TOPQ_MAX_PLANS", default_value_t = 10)]
    pub topq_max_plans: usize,

    #[arg(long, env = "LEMMING_MAX_EXPANSIONS", default_value_t = 200_000)]
    pub max_expansions: usize,
}

impl Config {
    pub fn topq(&self) -> TopQConfig {
        TopQConfig {
            quality_bound: self.topq_quality,
            max_plans: self.topq_max_plans,
            max_expansions: self.max_expansions,
        }
    }

    pub fn build_translator(&self) -> anyhow::Result<Arc<dyn Translator>> {
        let key = self.openai_api_key.clone().filter(|k| !k.trim().is_empty());
        let use_openai = match self.translator {
            TranslatorKind::Openai => true,
            TranslatorKind::Cue => false,
            TranslatorKind::Auto => key.is_some(),
        };
        if !use_openai {
            tracing::info!("using the offline cue-phrase translator");
            return Ok(Arc::new(CuePhraseTranslator::new()?));
        }
        let key = key.context("OPENAI_API_KEY must be set for the openai translator")?;
        let translator = match &self.openai_model {
            Some(model) => OpenAiTranslator::with_model(key, model),
            None => OpenAiTranslator::new(key),
        };
        tracing::info!(model = ?self.openai_model, "using the OpenAI translator");
        Ok(Arc::new(translator))
    }

    pub fn build_planner(&self) -> anyhow::Result<Arc<dyn PlanSearch>> {
        let planner: Arc<dyn PlanSearch> = match self.planner {
            PlannerKind::Grounded => Arc::new(GroundedTopQ::new(self.topq())),
            PlannerKind::External => {
                let line = self
                    .planner_cmd
                    .as_deref()
                    .context("LEMMING_PLANNER_CMD must be set for the external planner")?;
                Arc::new(ExternalTopQ::from_command_line(line, self.topq())?)
            }
        };
        tracing::info!(planner = planner.name(), "plan search backend ready");
        Ok(planner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_in_process_backends() {
        let config = Config::parse_from(["lemming-server", "--translator", "cue"]);
        assert_eq!(config.planner, PlannerKind::Grounded);
        assert_eq!(config.topq().max_plans, 10);
        assert_eq!(config.build_translator().unwrap().name(), "cue-phrase");
        assert_eq!(config.build_planner().unwrap().name(), "grounded-topq");
    }

    #[test]
    fn external_planner_needs_a_command() {
        let config = Config::parse_from(["lemming-server", "--planner", "external"]);
        let config = Config {
            planner_cmd: None,
            ..config
        };
        assert!(config.build_planner().is_err());
    }
}

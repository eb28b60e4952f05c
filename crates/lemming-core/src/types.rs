use serde::{Deserialize, Serialize};

use crate::error::{LemmingError, Result};
use crate::fingerprint::PlanFingerprint;

// ─── Planning task ────────────────────────────────────────────

/// A PDDL domain/problem pair, both as source text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningTask {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub problem: String,
}

impl PlanningTask {
    pub fn new(domain: impl Into<String>, problem: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            problem: problem.into(),
        }
    }

    /// True when both domain and problem carry text.
    pub fn check_domain_problem(&self) -> bool {
        !self.domain.trim().is_empty() && !self.problem.trim().is_empty()
    }

    pub fn require_non_empty(&self) -> Result<()> {
        if self.check_domain_problem() {
            Ok(())
        } else {
            Err(LemmingError::EmptyTask)
        }
    }
}

// ─── Plans ────────────────────────────────────────────────────

/// An ordered sequence of grounded actions.
///
/// `hash` is derived from `actions` by [`PlanFingerprint`] and is the plan's
/// identity across requests.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<String>,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub hash: Option<String>,
}

impl Plan {
    pub fn new(actions: Vec<String>, cost: f64) -> Self {
        Self {
            actions,
            cost,
            hash: None,
        }
    }

    /// Attach the content hash, replacing whatever was there.
    pub fn with_hash(mut self) -> Self {
        self.hash = Some(PlanFingerprint::compute(&self.actions).hash);
        self
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerResponseModel {
    pub plans: Vec<Plan>,
}

// ─── Temporal formulas ────────────────────────────────────────

/// One ranked candidate formula for an utterance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LTLFormula {
    pub user_prompt: String,
    /// DECLARE text form, e.g. `"Response Slack Gmail"`.
    pub formula: String,
    pub description: String,
    /// Always within `[0, 1]`.
    pub confidence: f64,
}

/// A natural-language prompt bound to the formula it means.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub utterance: String,
    pub formula: String,
    #[serde(default)]
    pub description: String,
}

impl From<&LTLFormula> for Translation {
    fn from(formula: &LTLFormula) -> Self {
        Self {
            utterance: formula.user_prompt.clone(),
            formula: formula.formula.clone(),
            description: formula.description.clone(),
        }
    }
}

// ─── Aggregate ────────────────────────────────────────────────

/// Everything known about one planning scenario.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LemmingTask {
    pub planning_task: PlanningTask,
    #[serde(default)]
    pub plans: Vec<Plan>,
    #[serde(default)]
    pub nl_prompts: Vec<Translation>,
}

/// Body of the LTL compilation request. `domain` and `problem` are file paths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ltl2PddlRequest {
    pub formulas: Vec<LTLFormula>,
    pub domain: String,
    pub problem: String,
}

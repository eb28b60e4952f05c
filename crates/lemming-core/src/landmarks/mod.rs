//! Landmark extraction.
//!
//! A landmark is a fact every plan makes true at some point. Landmarks and
//! their orderings drive the disambiguator: a landmark whose achievers differ
//! across plans is a decision the user can make.
//!
//! | Category     | Method                                                  |
//! |--------------|---------------------------------------------------------|
//! | `lm_rhw`     | backchaining from goals over shared first-achiever preconditions, plus disjunctive landmarks |
//! | `lm_zg`      | label propagation over the relaxed planning graph       |
//! | `lm_exhaust` | test every reachable fact by excluding its achievers    |

pub mod extract;
pub mod graph;

pub use extract::RelaxedLandmarkExtractor;
pub use graph::{Landmark, LandmarkGraph, LandmarkKind, LandmarkOrdering, OrderingKind};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LemmingError, Result};
use crate::pddl::{self, GroundTask};
use crate::types::PlanningTask;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LandmarkCategory {
    #[serde(rename = "lm_rhw")]
    Rhw,
    #[serde(rename = "lm_zg")]
    Zg,
    #[serde(rename = "lm_exhaust")]
    Exhaust,
}

impl LandmarkCategory {
    pub const ALL: [LandmarkCategory; 3] = [Self::Rhw, Self::Zg, Self::Exhaust];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rhw => "lm_rhw",
            Self::Zg => "lm_zg",
            Self::Exhaust => "lm_exhaust",
        }
    }
}

impl fmt::Display for LandmarkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LandmarkCategory {
    type Err = LemmingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "lm_rhw" | "rhw" => Ok(Self::Rhw),
            "lm_zg" | "zg" => Ok(Self::Zg),
            "lm_exhaust" | "exhaust" => Ok(Self::Exhaust),
            _ => Err(LemmingError::InvalidCategory(s.to_string())),
        }
    }
}

/// Computes landmarks for a grounded task.
pub trait LandmarkExtractor: Send + Sync {
    fn extract(&self, task: &GroundTask, category: LandmarkCategory) -> Result<LandmarkGraph>;
}

/// Parse the category, ground the task, extract and validate.
///
/// A task without landmarks yields an empty graph; a cyclic graph is never
/// returned.
pub fn extract_landmarks(
    extractor: &dyn LandmarkExtractor,
    task: &PlanningTask,
    category: &str,
) -> Result<LandmarkGraph> {
    let category: LandmarkCategory = category.parse()?;
    task.require_non_empty()?;
    let ground = pddl::ground_task(task)?;
    let graph = extractor.extract(&ground, category)?;
    graph.validate()?;
    tracing::info!(
        %category,
        landmarks = graph.landmarks.len(),
        orderings = graph.orderings.len(),
        "extracted landmarks"
    );
    Ok(graph)
}

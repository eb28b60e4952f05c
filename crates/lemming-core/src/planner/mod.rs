//! Top-quality plan search.
//!
//! [`PlanSearch`] is the seam between the pipeline and whatever produces
//! plans. Two backends ship with the crate:
//!
//! - [`GroundedTopQ`]: in-process best-first enumeration over the grounded task
//! - [`ExternalTopQ`]: drives an external top-q planner binary

pub mod external;
pub mod topq;

pub use external::ExternalTopQ;
pub use topq::GroundedTopQ;

use crate::error::Result;
use crate::types::{Plan, PlanningTask};

/// Bounds on a top-q search.
#[derive(Debug, Clone, PartialEq)]
pub struct TopQConfig {
    /// Keep plans with cost ≤ `quality_bound × best`. Values below 1.0 are
    /// treated as 1.0.
    pub quality_bound: f64,
    /// Maximum number of plans returned.
    pub max_plans: usize,
    /// Node expansions before the search gives up and returns what it has.
    pub max_expansions: usize,
}

impl Default for TopQConfig {
    fn default() -> Self {
        Self {
            quality_bound: 1.0,
            max_plans: 10,
            max_expansions: 200_000,
        }
    }
}

impl TopQConfig {
    pub fn quality(&self) -> f64 {
        if self.quality_bound.is_finite() {
            self.quality_bound.max(1.0)
        } else {
            1.0
        }
    }
}

/// Produces a bounded, cost-ordered set of plans for a task.
///
/// An unsolvable task yields `Ok(vec![])`; malformed PDDL is an error.
pub trait PlanSearch: Send + Sync {
    fn name(&self) -> &str;

    fn search_topq(&self, task: &PlanningTask) -> Result<Vec<Plan>>;
}

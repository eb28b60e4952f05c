//! PDDL reading, writing and grounding.
//!
//! ```text
//! text ──► sexpr ──► Domain / Problem ──► GroundTask
//!                        │                    │
//!                        └── to_pddl()        └── planner, landmarks
//! ```

pub mod ground;
pub mod model;
pub mod sexpr;

pub use ground::{GroundAction, GroundTask, State};
pub use model::{Action, Domain, Predicate, Problem, TypedName};
pub use sexpr::SExpr;

use crate::error::Result;
use crate::types::PlanningTask;

/// Parse both halves of a task.
pub fn parse_task(task: &PlanningTask) -> Result<(Domain, Problem)> {
    let domain = Domain::parse(&task.domain)?;
    let problem = Problem::parse(&task.problem)?;
    Ok((domain, problem))
}

/// Parse and ground a task in one step.
pub fn ground_task(task: &PlanningTask) -> Result<GroundTask> {
    let (domain, problem) = parse_task(task)?;
    GroundTask::new(&domain, &problem)
}

/// Compare two PDDL names the way users write activities: case-insensitive,
/// with `_` and `-` interchangeable.
pub fn same_name(a: &str, b: &str) -> bool {
    canonical_name(a) == canonical_name(b)
}

pub fn canonical_name(name: &str) -> String {
    name.trim().to_lowercase().replace('_', "-")
}

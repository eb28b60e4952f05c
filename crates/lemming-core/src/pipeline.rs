//! Stage compositions used by the HTTP surface.

use crate::compiler::{compile_task, ToolCompiler};
use crate::error::Result;
use crate::fingerprint::hash_plans;
use crate::planner::PlanSearch;
use crate::types::{LTLFormula, LemmingTask, Plan, PlanningTask, Translation};

/// Top-q search with hashes attached and duplicate sequences removed.
pub fn search_plans(planner: &dyn PlanSearch, task: &PlanningTask) -> Result<Vec<Plan>> {
    task.require_non_empty()?;
    let plans = hash_plans(planner.search_topq(task)?);
    tracing::info!(planner = planner.name(), plans = plans.len(), "plan search finished");
    Ok(plans)
}

/// Compile the formulas into the task, then plan for the compiled task.
///
/// The result carries the compiled task, its plans, and the formulas as
/// prompts so the client can show what the goal was built from.
pub fn compile_and_plan(
    planner: &dyn PlanSearch,
    task: &PlanningTask,
    formulas: &[LTLFormula],
    tool: ToolCompiler,
) -> Result<LemmingTask> {
    let compiled = compile_task(task, formulas, tool)?;
    let plans = search_plans(planner, &compiled)?;
    Ok(LemmingTask {
        planning_task: compiled,
        plans,
        nl_prompts: formulas.iter().map(Translation::from).collect(),
    })
}

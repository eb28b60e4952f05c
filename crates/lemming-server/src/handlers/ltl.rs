//! Temporal goals:
//!   POST /nl2ltl: ranked DECLARE formulas for an utterance
//!   POST /ltl_compile/:tool: compile formulas into a scenario task and plan

use axum::extract::Path;
use axum::{Extension, Json};
use lemming_core::compiler::ToolCompiler;
use lemming_core::pipeline::compile_and_plan;
use lemming_core::{LTLFormula, LemmingTask, Ltl2PddlRequest};
use serde::Deserialize;

use super::blocking;
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct Nl2LtlRequest {
    #[serde(default)]
    pub utterance: String,
}

pub async fn nl2ltl(
    Extension(state): Extension<AppState>,
    Json(req): Json<Nl2LtlRequest>,
) -> AppResult<Json<Vec<LTLFormula>>> {
    let ranked = state.ranker.rank(&req.utterance).await?;
    Ok(Json(ranked))
}

pub async fn ltl_compile(
    Extension(state): Extension<AppState>,
    Path(tool): Path<String>,
    Json(req): Json<Ltl2PddlRequest>,
) -> AppResult<Json<LemmingTask>> {
    let tool: ToolCompiler = tool.parse()?;
    let task = blocking(move || {
        let task = state.scenarios.read_task(&req.domain, &req.problem)?;
        compile_and_plan(state.planner.as_ref(), &task, &req.formulas, tool)
    })
    .await?;
    Ok(Json(task))
}

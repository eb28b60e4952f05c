//! Disambiguation views:
//!   POST /generate_select_view: full selection view
//!   POST /generate_build_forward: incremental build from the start
//!   POST /generate_build_backward: incremental build from the goal
//!   POST /generate_nl2ltl_integration: selection view for compiled plans

use axum::Json;
use lemming_core::disambiguator::{
    generate_build_view, generate_select_view, handle_flow_output, Direction,
    PlanDisambiguatorInput, PlanDisambiguatorOutput,
};
use lemming_core::error::LemmingError;

use super::blocking;
use crate::error::AppResult;

type ViewResult = AppResult<Json<PlanDisambiguatorOutput>>;

async fn render<F>(input: PlanDisambiguatorInput, flow: F) -> ViewResult
where
    F: FnOnce(&PlanDisambiguatorInput) -> lemming_core::Result<Option<PlanDisambiguatorOutput>>
        + Send
        + 'static,
{
    if !input.check_domain_problem() {
        return Err(LemmingError::EmptyTask.into());
    }
    let output = blocking(move || handle_flow_output(flow(&input)?)).await?;
    Ok(Json(output))
}

pub async fn select_view(Json(input): Json<PlanDisambiguatorInput>) -> ViewResult {
    render(input, generate_select_view).await
}

pub async fn build_forward(Json(input): Json<PlanDisambiguatorInput>) -> ViewResult {
    render(input, |input| generate_build_view(input, Direction::Forward)).await
}

pub async fn build_backward(Json(input): Json<PlanDisambiguatorInput>) -> ViewResult {
    render(input, |input| generate_build_view(input, Direction::Backward)).await
}

pub async fn nl2ltl_integration(Json(input): Json<PlanDisambiguatorInput>) -> ViewResult {
    render(input, generate_select_view).await
}

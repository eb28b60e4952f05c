//! Plans and landmarks for a task:
//!   POST /get_plans: top-q plans with hashes
//!   POST /get_landmarks/:category: landmark graph for a category

use axum::extract::Path;
use axum::{Extension, Json};
use lemming_core::landmarks::{extract_landmarks, LandmarkGraph};
use lemming_core::pipeline::search_plans;
use lemming_core::{PlannerResponseModel, PlanningTask};

use super::blocking;
use crate::error::AppResult;
use crate::state::AppState;

pub async fn get_plans(
    Extension(state): Extension<AppState>,
    Json(task): Json<PlanningTask>,
) -> AppResult<Json<PlannerResponseModel>> {
    task.require_non_empty()?;
    let plans = blocking(move || search_plans(state.planner.as_ref(), &task)).await?;
    Ok(Json(PlannerResponseModel { plans }))
}

pub async fn get_landmarks(
    Extension(state): Extension<AppState>,
    Path(category): Path<String>,
    Json(task): Json<PlanningTask>,
) -> AppResult<Json<LandmarkGraph>> {
    let graph =
        blocking(move || extract_landmarks(state.extractor.as_ref(), &task, &category)).await?;
    Ok(Json(graph))
}

//! GET /: greeting
//! GET /health: backends and prompt version

use axum::{Extension, Json};
use serde::Serialize;

use crate::state::AppState;

pub async fn root() -> &'static str {
    "Hello Lemming!"
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub translator: String,
    pub planner: String,
    pub prompt_fingerprint: String,
}

pub async fn health(Extension(state): Extension<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        translator: state.ranker.translator_name().to_string(),
        planner: state.planner.name().to_string(),
        prompt_fingerprint: state.ranker.prompt().fingerprint(),
    })
}

//! Scenario fixtures:
//!   POST /import_domain/:name: domain, problem, stored plans and prompts
//!   GET  /scenarios: available scenario names
//!   POST /file_upload: echo an uploaded text file

use axum::body::Bytes;
use axum::extract::Path;
use axum::{Extension, Json};
use lemming_core::error::LemmingError;
use lemming_core::LemmingTask;

use super::blocking;
use crate::error::AppResult;
use crate::state::AppState;

pub async fn import_domain(
    Extension(state): Extension<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<LemmingTask>> {
    let task = blocking(move || state.scenarios.load(&name)).await?;
    Ok(Json(task))
}

pub async fn list_scenarios(Extension(state): Extension<AppState>) -> AppResult<Json<Vec<String>>> {
    let names = blocking(move || state.scenarios.list()).await?;
    Ok(Json(names))
}

pub async fn file_upload(body: Bytes) -> AppResult<String> {
    let text = String::from_utf8(body.to_vec())
        .map_err(|e| LemmingError::InvalidInput(format!("upload is not UTF-8: {}", e)))?;
    tracing::debug!(bytes = text.len(), "file uploaded");
    Ok(text)
}

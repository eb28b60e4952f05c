//! HTTP mapping for pipeline errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lemming_core::error::{ErrorKind, LemmingError};
use serde_json::json;

/// Handler error: a [`LemmingError`] rendered as `{error, detail}` with the
/// status its family maps to.
#[derive(Debug)]
pub struct AppError(pub LemmingError);

impl From<LemmingError> for AppError {
    fn from(err: LemmingError) -> Self {
        Self(err)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self(LemmingError::Internal(anyhow::anyhow!(
            "blocking task failed: {}",
            err
        )))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let kind = self.0.kind();
        match kind {
            ErrorKind::Internal => tracing::error!(error = %self.0, "request failed"),
            ErrorKind::ExternalFault => tracing::warn!(error = %self.0, "backend failed"),
            _ => tracing::debug!(error = %self.0, %status, "request rejected"),
        }
        let body = json!({
            "error": kind.as_str(),
            "detail": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_families() {
        let cases = [
            (LemmingError::EmptyTask, StatusCode::BAD_REQUEST),
            (LemmingError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (LemmingError::LandmarkCycle(3), StatusCode::UNPROCESSABLE_ENTITY),
            (LemmingError::Translation("down".into()), StatusCode::BAD_GATEWAY),
            (
                LemmingError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError(err).into_response().status(), status);
        }
    }
}

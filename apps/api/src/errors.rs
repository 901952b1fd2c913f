use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ats::AtsError;
use crate::model_client::ModelError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<AtsError> for AppError {
    fn from(err: AtsError) -> Self {
        match err {
            AtsError::DocumentNotFound(id) => {
                AppError::NotFound(format!("Document {id} not found"))
            }
            AtsError::EmbeddingUnavailable => AppError::UnprocessableEntity(err.to_string()),
            AtsError::Transport(ModelError::Timeout(_)) | AtsError::DeadlineExceeded(_) => {
                AppError::UpstreamTimeout(err.to_string())
            }
            AtsError::Transport(e) => AppError::Upstream(e.to_string()),
            AtsError::Store(e) => AppError::Internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Upstream(msg) => {
                tracing::error!("Upstream model error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "The scoring model could not be reached".to_string(),
                )
            }
            AppError::UpstreamTimeout(msg) => {
                tracing::error!("Upstream timeout: {msg}");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "UPSTREAM_TIMEOUT",
                    "Scoring took too long".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn status_of(err: AtsError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_ats_errors_map_to_status_codes() {
        assert_eq!(
            status_of(AtsError::DocumentNotFound("r1".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AtsError::EmbeddingUnavailable),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(AtsError::Transport(ModelError::Api {
                status: 500,
                message: "boom".into()
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(AtsError::Transport(ModelError::Timeout(Duration::from_secs(1)))),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(AtsError::DeadlineExceeded(Duration::from_secs(1))),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(AtsError::Store(anyhow::anyhow!("pool closed"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_error_body_envelope() {
        let response = AppError::Validation("documentId is required".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["message"], "documentId is required");
    }
}

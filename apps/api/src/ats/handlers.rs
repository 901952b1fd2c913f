use axum::{extract::State, Json};
use serde::Deserialize;

use crate::ats::scoring::{ScoreOptions, ScoreReport};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    #[serde(alias = "resumeId")]
    pub document_id: Option<String>,
    pub job_description: Option<String>,
    pub options: Option<ScoreOptions>,
}

/// POST /api/v1/ats/score
/// POST /api/ats/get-ats-score
pub async fn handle_score(
    State(state): State<AppState>,
    Json(req): Json<ScoreRequest>,
) -> Result<Json<ScoreReport>, AppError> {
    let document_id = req
        .document_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("documentId is required".to_string()))?;

    let options = req.options.unwrap_or_default();
    let report = state
        .scorer
        .score(document_id, req.job_description.as_deref(), &options)
        .await?;
    Ok(Json(report))
}

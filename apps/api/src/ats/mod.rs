//! ATS scoring: how well a stored resume reads to an applicant tracking system,
//! optionally against a specific job description.
//!
//! Pipeline per call: load document → flatten to text → embed (cached) →
//! keyword overlap → model rubric → weighted blend.

pub mod embedding;
pub mod handlers;
pub mod normalizer;
pub mod prompts;
pub mod rubric;
pub mod scoring;
pub mod service;

use std::time::Duration;

use thiserror::Error;

use crate::model_client::ModelError;

pub use service::AtsScorer;

#[derive(Debug, Error)]
pub enum AtsError {
    #[error("Document {0} not found")]
    DocumentNotFound(String),

    #[error("Embedding model returned no usable vector")]
    EmbeddingUnavailable,

    #[error("Model call failed: {0}")]
    Transport(#[from] ModelError),

    #[error("Scoring did not finish within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Document store error: {0}")]
    Store(#[from] anyhow::Error),
}

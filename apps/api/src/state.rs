use std::sync::Arc;

use crate::ats::AtsScorer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the document store, embedding cache and model clients.
    pub scorer: Arc<AtsScorer>,
}

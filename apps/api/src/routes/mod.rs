pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::ats::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/ats/score", post(handlers::handle_score))
        // Path used by the existing web client
        .route("/api/ats/get-ats-score", post(handlers::handle_score))
        .with_state(state)
}

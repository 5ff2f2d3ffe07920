//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub yield_model: String,
    pub fertilizer_model: String,
    pub live_sessions: usize,
}

fn model_status(loaded: bool) -> String {
    if loaded {
        "loaded".to_string()
    } else {
        "unavailable".to_string()
    }
}

/// Health check endpoint handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        yield_model: model_status(state.prediction.has_yield_model()),
        fertilizer_model: model_status(state.prediction.has_fertilizer_model()),
        live_sessions: state.advisory.sessions().len().await,
    })
}

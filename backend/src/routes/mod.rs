//! Route definitions for the farm advisory API

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/yield", yield_routes())
        .nest("/fertilizer", fertilizer_routes())
        .nest("/alerts", alert_routes())
        .nest("/vegetation", vegetation_routes())
        .nest("/advisory", advisory_routes())
}

fn yield_routes() -> Router<AppState> {
    Router::new().route("/predict", post(handlers::predict_yield))
}

fn fertilizer_routes() -> Router<AppState> {
    Router::new().route("/recommend", post(handlers::recommend_fertilizer))
}

fn alert_routes() -> Router<AppState> {
    Router::new().route("/evaluate", post(handlers::evaluate_alerts))
}

fn vegetation_routes() -> Router<AppState> {
    Router::new().route("/signals", get(handlers::get_growth_signals))
}

/// Advisory chat and session inspection
fn advisory_routes() -> Router<AppState> {
    Router::new()
        .route("/chat", post(handlers::chat))
        .route("/sessions/:id", get(handlers::get_session))
}

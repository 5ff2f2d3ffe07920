//! HTTP handlers for the advisory chat

use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{GeoPoint, Language, NumericContext, SessionHistory};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::AppState;

/// Advisory chat request
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Omitted on the first message; a new session is started
    #[serde(default)]
    pub session_id: Option<String>,
    pub query: String,
    /// Field and yield data; a placeholder context is used when absent
    #[serde(default)]
    pub context: Option<NumericContext>,
    /// `auto`, `en`, `hi` or `or`
    #[serde(default)]
    pub language: Option<String>,
    /// Field location; when both are given, growth signals join the context
    #[serde(default)]
    pub lat: Option<Decimal>,
    #[serde(default)]
    pub lon: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub answer: String,
    pub trace: String,
    /// Answer with the trace appended
    pub reply: String,
}

/// Generate an advisory within the configured time budget
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let language = match request.language.as_deref() {
        Some(raw) => raw
            .parse::<Language>()
            .map_err(|m| AppError::invalid_input("language", m))?,
        None => Language::Auto,
    };
    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let context = match (request.lat, request.lon) {
        (Some(lat), Some(lon)) => {
            let signals = state
                .vegetation
                .growth_signals(GeoPoint::new(lat, lon), None)
                .await?;
            let mut numeric = request.context.unwrap_or_else(NumericContext::unknown);
            numeric.merge_growth_signals(&signals);
            Some(numeric)
        }
        (None, None) => request.context,
        (Some(_), None) => {
            return Err(AppError::invalid_input("lon", "lon is required together with lat"))
        }
        (None, Some(_)) => {
            return Err(AppError::invalid_input("lat", "lat is required together with lon"))
        }
    };

    let advisory = tokio::time::timeout(
        state.advisory_timeout,
        state
            .advisory
            .advise(&session_id, &request.query, context, language),
    )
    .await
    .map_err(|_| AppError::Timeout("Advisory generation"))??;

    Ok(Json(ChatResponse {
        session_id,
        reply: advisory.full_text(),
        answer: advisory.answer,
        trace: advisory.trace,
    }))
}

/// Read a session's conversation so far
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> AppResult<Json<SessionHistory>> {
    state
        .advisory
        .sessions()
        .snapshot(&session_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Session {}", session_id)))
}

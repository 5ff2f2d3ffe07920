//! HTTP handlers for yield prediction, fertilizer doses and weather alerts

use axum::{extract::State, Json};
use serde::Deserialize;
use shared::{
    evaluate_weather_risk, validate_finite, validate_non_negative, validate_percentage, AlertSet,
    FertilizerFeatures, FertilizerRecommendation, PredictionResult, YieldRequest,
};

use crate::error::{AppError, AppResult};
use crate::AppState;

/// Predict yield for a field
pub async fn predict_yield(
    State(state): State<AppState>,
    Json(request): Json<YieldRequest>,
) -> AppResult<Json<PredictionResult>> {
    let result = state.prediction.predict_yield(&request)?;
    Ok(Json(result))
}

/// Recommend N, P and K doses
pub async fn recommend_fertilizer(
    State(state): State<AppState>,
    Json(features): Json<FertilizerFeatures>,
) -> AppResult<Json<FertilizerRecommendation>> {
    let recommendation = state.prediction.recommend_fertilizer(&features)?;
    Ok(Json(recommendation))
}

/// Flowering-stage weather readings for the alert rules
#[derive(Debug, Deserialize)]
pub struct AlertRequest {
    pub crop: String,
    pub temp_flowering: f64,
    pub rain_flowering: f64,
    pub humidity: f64,
}

/// Evaluate weather-risk alerts without running a model
pub async fn evaluate_alerts(
    State(state): State<AppState>,
    Json(request): Json<AlertRequest>,
) -> AppResult<Json<AlertSet>> {
    validate_finite(request.temp_flowering)
        .map_err(|m| AppError::invalid_input("temp_flowering", m))?;
    validate_non_negative(request.rain_flowering)
        .map_err(|m| AppError::invalid_input("rain_flowering", m))?;
    validate_percentage(request.humidity).map_err(|m| AppError::invalid_input("humidity", m))?;

    let alerts = evaluate_weather_risk(
        state.prediction.catalog(),
        &request.crop,
        request.temp_flowering,
        request.rain_flowering,
        request.humidity,
    );
    Ok(Json(alerts))
}

//! HTTP handlers for vegetation growth signals

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{DateRange, GeoPoint, GrowthSignals};

use crate::error::{AppError, AppResult};
use crate::AppState;

/// Query parameters for growth signals
#[derive(Debug, Deserialize)]
pub struct GrowthSignalsQuery {
    pub lat: Decimal,
    pub lon: Decimal,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Growth signals for a field location
pub async fn get_growth_signals(
    State(state): State<AppState>,
    Query(query): Query<GrowthSignalsQuery>,
) -> AppResult<Json<GrowthSignals>> {
    let range = match (query.start, query.end) {
        (Some(start), Some(end)) => {
            Some(DateRange::new(start, end).map_err(|m| AppError::invalid_input("start", m))?)
        }
        (None, None) => None,
        _ => {
            return Err(AppError::invalid_input(
                "end",
                "start and end must be given together",
            ))
        }
    };

    let signals = state
        .vegetation
        .growth_signals(GeoPoint::new(query.lat, query.lon), range)
        .await?;
    Ok(Json(signals))
}

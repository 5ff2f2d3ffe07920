//! Prediction adapter for the yield and fertilizer-dose models
//!
//! Requests are validated, turned into a feature vector in the exact order
//! the loaded model declares, and passed to the model. Yield results carry
//! weather-risk alerts and a benchmark comparison; fertilizer doses are
//! floored at zero.

use std::sync::Arc;

use shared::{
    benchmark_note, evaluate_weather_risk, round_to, validate_fertilizer_features,
    validate_yield_features, CropCatalog, FeatureMap, FeatureVector, FertilizerFeatures,
    FertilizerRecommendation, PredictionResult, PredictionStatus, YieldRequest, YIELD_UNIT,
};

use crate::error::{AppError, AppResult};
use crate::models::{NumericModel, ScalarModel, TripleModel};

/// Notice attached to a benchmark value returned in place of a prediction
pub const MAINTENANCE_NOTICE: &str =
    "Yield model under maintenance. The value shown is the typical yield for this crop, not a prediction.";

/// Decimal places of the reported yield
const YIELD_DP: i32 = 2;

/// Decimal places of the reported doses
const DOSE_DP: i32 = 2;

#[derive(Clone)]
pub struct PredictionService {
    yield_model: Option<Arc<dyn ScalarModel>>,
    fertilizer_model: Option<Arc<dyn TripleModel>>,
    catalog: Arc<CropCatalog>,
    benchmark_fallback: bool,
}

impl PredictionService {
    /// Wire the service with whatever models were loaded at startup.
    ///
    /// A model with the wrong output shape for its slot is a configuration
    /// error.
    pub fn new(
        yield_model: Option<NumericModel>,
        fertilizer_model: Option<NumericModel>,
        catalog: Arc<CropCatalog>,
        benchmark_fallback: bool,
    ) -> AppResult<Self> {
        let yield_model = match yield_model {
            Some(NumericModel::Scalar(m)) => Some(m),
            Some(other) => {
                return Err(AppError::Configuration(format!(
                    "yield model {} has {} output, expected scalar",
                    other.name(),
                    other.output_shape()
                )))
            }
            None => None,
        };
        let fertilizer_model = match fertilizer_model {
            Some(NumericModel::Triple(m)) => Some(m),
            Some(other) => {
                return Err(AppError::Configuration(format!(
                    "fertilizer model {} has {} output, expected triple",
                    other.name(),
                    other.output_shape()
                )))
            }
            None => None,
        };

        Ok(Self {
            yield_model,
            fertilizer_model,
            catalog,
            benchmark_fallback,
        })
    }

    pub fn catalog(&self) -> &CropCatalog {
        &self.catalog
    }

    pub fn has_yield_model(&self) -> bool {
        self.yield_model.is_some()
    }

    pub fn has_fertilizer_model(&self) -> bool {
        self.fertilizer_model.is_some()
    }

    /// Predict yield in t/ha with alerts and a benchmark note.
    pub fn predict_yield(&self, request: &YieldRequest) -> AppResult<PredictionResult> {
        let features = &request.features;
        validate_yield_features(features)?;

        let alerts = evaluate_weather_risk(
            &self.catalog,
            &features.crop,
            features.temp_flowering_c,
            features.rain_flowering_mm,
            features.humidity_mean_pct,
        );
        let benchmark = self.catalog.benchmark_yield(&features.crop);

        let Some(model) = &self.yield_model else {
            return match benchmark {
                Some(bench) if self.benchmark_fallback => {
                    tracing::warn!(crop = %features.crop, "yield model missing, returning benchmark");
                    Ok(PredictionResult {
                        value: round_to(bench, YIELD_DP),
                        unit: YIELD_UNIT.to_string(),
                        alerts,
                        benchmark_note: None,
                        status: PredictionStatus::BenchmarkFallback,
                        notice: Some(MAINTENANCE_NOTICE.to_string()),
                    })
                }
                _ => Err(AppError::ModelUnavailable("yield model is not loaded".to_string())),
            };
        };

        let vector = build_vector(&features.feature_map(), model.feature_names())?;
        let raw = model.predict(&vector)?;
        if !raw.is_finite() {
            return Err(AppError::Internal(format!(
                "yield model {} returned a non-finite value",
                model.name()
            )));
        }
        let value = round_to(raw, YIELD_DP);

        tracing::debug!(crop = %features.crop, value, alerts = alerts.len(), "yield predicted");

        Ok(PredictionResult {
            value,
            unit: YIELD_UNIT.to_string(),
            alerts,
            benchmark_note: benchmark.map(|bench| benchmark_note(raw, bench)),
            status: PredictionStatus::Model,
            notice: None,
        })
    }

    /// Recommend N, P and K doses in kg/ha. Never negative.
    pub fn recommend_fertilizer(
        &self,
        features: &FertilizerFeatures,
    ) -> AppResult<FertilizerRecommendation> {
        validate_fertilizer_features(features)?;

        let model = self
            .fertilizer_model
            .as_ref()
            .ok_or_else(|| AppError::ModelUnavailable("fertilizer model is not loaded".to_string()))?;

        let vector = build_vector(&features.feature_map(), model.feature_names())?;
        let dose = model.predict(&vector)?;
        if !dose.is_finite() {
            return Err(AppError::Internal(format!(
                "fertilizer model {} returned a non-finite dose",
                model.name()
            )));
        }
        let dose = dose.clamped().rounded(DOSE_DP);

        tracing::debug!(
            crop = %features.crop,
            n = dose.nitrogen,
            p = dose.phosphorus,
            k = dose.potassium,
            "fertilizer dose recommended"
        );
        Ok(FertilizerRecommendation::new(&features.crop, dose))
    }
}

fn build_vector(features: &FeatureMap, order: &[String]) -> AppResult<FeatureVector> {
    FeatureVector::ordered(features, order).map_err(|missing| {
        AppError::invalid_input(missing, "feature required by the model is missing")
    })
}

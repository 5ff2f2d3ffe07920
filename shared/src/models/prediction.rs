//! Typed feature schemas and prediction results for the numeric models

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::alert::AlertSet;
use super::crop::canonical_crop_name;

pub const YIELD_UNIT: &str = "t/ha";
pub const DOSE_UNIT: &str = "kg/ha";

/// One cell of a feature vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FeatureValue {
    Numeric(f64),
    Categorical(String),
}

impl FeatureValue {
    pub fn categorical(raw: &str) -> Self {
        FeatureValue::Categorical(canonical_category(raw))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Numeric(v) => Some(*v),
            FeatureValue::Categorical(_) => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Numeric(v) => write!(f, "{}", v),
            FeatureValue::Categorical(s) => f.write_str(s),
        }
    }
}

/// Canonical string form for categorical inputs: trimmed, lowercase,
/// inner whitespace collapsed to single spaces.
pub fn canonical_category(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Named features ready for vectorization
pub type FeatureMap = BTreeMap<&'static str, FeatureValue>;

/// Feature vector in the exact order a model declares
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<FeatureValue>,
}

impl FeatureVector {
    /// Arrange `features` in `order`. Every name in `order` must be present;
    /// features not named in `order` are left out.
    pub fn ordered(features: &FeatureMap, order: &[String]) -> Result<Self, String> {
        let mut values = Vec::with_capacity(order.len());
        for name in order {
            match features.get(name.as_str()) {
                Some(value) => values.push(value.clone()),
                None => return Err(name.clone()),
            }
        }
        Ok(Self {
            names: order.to_vec(),
            values,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.names.iter().map(String::as_str).zip(self.values.iter())
    }
}

fn default_maturity_days() -> u32 {
    120
}

fn default_soil_ph() -> f64 {
    6.5
}

fn default_clay_pct() -> f64 {
    30.0
}

fn default_irrigation_events() -> u32 {
    3
}

/// Agronomic, soil, weather and vegetation inputs for the yield model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YieldFeatures {
    pub crop: String,
    #[serde(default = "default_maturity_days")]
    pub maturity_days: u32,
    #[serde(rename = "mean_temp_gs_C")]
    pub mean_temp_gs_c: f64,
    #[serde(rename = "temp_flowering_C")]
    pub temp_flowering_c: f64,
    pub seasonal_rain_mm: f64,
    pub rain_flowering_mm: f64,
    pub humidity_mean_pct: f64,
    #[serde(rename = "soil_pH", default = "default_soil_ph")]
    pub soil_ph: f64,
    #[serde(default = "default_clay_pct")]
    pub clay_pct: f64,
    #[serde(rename = "soil_N_status_kg_ha")]
    pub soil_n_status_kg_ha: f64,
    #[serde(rename = "soil_P_status_kg_ha")]
    pub soil_p_status_kg_ha: f64,
    #[serde(rename = "soil_K_status_kg_ha")]
    pub soil_k_status_kg_ha: f64,
    #[serde(rename = "fert_N_kg_ha")]
    pub fert_n_kg_ha: f64,
    #[serde(rename = "fert_P_kg_ha")]
    pub fert_p_kg_ha: f64,
    #[serde(rename = "fert_K_kg_ha")]
    pub fert_k_kg_ha: f64,
    #[serde(default = "default_irrigation_events")]
    pub irrigation_events: u32,
    pub ndvi_flowering: f64,
    pub ndvi_peak: f64,
    pub ndvi_veg_slope: f64,
    pub soil_moisture_pct: f64,
    #[serde(default)]
    pub variety_group: Option<String>,
    #[serde(default)]
    pub soil_texture: Option<String>,
}

impl YieldFeatures {
    /// All model-facing features by training-column name.
    pub fn feature_map(&self) -> FeatureMap {
        let mut map = FeatureMap::new();
        map.insert("crop", FeatureValue::Categorical(canonical_crop_name(&self.crop)));
        map.insert("maturity_days", FeatureValue::Numeric(self.maturity_days as f64));
        map.insert("mean_temp_gs_C", FeatureValue::Numeric(self.mean_temp_gs_c));
        map.insert("temp_flowering_C", FeatureValue::Numeric(self.temp_flowering_c));
        map.insert("seasonal_rain_mm", FeatureValue::Numeric(self.seasonal_rain_mm));
        map.insert("rain_flowering_mm", FeatureValue::Numeric(self.rain_flowering_mm));
        map.insert("humidity_mean_pct", FeatureValue::Numeric(self.humidity_mean_pct));
        map.insert("soil_pH", FeatureValue::Numeric(self.soil_ph));
        map.insert("clay_pct", FeatureValue::Numeric(self.clay_pct));
        map.insert("soil_N_status_kg_ha", FeatureValue::Numeric(self.soil_n_status_kg_ha));
        map.insert("soil_P_status_kg_ha", FeatureValue::Numeric(self.soil_p_status_kg_ha));
        map.insert("soil_K_status_kg_ha", FeatureValue::Numeric(self.soil_k_status_kg_ha));
        map.insert("fert_N_kg_ha", FeatureValue::Numeric(self.fert_n_kg_ha));
        map.insert("fert_P_kg_ha", FeatureValue::Numeric(self.fert_p_kg_ha));
        map.insert("fert_K_kg_ha", FeatureValue::Numeric(self.fert_k_kg_ha));
        map.insert(
            "irrigation_events",
            FeatureValue::Numeric(self.irrigation_events as f64),
        );
        map.insert("ndvi_flowering", FeatureValue::Numeric(self.ndvi_flowering));
        map.insert("ndvi_peak", FeatureValue::Numeric(self.ndvi_peak));
        map.insert("ndvi_veg_slope", FeatureValue::Numeric(self.ndvi_veg_slope));
        map.insert("soil_moisture_pct", FeatureValue::Numeric(self.soil_moisture_pct));
        if let Some(variety) = &self.variety_group {
            map.insert("variety_group", FeatureValue::categorical(variety));
        }
        if let Some(texture) = &self.soil_texture {
            map.insert("soil_texture", FeatureValue::categorical(texture));
        }
        map
    }

    /// Numeric features only, for the advisory's numeric context.
    pub fn numeric_features(&self) -> BTreeMap<String, f64> {
        self.feature_map()
            .into_iter()
            .filter_map(|(name, value)| value.as_f64().map(|v| (name.to_string(), v)))
            .collect()
    }
}

/// Yield prediction request: model features plus display-only site context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YieldRequest {
    #[serde(flatten)]
    pub features: YieldFeatures,
    /// Shown to the farmer, never fed to the model
    #[serde(default)]
    pub district_display: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
}

/// Inputs for the fertilizer-dose model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FertilizerFeatures {
    pub crop: String,
    /// Yield the farmer is aiming for, t/ha
    pub target_yield: f64,
    #[serde(rename = "soil_N")]
    pub soil_n: f64,
    #[serde(rename = "soil_P")]
    pub soil_p: f64,
    #[serde(rename = "soil_K")]
    pub soil_k: f64,
    /// Mean growing-season temperature, degrees C
    pub temperature: f64,
    pub ph: f64,
    /// Soil moisture, percent
    pub moisture: f64,
}

impl FertilizerFeatures {
    pub fn feature_map(&self) -> FeatureMap {
        let mut map = FeatureMap::new();
        map.insert("crop", FeatureValue::Categorical(canonical_crop_name(&self.crop)));
        map.insert("yield_t_ha", FeatureValue::Numeric(self.target_yield));
        map.insert("soil_N_status_kg_ha", FeatureValue::Numeric(self.soil_n));
        map.insert("soil_P_status_kg_ha", FeatureValue::Numeric(self.soil_p));
        map.insert("soil_K_status_kg_ha", FeatureValue::Numeric(self.soil_k));
        map.insert("mean_temp_gs_C", FeatureValue::Numeric(self.temperature));
        map.insert("soil_pH", FeatureValue::Numeric(self.ph));
        map.insert("soil_moisture_pct", FeatureValue::Numeric(self.moisture));
        map
    }
}

/// How a prediction value was obtained
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    Model,
    /// Crop benchmark returned while the model is under maintenance
    BenchmarkFallback,
}

/// Yield prediction with alerts and benchmark context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionResult {
    pub value: f64,
    pub unit: String,
    pub alerts: AlertSet,
    pub benchmark_note: Option<String>,
    pub status: PredictionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Nutrient dose in kg/ha
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NutrientDose {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
}

impl NutrientDose {
    pub fn is_finite(&self) -> bool {
        self.nitrogen.is_finite() && self.phosphorus.is_finite() && self.potassium.is_finite()
    }

    /// Negative doses are physically meaningless; floor each nutrient at zero.
    pub fn clamped(self) -> Self {
        let floor = |v: f64| v.max(0.0);
        Self {
            nitrogen: floor(self.nitrogen),
            phosphorus: floor(self.phosphorus),
            potassium: floor(self.potassium),
        }
    }

    pub fn rounded(self, dp: i32) -> Self {
        Self {
            nitrogen: round_to(self.nitrogen, dp),
            phosphorus: round_to(self.phosphorus, dp),
            potassium: round_to(self.potassium, dp),
        }
    }
}

/// Fertilizer-dose recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FertilizerRecommendation {
    pub crop: String,
    pub recommended_n: f64,
    pub recommended_p: f64,
    pub recommended_k: f64,
    pub unit: String,
}

impl FertilizerRecommendation {
    pub fn new(crop: &str, dose: NutrientDose) -> Self {
        Self {
            crop: canonical_crop_name(crop),
            recommended_n: dose.nitrogen,
            recommended_p: dose.phosphorus,
            recommended_k: dose.potassium,
            unit: DOSE_UNIT.to_string(),
        }
    }
}

/// Predicted yield as a share of the crop's typical yield.
pub fn benchmark_note(predicted: f64, benchmark: f64) -> String {
    let ratio = predicted / benchmark;
    format!(
        "Typical: {:.2} t/ha. Your yield is {:.1}% of benchmark.",
        benchmark,
        ratio * 100.0
    )
}

pub fn round_to(value: f64, dp: i32) -> f64 {
    let scale = 10f64.powi(dp);
    (value * scale).round() / scale
}

//! Value types for the retrieval-augmented advisory

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::vegetation::GrowthSignals;
use crate::types::Language;

/// A retrieved document passage with provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passage {
    pub text: String,
    pub source_file: String,
    /// Page within the source, numbered from 1, when known
    pub page: Option<u32>,
    pub score: f32,
}

impl Passage {
    /// File name without directories.
    pub fn file_name(&self) -> &str {
        Path::new(&self.source_file)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.source_file)
    }
}

/// Field and yield data handed to the advisory alongside the farmer's query
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NumericContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_yield_t_ha: Option<f64>,
    #[serde(default)]
    pub features: BTreeMap<String, f64>,
    /// Anything else the caller attached (state, yield band, benchmarks...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NumericContext {
    pub fn for_crop(crop: &str) -> Self {
        Self {
            crop: Some(crop.to_string()),
            ..Self::default()
        }
    }

    /// Context used when the caller sends none.
    pub fn unknown() -> Self {
        let mut ctx = Self::for_crop("unknown");
        ctx.extra
            .insert("unit".to_string(), Value::String("t/ha".to_string()));
        ctx
    }

    pub fn with_prediction(mut self, predicted_yield_t_ha: f64) -> Self {
        self.predicted_yield_t_ha = Some(predicted_yield_t_ha);
        self
    }

    /// Record vegetation signals as `ndvi_*` features plus their provenance.
    pub fn merge_growth_signals(&mut self, signals: &GrowthSignals) {
        self.features.insert("ndvi_peak".to_string(), signals.peak);
        self.features
            .insert("ndvi_flowering".to_string(), signals.flowering_proxy);
        self.features
            .insert("ndvi_veg_slope".to_string(), signals.vegetative_slope);
        self.extra.insert(
            "ndvi_source".to_string(),
            serde_json::to_value(signals.provenance).unwrap_or(Value::Null),
        );
    }

    /// `- name = value` lines sorted by feature name.
    pub fn feature_listing(&self) -> String {
        if self.features.is_empty() {
            return "No feature data.".to_string();
        }
        self.features
            .iter()
            .map(|(name, value)| format!("- {} = {}", name, value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Everything assembled for one advisory call. Never persisted.
#[derive(Debug, Clone)]
pub struct AdvisoryContext {
    pub passages: Vec<Passage>,
    pub numeric: NumericContext,
    pub feature_listing: String,
    pub language: Language,
}

impl AdvisoryContext {
    pub fn new(passages: Vec<Passage>, numeric: NumericContext, language: Language) -> Self {
        let feature_listing = numeric.feature_listing();
        Self {
            passages,
            numeric,
            feature_listing,
            language,
        }
    }
}

/// Generated advisory body and its provenance trace
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Advisory {
    pub answer: String,
    pub trace: String,
}

impl Advisory {
    /// Answer followed by the trace block.
    pub fn full_text(&self) -> String {
        format!("{}{}", self.answer.trim_end(), self.trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::vegetation::Provenance;

    #[test]
    fn feature_listing_is_sorted() {
        let mut ctx = NumericContext::for_crop("mustard");
        ctx.features.insert("soil_pH".into(), 6.8);
        ctx.features.insert("fert_N_kg_ha".into(), 80.0);
        assert_eq!(ctx.feature_listing(), "- fert_N_kg_ha = 80\n- soil_pH = 6.8");
    }

    #[test]
    fn empty_listing_placeholder() {
        assert_eq!(NumericContext::default().feature_listing(), "No feature data.");
    }

    #[test]
    fn extra_fields_round_trip_through_flatten() {
        let ctx: NumericContext = serde_json::from_value(serde_json::json!({
            "crop": "soybean",
            "predicted_yield_t_ha": 1.62,
            "state": "Madhya Pradesh",
            "features": {"soil_pH": 7.1}
        }))
        .unwrap();
        assert_eq!(ctx.extra["state"], "Madhya Pradesh");
        assert_eq!(ctx.features["soil_pH"], 7.1);
        assert!(ctx.to_json().contains("\"state\":\"Madhya Pradesh\""));
    }

    #[test]
    fn growth_signals_become_features() {
        let mut ctx = NumericContext::default();
        ctx.merge_growth_signals(&GrowthSignals {
            peak: 0.82,
            flowering_proxy: 0.82,
            vegetative_slope: 0.011,
            sample_count: 7,
            provenance: Provenance::Satellite,
        });
        assert_eq!(ctx.features["ndvi_peak"], 0.82);
        assert_eq!(ctx.extra["ndvi_source"], "satellite");
    }

    #[test]
    fn passage_file_name_strips_directories() {
        let p = Passage {
            text: String::new(),
            source_file: "docs/oilseeds/castor.txt".into(),
            page: Some(2),
            score: 0.5,
        };
        assert_eq!(p.file_name(), "castor.txt");
    }
}

//! In-process fakes shared by the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use farm_advisory_backend::error::{AppError, AppResult};
use farm_advisory_backend::external::{ChatMessage, GenerativeModel, VegetationSource};
use farm_advisory_backend::models::{ScalarModel, TripleModel};
use farm_advisory_backend::services::{QueryRewriter, Retriever};
use shared::{
    BoundingRegion, DateRange, FeatureVector, NutrientDose, Passage, Sample, SessionHistory,
    YieldRequest,
};

// ============================================================================
// Generative model
// ============================================================================

/// Replies with a fixed answer and records every prompt it was sent
pub struct FakeLlm {
    reply: String,
    fail: bool,
    delay: Option<Duration>,
    pub calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FakeLlm {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            fail: false,
            delay: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: String::new(),
            fail: true,
            delay: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(reply: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            fail: false,
            delay: Some(delay),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Vec<ChatMessage> {
        self.calls.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl GenerativeModel for FakeLlm {
    async fn generate(&self, messages: &[ChatMessage]) -> AppResult<String> {
        self.calls.lock().unwrap().push(messages.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(AppError::upstream("Generative model", "503 from fake"));
        }
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "fake-llm"
    }
}

// ============================================================================
// Retrieval
// ============================================================================

/// Returns the same passages for every query and records the queries
pub struct FakeRetriever {
    passages: Vec<Passage>,
    fail: bool,
    pub queries: Mutex<Vec<String>>,
}

impl FakeRetriever {
    pub fn with_passages(passages: Vec<Passage>) -> Arc<Self> {
        Arc::new(Self {
            passages,
            fail: false,
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::with_passages(Vec::new())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            passages: Vec::new(),
            fail: true,
            queries: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Retriever for FakeRetriever {
    async fn retrieve(&self, query: &str) -> AppResult<Vec<Passage>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(AppError::upstream("Semantic index", "index offline"));
        }
        Ok(self.passages.clone())
    }

    fn method(&self) -> String {
        "fake embeddings, MMR".to_string()
    }
}

pub fn passage(file: &str, page: u32, text: &str) -> Passage {
    Passage {
        text: text.to_string(),
        source_file: file.to_string(),
        page: Some(page),
        score: 0.8,
    }
}

/// Leaves the query untouched and records the history length it saw
#[derive(Default)]
pub struct RecordingRewriter {
    pub seen_history: Mutex<Vec<SessionHistory>>,
}

#[async_trait]
impl QueryRewriter for RecordingRewriter {
    async fn rewrite(&self, history: &SessionHistory, query: &str) -> AppResult<String> {
        self.seen_history.lock().unwrap().push(history.clone());
        Ok(query.to_string())
    }
}

// ============================================================================
// Vegetation source
// ============================================================================

pub struct FakeVegetationSource {
    samples: Vec<Sample>,
    fail: bool,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FakeVegetationSource {
    pub fn with_samples(samples: Vec<Sample>) -> Arc<Self> {
        Arc::new(Self {
            samples,
            fail: false,
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            samples: Vec::new(),
            fail: true,
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    /// Answers with `samples` only after `delay`
    pub fn slow(samples: Vec<Sample>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            samples,
            fail: false,
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VegetationSource for FakeVegetationSource {
    async fn fetch_samples(
        &self,
        _region: &BoundingRegion,
        _range: &DateRange,
    ) -> AppResult<Vec<Sample>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(AppError::upstream("Vegetation source", "502 Bad Gateway"));
        }
        Ok(self.samples.clone())
    }
}

// ============================================================================
// Numeric models
// ============================================================================

/// Returns a fixed value and records the feature order it was given
pub struct FixedScalarModel {
    value: f64,
    names: Vec<String>,
    pub seen: Mutex<Vec<Vec<String>>>,
}

impl FixedScalarModel {
    pub fn new(value: f64, names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            value,
            names: names.iter().map(|n| n.to_string()).collect(),
            seen: Mutex::new(Vec::new()),
        })
    }
}

impl ScalarModel for FixedScalarModel {
    fn name(&self) -> &str {
        "fixed-scalar"
    }

    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn predict(&self, features: &FeatureVector) -> AppResult<f64> {
        self.seen.lock().unwrap().push(features.names().to_vec());
        Ok(self.value)
    }
}

/// N, P and K as a linear function of the target yield, which can go
/// negative for high soil status
pub struct LinearDoseModel {
    names: Vec<String>,
}

impl LinearDoseModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            names: [
                "crop",
                "yield_t_ha",
                "soil_N_status_kg_ha",
                "soil_P_status_kg_ha",
                "soil_K_status_kg_ha",
                "mean_temp_gs_C",
                "soil_pH",
                "soil_moisture_pct",
            ]
            .iter()
            .map(|n| n.to_string())
            .collect(),
        })
    }
}

impl TripleModel for LinearDoseModel {
    fn name(&self) -> &str {
        "linear-dose"
    }

    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn predict(&self, features: &FeatureVector) -> AppResult<NutrientDose> {
        let v: Vec<f64> = features
            .values()
            .iter()
            .map(|f| f.as_f64().unwrap_or(0.0))
            .collect();
        Ok(NutrientDose {
            nitrogen: v[1] * 50.0 - v[2],
            phosphorus: v[1] * 25.0 - v[3],
            potassium: v[1] * 35.0 - v[4],
        })
    }
}

/// Returns the same dose whatever the features
pub struct FixedDoseModel {
    dose: NutrientDose,
    names: Vec<String>,
}

impl FixedDoseModel {
    pub fn new(nitrogen: f64, phosphorus: f64, potassium: f64) -> Arc<Self> {
        Arc::new(Self {
            dose: NutrientDose {
                nitrogen,
                phosphorus,
                potassium,
            },
            names: vec!["crop".to_string(), "yield_t_ha".to_string()],
        })
    }
}

impl TripleModel for FixedDoseModel {
    fn name(&self) -> &str {
        "fixed-dose"
    }

    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn predict(&self, _features: &FeatureVector) -> AppResult<NutrientDose> {
        Ok(self.dose)
    }
}

// ============================================================================
// Requests
// ============================================================================

pub fn yield_request(crop: &str) -> YieldRequest {
    serde_json::from_value(serde_json::json!({
        "crop": crop,
        "mean_temp_gs_C": 24.0,
        "temp_flowering_C": 26.0,
        "seasonal_rain_mm": 480.0,
        "rain_flowering_mm": 60.0,
        "humidity_mean_pct": 62.0,
        "soil_pH": 6.8,
        "soil_N_status_kg_ha": 220.0,
        "soil_P_status_kg_ha": 18.0,
        "soil_K_status_kg_ha": 250.0,
        "fert_N_kg_ha": 60.0,
        "fert_P_kg_ha": 40.0,
        "fert_K_kg_ha": 30.0,
        "ndvi_flowering": 0.78,
        "ndvi_peak": 0.78,
        "ndvi_veg_slope": 0.014,
        "soil_moisture_pct": 26.0,
        "district_display": "Khordha",
        "pincode": "752050"
    }))
    .unwrap()
}

//! History-aware query rewriting
//!
//! A follow-up like "what about its irrigation?" only retrieves well once the
//! crop from earlier turns is put back into it. The rewritten query may only
//! name crops and features that the farmer already mentioned.

use std::sync::Arc;

use async_trait::async_trait;
use shared::{CropCatalog, SessionHistory};

use crate::error::AppResult;
use crate::external::GenerativeModel;
use crate::services::prompt::rewrite_messages;

/// Feature names a farmer or an earlier answer may refer to
pub const FEATURE_TERMS: &[&str] = &[
    "maturity_days",
    "mean_temp_gs_C",
    "temp_flowering_C",
    "seasonal_rain_mm",
    "rain_flowering_mm",
    "humidity_mean_pct",
    "soil_pH",
    "clay_pct",
    "soil_N_status_kg_ha",
    "soil_P_status_kg_ha",
    "soil_K_status_kg_ha",
    "fert_N_kg_ha",
    "fert_P_kg_ha",
    "fert_K_kg_ha",
    "irrigation_events",
    "ndvi_flowering",
    "ndvi_peak",
    "ndvi_veg_slope",
    "soil_moisture_pct",
    "variety_group",
    "soil_texture",
];

#[async_trait]
pub trait QueryRewriter: Send + Sync {
    /// Standalone query for retrieval, given the session so far.
    async fn rewrite(&self, history: &SessionHistory, query: &str) -> AppResult<String>;
}

/// Crops and features a rewrite is allowed to mention
#[derive(Debug, Clone)]
pub struct Vocabulary {
    crops: Vec<String>,
    features: Vec<String>,
}

impl Vocabulary {
    pub fn new(catalog: &CropCatalog) -> Self {
        Self {
            crops: catalog.crop_names().map(str::to_string).collect(),
            features: FEATURE_TERMS.iter().map(|f| f.to_lowercase()).collect(),
        }
    }

    fn terms(&self) -> impl Iterator<Item = &str> {
        self.crops.iter().chain(self.features.iter()).map(String::as_str)
    }

    /// Terms mentioned in `text`, in vocabulary order.
    pub fn mentioned_in<'a>(&'a self, text: &str) -> Vec<&'a str> {
        let text = text.to_lowercase();
        self.terms().filter(|term| mentions(&text, term)).collect()
    }
}

/// Whole-word, case-folded containment. `text` must already be lowercase.
fn mentions(text: &str, term: &str) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    text.match_indices(term).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + term.len()..].chars().next();
        !before.map(is_word).unwrap_or(false) && !after.map(is_word).unwrap_or(false)
    })
}

/// Deterministic rewrite: the query plus any crops and features from earlier
/// turns that the query itself does not mention.
#[derive(Debug, Clone)]
pub struct HistoryQueryRewriter {
    vocabulary: Vocabulary,
}

impl HistoryQueryRewriter {
    pub fn new(catalog: &CropCatalog) -> Self {
        Self {
            vocabulary: Vocabulary::new(catalog),
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn rewrite_sync(&self, history: &SessionHistory, query: &str) -> String {
        let query = query.trim();
        if history.is_empty() {
            return query.to_string();
        }
        let in_query = self.vocabulary.mentioned_in(query);
        let carried: Vec<&str> = self
            .vocabulary
            .mentioned_in(&history.searchable_text())
            .into_iter()
            .filter(|term| !in_query.contains(term))
            .collect();

        if carried.is_empty() {
            query.to_string()
        } else {
            format!("{} (context: {})", query, carried.join(", "))
        }
    }
}

#[async_trait]
impl QueryRewriter for HistoryQueryRewriter {
    async fn rewrite(&self, history: &SessionHistory, query: &str) -> AppResult<String> {
        Ok(self.rewrite_sync(history, query))
    }
}

/// Rewrite with the generative model, guarded against invented terms.
///
/// Falls back to [`HistoryQueryRewriter`] when the model fails, returns
/// nothing, or names a crop or feature absent from the query and history.
pub struct LlmQueryRewriter {
    llm: Arc<dyn GenerativeModel>,
    fallback: HistoryQueryRewriter,
}

impl LlmQueryRewriter {
    pub fn new(llm: Arc<dyn GenerativeModel>, catalog: &CropCatalog) -> Self {
        Self {
            llm,
            fallback: HistoryQueryRewriter::new(catalog),
        }
    }
}

#[async_trait]
impl QueryRewriter for LlmQueryRewriter {
    async fn rewrite(&self, history: &SessionHistory, query: &str) -> AppResult<String> {
        if history.is_empty() {
            return Ok(query.trim().to_string());
        }

        let candidate = match self.llm.generate(&rewrite_messages(history, query)).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "query rewrite failed, using history rewrite");
                return Ok(self.fallback.rewrite_sync(history, query));
            }
        };
        if candidate.is_empty() {
            return Ok(self.fallback.rewrite_sync(history, query));
        }

        let vocabulary = self.fallback.vocabulary();
        let allowed = format!("{}\n{}", history.searchable_text(), query.to_lowercase());
        let allowed_terms = vocabulary.mentioned_in(&allowed);
        let invented: Vec<&str> = vocabulary
            .mentioned_in(&candidate)
            .into_iter()
            .filter(|term| !allowed_terms.contains(term))
            .collect();

        if !invented.is_empty() {
            tracing::warn!(?invented, "rewrite introduced new terms, using history rewrite");
            return Ok(self.fallback.rewrite_sync(history, query));
        }

        tracing::debug!(rewritten = %candidate, "query rewritten");
        Ok(candidate)
    }
}

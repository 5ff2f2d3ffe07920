//! Farm advisory backend
//!
//! Yield and fertilizer predictions, weather-risk alerts, satellite growth
//! signals and a retrieval-augmented advisory chat for oilseed farmers.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use shared::CropCatalog;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};

use external::embedding::HASHING_MODEL;
use external::{
    AgroMonitoringClient, Embedder, GenerativeModel, HashingEmbedder, OpenAiChatClient,
    OpenAiEmbeddingClient, VegetationSource,
};
use models::{LinearModel, NumericModel};
use services::{
    AdvisoryService, ChunkingParams, IndexRetriever, LlmQueryRewriter, MmrParams,
    PredictionService, SemanticIndex, SessionStore, VegetationService,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub prediction: PredictionService,
    pub vegetation: VegetationService,
    pub advisory: AdvisoryService,
    pub advisory_timeout: Duration,
}

/// Load models and the index, and wire every service. Runs once at startup;
/// anything missing that a request would need is reported here.
pub async fn build_state(config: &Config) -> AppResult<AppState> {
    let catalog = Arc::new(
        CropCatalog::oilseeds()
            .with_default_crop(&config.crops.default_crop)
            .map_err(|m| AppError::Configuration(m.to_string()))?,
    );
    tracing::info!(default_crop = catalog.default_crop(), "crop catalog ready");

    let yield_model = load_model("yield", config.models.yield_model_path.as_deref())?;
    let fertilizer_model =
        load_model("fertilizer", config.models.fertilizer_model_path.as_deref())?;
    let prediction = PredictionService::new(
        yield_model,
        fertilizer_model,
        catalog.clone(),
        config.models.benchmark_fallback,
    )?;

    let embedder: Arc<dyn Embedder> = if config.embedding.model == HASHING_MODEL {
        Arc::new(HashingEmbedder::new(config.embedding.hashing_dimension))
    } else {
        let api_key = if config.embedding.api_key.is_empty() {
            config.llm.api_key.clone()
        } else {
            config.embedding.api_key.clone()
        };
        Arc::new(OpenAiEmbeddingClient::with_base_url(
            api_key,
            config.embedding.api_endpoint.clone(),
            config.embedding.model.clone(),
        )?)
    };

    let index = SemanticIndex::load_or_build(
        Path::new(&config.index.dir),
        Path::new(&config.index.documents_dir),
        embedder.as_ref(),
        ChunkingParams::from(&config.index),
    )
    .await?;
    let retriever = Arc::new(IndexRetriever::new(
        Arc::new(index),
        embedder,
        MmrParams::from(&config.index),
    ));

    let llm: Arc<dyn GenerativeModel> = Arc::new(OpenAiChatClient::with_base_url(
        config.llm.api_key.clone(),
        config.llm.api_endpoint.clone(),
        config.llm.model.clone(),
        config.llm.temperature,
        Duration::from_secs(config.llm.timeout_secs),
    )?);
    let rewriter = Arc::new(LlmQueryRewriter::new(llm.clone(), &catalog));
    let advisory = AdvisoryService::new(
        retriever,
        llm,
        rewriter,
        SessionStore::from_config(&config.sessions),
    );

    let source: Option<Arc<dyn VegetationSource>> = if config.vegetation.api_key.is_empty() {
        tracing::warn!("vegetation API key not set, growth signals will be synthetic");
        None
    } else {
        Some(Arc::new(AgroMonitoringClient::with_base_url(
            config.vegetation.api_key.clone(),
            config.vegetation.api_endpoint.clone(),
            Duration::from_secs(config.vegetation.timeout_secs),
        )?))
    };
    let vegetation = VegetationService::from_config(source, &config.vegetation);

    Ok(AppState {
        prediction,
        vegetation,
        advisory,
        advisory_timeout: Duration::from_secs(config.server.advisory_timeout_secs),
    })
}

/// An unset path leaves the model absent; a set path that cannot be loaded
/// is fatal.
fn load_model(kind: &str, path: Option<&str>) -> AppResult<Option<NumericModel>> {
    match path.filter(|p| !p.trim().is_empty()) {
        Some(path) => Ok(Some(LinearModel::load(path)?.into_numeric_model())),
        None => {
            tracing::warn!(kind, "no model artifact configured");
            Ok(None)
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Farm Advisory API v1.0"
}

//! Configuration management for the farm advisory server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with AGRI_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Numeric model artifacts
    pub models: ModelsConfig,

    /// Semantic index and document ingestion
    pub index: IndexConfig,

    /// Embeddings endpoint
    pub embedding: EmbeddingConfig,

    /// Generative model endpoint
    pub llm: LlmConfig,

    /// Satellite vegetation-index source
    pub vegetation: VegetationConfig,

    /// Conversation session store bounds
    pub sessions: SessionConfig,

    /// Crop catalog settings
    pub crops: CropsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,

    /// Upper bound on one advisory call, in seconds
    pub advisory_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelsConfig {
    /// Yield model artifact (JSON)
    pub yield_model_path: Option<String>,

    /// Fertilizer-dose model artifact (JSON)
    pub fertilizer_model_path: Option<String>,

    /// Return the crop benchmark, flagged, when the yield model is missing
    pub benchmark_fallback: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Directory holding the persisted index
    pub dir: String,

    /// Source documents ingested when no index exists yet
    pub documents_dir: String,

    /// Chunk size in characters
    pub chunk_size: usize,

    /// Overlap between neighbouring chunks in characters
    pub chunk_overlap: usize,

    /// Passages returned per query
    pub k: usize,

    /// Candidates considered before diversity re-ranking
    pub fetch_k: usize,

    /// 1.0 is pure relevance, 0.0 is pure diversity
    pub mmr_lambda: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// Embedding model name; `hashing` selects the offline embedder
    pub model: String,

    /// OpenAI-compatible API base URL
    pub api_endpoint: String,

    /// API key (falls back to the LLM key when empty)
    pub api_key: String,

    /// Dimension of the offline hashing embedder
    pub hashing_dimension: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// OpenAI-compatible API base URL
    pub api_endpoint: String,

    /// API key
    pub api_key: String,

    /// Chat model name
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VegetationConfig {
    /// Agromonitoring API base URL
    pub api_endpoint: String,

    /// API key; the synthetic fallback is used when empty
    pub api_key: String,

    /// Default history window in days
    pub lookback_days: i64,

    /// Half side of the square region around a field, in degrees
    pub region_half_extent_deg: f64,

    /// Timeout in seconds for each API request and for a whole fetch
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Maximum number of live sessions
    pub capacity: usize,

    /// Idle time after which a session is dropped, in seconds
    pub idle_ttl_secs: u64,

    /// Turns kept per session
    pub max_turns: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CropsConfig {
    /// Crop whose thresholds apply to unknown crops
    pub default_crop: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("AGRI_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 8000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.advisory_timeout_secs", 90)?
            .set_default("models.benchmark_fallback", true)?
            .set_default("index.dir", "data/index")?
            .set_default("index.documents_dir", "data/documents")?
            .set_default("index.chunk_size", 1100)?
            .set_default("index.chunk_overlap", 150)?
            .set_default("index.k", 10)?
            .set_default("index.fetch_k", 20)?
            .set_default("index.mmr_lambda", 0.3)?
            .set_default("embedding.model", "text-embedding-3-small")?
            .set_default("embedding.api_endpoint", "https://api.openai.com/v1")?
            .set_default("embedding.api_key", "")?
            .set_default("embedding.hashing_dimension", 384)?
            .set_default("llm.api_endpoint", "https://api.openai.com/v1")?
            .set_default("llm.api_key", "")?
            .set_default("llm.model", "gpt-4.1")?
            .set_default("llm.temperature", 0.15)?
            .set_default("llm.timeout_secs", 60)?
            .set_default("vegetation.api_endpoint", "https://api.agromonitoring.com")?
            .set_default("vegetation.api_key", "")?
            .set_default("vegetation.lookback_days", 60)?
            .set_default("vegetation.region_half_extent_deg", 0.01)?
            .set_default("vegetation.timeout_secs", 20)?
            .set_default("sessions.capacity", 1000)?
            .set_default("sessions.idle_ttl_secs", 3600)?
            .set_default("sessions.max_turns", 40)?
            .set_default("crops.default_crop", shared::DEFAULT_FALLBACK_CROP)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (AGRI_ prefix)
            .add_source(
                Environment::with_prefix("AGRI")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "0.0.0.0".to_string(),
            advisory_timeout_secs: 90,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            idle_ttl_secs: 3600,
            max_turns: 40,
        }
    }
}

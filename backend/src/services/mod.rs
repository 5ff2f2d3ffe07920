//! Services for the farm advisory platform

pub mod advisory;
pub mod index;
pub mod prediction;
pub mod prompt;
pub mod retrieval;
pub mod rewrite;
pub mod session;
pub mod trace;
pub mod vegetation;

pub use advisory::AdvisoryService;
pub use index::{ChunkingParams, MmrParams, SemanticIndex};
pub use prediction::PredictionService;
pub use retrieval::{IndexRetriever, Retriever};
pub use rewrite::{HistoryQueryRewriter, LlmQueryRewriter, QueryRewriter};
pub use session::{SessionGuard, SessionStore};
pub use vegetation::VegetationService;

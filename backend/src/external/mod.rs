//! External API integrations

pub mod embedding;
pub mod llm;
pub mod vegetation;

pub use embedding::{Embedder, HashingEmbedder, OpenAiEmbeddingClient};
pub use llm::{ChatMessage, ChatRole, GenerativeModel, OpenAiChatClient};
pub use vegetation::{AgroMonitoringClient, VegetationSource};

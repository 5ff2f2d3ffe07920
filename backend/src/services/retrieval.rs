//! Passage retrieval for the advisory pipeline

use std::sync::Arc;

use async_trait::async_trait;
use shared::Passage;

use crate::error::AppResult;
use crate::external::Embedder;
use crate::services::index::{MmrParams, SemanticIndex};

/// `query_text -> ranked passages with provenance`
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> AppResult<Vec<Passage>>;

    /// Human-readable description of the embedding and ranking used.
    fn method(&self) -> String;
}

/// Retriever backed by the in-memory semantic index
#[derive(Clone)]
pub struct IndexRetriever {
    index: Arc<SemanticIndex>,
    embedder: Arc<dyn Embedder>,
    params: MmrParams,
}

impl IndexRetriever {
    pub fn new(index: Arc<SemanticIndex>, embedder: Arc<dyn Embedder>, params: MmrParams) -> Self {
        Self {
            index,
            embedder,
            params,
        }
    }

    pub fn index(&self) -> &SemanticIndex {
        &self.index
    }
}

#[async_trait]
impl Retriever for IndexRetriever {
    async fn retrieve(&self, query: &str) -> AppResult<Vec<Passage>> {
        let embedding = self.embedder.embed(query).await?;
        let passages = self.index.search_mmr(&embedding, &self.params)?;
        tracing::debug!(passages = passages.len(), "retrieved passages");
        Ok(passages)
    }

    fn method(&self) -> String {
        format!(
            "{} embeddings, MMR (k={}, fetch_k={}, lambda={})",
            self.embedder.model_name(),
            self.params.k,
            self.params.fetch_k,
            self.params.lambda
        )
    }
}

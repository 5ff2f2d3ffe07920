//! Text embedding clients
//!
//! `OpenAiEmbeddingClient` calls an OpenAI-compatible `/embeddings` endpoint.
//! `HashingEmbedder` is a deterministic offline embedder used when no
//! endpoint is configured and in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const SERVICE: &str = "Embedding service";

/// Name reported by the offline embedder
pub const HASHING_MODEL: &str = "hashing";

/// Maps text to dense vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Identifies the vector space; an index built with one model cannot be
    /// queried with another.
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible embeddings client
#[derive(Clone)]
pub struct OpenAiEmbeddingClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedItem>,
}

#[derive(Deserialize)]
struct EmbedItem {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingClient {
    pub fn with_base_url(api_key: String, base_url: String, model: String) -> AppResult<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::Configuration(
                "embedding API key is not set (AGRI__EMBEDDING__API_KEY)".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    async fn request(&self, input: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbedRequest {
                model: &self.model,
                input,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(SERVICE)
                } else {
                    AppError::upstream(SERVICE, format!("request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(
                SERVICE,
                format!("API error: {} - {}", status, body),
            ));
        }

        let mut data: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("failed to parse response: {}", e)))?;

        if data.data.len() != input.len() {
            return Err(AppError::upstream(
                SERVICE,
                format!("expected {} embeddings, got {}", input.len(), data.data.len()),
            ));
        }
        data.data.sort_by_key(|item| item.index);
        Ok(data.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut vectors = self.request(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| AppError::upstream(SERVICE, "empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(64) {
            out.extend(self.request(batch).await?);
        }
        Ok(out)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Deterministic bag-of-words embedder: each lowercase token is hashed into
/// one of `dimension` buckets and the result is L2-normalized.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let pos = (fnv1a(&token.to_lowercase()) % self.dimension as u64) as usize;
            embedding[pos] += 1.0;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }
        embedding
    }
}

// Stable across toolchains, so a persisted hashing index stays queryable.
fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn model_name(&self) -> &str {
        HASHING_MODEL
    }
}

//! Semantic index over the advisory document collection
//!
//! Documents are plain text or markdown, with pages separated by form feeds.
//! Each page is split into overlapping chunks, every chunk is embedded once,
//! and the result is persisted as JSON. Building is idempotent: an existing
//! index on disk is loaded instead of rebuilt.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shared::Passage;

use crate::config::IndexConfig;
use crate::error::{AppError, AppResult};
use crate::external::Embedder;

pub const INDEX_FILE: &str = "index.json";

const PAGE_BREAK: char = '\x0c';

const DOCUMENT_EXTENSIONS: [&str; 3] = ["txt", "md", "markdown"];

/// Chunk size and overlap, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingParams {
    pub size: usize,
    pub overlap: usize,
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self {
            size: 1100,
            overlap: 150,
        }
    }
}

/// Diversity-aware search parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MmrParams {
    /// Passages returned
    pub k: usize,
    /// Candidates ranked by similarity before re-ranking
    pub fetch_k: usize,
    /// 1.0 ranks by relevance only, 0.0 by diversity only
    pub lambda: f32,
}

impl Default for MmrParams {
    fn default() -> Self {
        Self {
            k: 10,
            fetch_k: 20,
            lambda: 0.3,
        }
    }
}

impl From<&IndexConfig> for MmrParams {
    fn from(config: &IndexConfig) -> Self {
        Self {
            k: config.k,
            fetch_k: config.fetch_k.max(config.k),
            lambda: config.mmr_lambda.clamp(0.0, 1.0),
        }
    }
}

impl From<&IndexConfig> for ChunkingParams {
    fn from(config: &IndexConfig) -> Self {
        Self {
            size: config.chunk_size,
            overlap: config.chunk_overlap,
        }
    }
}

/// A source document split into pages
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub path: String,
    pub pages: Vec<String>,
}

impl SourceDocument {
    pub fn from_text(path: impl Into<String>, text: &str) -> Self {
        Self {
            path: path.into(),
            pages: text.split(PAGE_BREAK).map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub id: String,
    pub text: String,
    pub source_file: String,
    pub page: Option<u32>,
    pub embedding: Vec<f32>,
}

/// Persisted embedding index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticIndex {
    embedding_model: String,
    dimension: usize,
    chunks: Vec<IndexedChunk>,
}

impl SemanticIndex {
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Whether a persisted index is present in `dir`.
    pub fn exists(dir: &Path) -> bool {
        dir.join(INDEX_FILE).is_file()
    }

    pub fn load(dir: &Path) -> AppResult<Self> {
        let path = dir.join(INDEX_FILE);
        let data = fs::read_to_string(&path).map_err(|e| {
            AppError::Configuration(format!("cannot read index {}: {}", path.display(), e))
        })?;
        let index: Self = serde_json::from_str(&data).map_err(|e| {
            AppError::Configuration(format!("invalid index {}: {}", path.display(), e))
        })?;
        tracing::info!(
            path = %path.display(),
            chunks = index.chunks.len(),
            model = %index.embedding_model,
            "loaded semantic index"
        );
        Ok(index)
    }

    /// Write the index, replacing any previous file in one rename.
    pub fn save(&self, dir: &Path) -> AppResult<()> {
        fs::create_dir_all(dir)
            .map_err(|e| AppError::Internal(format!("cannot create {}: {}", dir.display(), e)))?;
        let data = serde_json::to_string(self)
            .map_err(|e| AppError::Internal(format!("cannot serialize index: {}", e)))?;
        let tmp = dir.join(format!("{}.tmp", INDEX_FILE));
        fs::write(&tmp, data)
            .map_err(|e| AppError::Internal(format!("cannot write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, dir.join(INDEX_FILE))
            .map_err(|e| AppError::Internal(format!("cannot finalize index: {}", e)))?;
        Ok(())
    }

    /// Chunk and embed `documents`.
    pub async fn build(
        documents: &[SourceDocument],
        embedder: &dyn Embedder,
        chunking: ChunkingParams,
    ) -> AppResult<Self> {
        let mut pending = Vec::new();
        for doc in documents {
            // pages are numbered from 1 as printed
            for (page_no, page) in (1u32..).zip(doc.pages.iter()) {
                for (i, text) in chunk_text(page, chunking.size, chunking.overlap)
                    .into_iter()
                    .enumerate()
                {
                    pending.push((
                        format!("{}#p{}c{}", doc.path, page_no, i),
                        text,
                        doc.path.clone(),
                        page_no,
                    ));
                }
            }
        }

        let texts: Vec<String> = pending.iter().map(|(_, text, _, _)| text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(AppError::Internal(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                texts.len()
            )));
        }
        let dimension = embeddings.first().map(Vec::len).unwrap_or_default();
        if embeddings.iter().any(|e| e.len() != dimension) {
            return Err(AppError::Internal(
                "embedder returned vectors of differing dimension".to_string(),
            ));
        }

        let chunks = pending
            .into_iter()
            .zip(embeddings)
            .map(|((id, text, source_file, page), embedding)| IndexedChunk {
                id,
                text,
                source_file,
                page: Some(page),
                embedding,
            })
            .collect::<Vec<_>>();

        tracing::info!(
            documents = documents.len(),
            chunks = chunks.len(),
            model = embedder.model_name(),
            "built semantic index"
        );

        Ok(Self {
            embedding_model: embedder.model_name().to_string(),
            dimension,
            chunks,
        })
    }

    /// Load the persisted index, or ingest `documents_dir` and persist it
    /// when none exists yet.
    pub async fn load_or_build(
        index_dir: &Path,
        documents_dir: &Path,
        embedder: &dyn Embedder,
        chunking: ChunkingParams,
    ) -> AppResult<Self> {
        if Self::exists(index_dir) {
            let index = Self::load(index_dir)?;
            if index.embedding_model != embedder.model_name() {
                return Err(AppError::Configuration(format!(
                    "index at {} was built with embedding model {}, configured model is {}",
                    index_dir.display(),
                    index.embedding_model,
                    embedder.model_name()
                )));
            }
            return Ok(index);
        }

        tracing::info!(dir = %documents_dir.display(), "no index found, ingesting documents");
        let documents = load_documents(documents_dir)?;
        if documents.is_empty() {
            return Err(AppError::Configuration(format!(
                "no index at {} and no documents to ingest in {}",
                index_dir.display(),
                documents_dir.display()
            )));
        }
        let index = Self::build(&documents, embedder, chunking).await?;
        index.save(index_dir)?;
        Ok(index)
    }

    /// Relevant and mutually diverse passages for a query embedding
    /// (maximal marginal relevance).
    pub fn search_mmr(&self, query: &[f32], params: &MmrParams) -> AppResult<Vec<Passage>> {
        if self.chunks.is_empty() || params.k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(AppError::Configuration(format!(
                "query embedding has dimension {}, index has {}",
                query.len(),
                self.dimension
            )));
        }

        let mut ranked: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (i, cosine_similarity(query, &chunk.embedding)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(params.fetch_k.max(params.k));

        let selected = mmr_select(&self.chunks, &ranked, params.k, params.lambda);

        Ok(selected
            .into_iter()
            .map(|(i, score)| {
                let chunk = &self.chunks[i];
                Passage {
                    text: chunk.text.clone(),
                    source_file: chunk.source_file.clone(),
                    page: chunk.page,
                    score,
                }
            })
            .collect())
    }
}

/// Greedy MMR over `candidates` (index, query similarity), best first.
fn mmr_select(
    chunks: &[IndexedChunk],
    candidates: &[(usize, f32)],
    k: usize,
    lambda: f32,
) -> Vec<(usize, f32)> {
    let mut remaining: Vec<(usize, f32)> = candidates.to_vec();
    let mut selected: Vec<(usize, f32)> = Vec::with_capacity(k.min(remaining.len()));

    while selected.len() < k && !remaining.is_empty() {
        let mut best_pos = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (pos, &(idx, relevance)) in remaining.iter().enumerate() {
            let redundancy = selected
                .iter()
                .map(|&(s, _)| cosine_similarity(&chunks[idx].embedding, &chunks[s].embedding))
                .fold(f32::NEG_INFINITY, f32::max);
            let redundancy = if redundancy.is_finite() { redundancy } else { 0.0 };
            let score = lambda * relevance - (1.0 - lambda) * redundancy;
            if score > best_score {
                best_score = score;
                best_pos = pos;
            }
        }
        selected.push(remaining.remove(best_pos));
    }
    selected
}

/// Cosine similarity; 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Split text into chunks of at most `size` characters, packing whole words
/// and carrying up to `overlap` characters of trailing words into the next
/// chunk. A single word longer than `size` becomes its own chunk.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let size = size.max(1);
    let overlap = overlap.min(size / 2);

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let joined_len = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };

        if joined_len > size && !current.is_empty() {
            chunks.push(current.join(" "));

            let mut carried: Vec<&str> = Vec::new();
            let mut carried_len = 0usize;
            for &w in current.iter().rev() {
                let extra = w.chars().count() + usize::from(!carried.is_empty());
                if carried_len + extra > overlap {
                    break;
                }
                carried_len += extra;
                carried.push(w);
            }
            carried.reverse();
            if carried_len + 1 + word_len > size {
                carried.clear();
                carried_len = 0;
            }
            current = carried;
            current_len = carried_len;
        }

        current_len = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };
        current.push(word);
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }
    chunks
}

/// Read every text document under `dir`, in path order.
pub fn load_documents(dir: &Path) -> AppResult<Vec<SourceDocument>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    collect_document_paths(dir, &mut paths)?;
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let text = fs::read_to_string(&path)
            .map_err(|e| AppError::Configuration(format!("cannot read {}: {}", path.display(), e)))?;
        documents.push(SourceDocument::from_text(path.display().to_string(), &text));
    }
    Ok(documents)
}

fn collect_document_paths(dir: &Path, out: &mut Vec<PathBuf>) -> AppResult<()> {
    let entries = fs::read_dir(dir)
        .map_err(|e| AppError::Configuration(format!("cannot list {}: {}", dir.display(), e)))?;
    for entry in entries {
        let path = entry
            .map_err(|e| AppError::Configuration(format!("cannot list {}: {}", dir.display(), e)))?
            .path();
        if path.is_dir() {
            collect_document_paths(&path, out)?;
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| DOCUMENT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false)
        {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_respect_size_and_overlap() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let chunks = chunk_text(text, 16, 6);
        assert!(chunks.iter().all(|c| c.chars().count() <= 16));
        assert_eq!(chunks[0], "alpha beta gamma");
        // "gamma" is carried into the next chunk
        assert!(chunks[1].starts_with("gamma"));
    }

    #[test]
    fn long_word_becomes_own_chunk() {
        let chunks = chunk_text("a supercalifragilistic b", 5, 0);
        assert_eq!(chunks, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk_text("   \n ", 100, 10).is_empty());
    }

    #[test]
    fn chunking_counts_characters_not_bytes() {
        let text = "सरसों की खेती में सिंचाई";
        for chunk in chunk_text(text, 8, 2) {
            assert!(chunk.chars().count() <= 8 || !chunk.contains(' '));
        }
    }

    #[test]
    fn form_feed_splits_pages() {
        let doc = SourceDocument::from_text("guide.txt", "page one\x0cpage two");
        assert_eq!(doc.pages, vec!["page one", "page two"]);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
    }
}

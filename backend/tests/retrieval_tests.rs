//! Retrieval integration tests
//!
//! Document ingestion, index persistence and diversity-aware passage
//! selection using the offline hashing embedder.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use farm_advisory_backend::error::{AppError, AppResult};
use farm_advisory_backend::external::{Embedder, HashingEmbedder};
use farm_advisory_backend::services::index::{load_documents, SourceDocument};
use farm_advisory_backend::services::{
    ChunkingParams, IndexRetriever, MmrParams, Retriever, SemanticIndex,
};
use tempfile::TempDir;

const APHID_CONTROL: &str = "Mustard aphid control: spray neem oil early when colonies appear on the inflorescence.";

fn embedder() -> Arc<dyn Embedder> {
    Arc::new(HashingEmbedder::new(384))
}

fn corpus() -> Vec<SourceDocument> {
    vec![
        SourceDocument::from_text(
            "docs/mustard_guide.txt",
            &format!("Introduction to rabi oilseeds.\x0c{}", APHID_CONTROL),
        ),
        SourceDocument::from_text("docs/mustard_copy.txt", APHID_CONTROL),
        SourceDocument::from_text(
            "docs/mustard_scouting.txt",
            "Scout mustard fields weekly for aphid colonies with yellow sticky traps.",
        ),
        SourceDocument::from_text(
            "docs/soybean_rust.txt",
            "Soybean rust appears as tan lesions on lower leaves during humid weather.",
        ),
    ]
}

fn write_docs(dir: &Path) {
    fs::write(
        dir.join("groundnut.txt"),
        "Groundnut needs gypsum at pegging.\x0cHarvest when the inner shell darkens.",
    )
    .unwrap();
    fs::create_dir_all(dir.join("nested")).unwrap();
    fs::write(
        dir.join("nested").join("sesame.md"),
        "Sesame is sensitive to waterlogging at every stage.",
    )
    .unwrap();
    fs::write(dir.join("notes.csv"), "ignored,file").unwrap();
}

/// Same vectors as the hashing embedder under a different model name
struct RenamedEmbedder(HashingEmbedder);

#[async_trait]
impl Embedder for RenamedEmbedder {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        Ok(self.0.embed_sync(text))
    }

    fn model_name(&self) -> &str {
        "another-model"
    }
}

// ============================================================================
// Ingestion Tests
// ============================================================================

#[cfg(test)]
mod ingestion_tests {
    use super::*;

    #[test]
    fn test_documents_loaded_recursively_in_path_order() {
        let dir = TempDir::new().unwrap();
        write_docs(dir.path());

        let docs = load_documents(dir.path()).unwrap();

        assert_eq!(docs.len(), 2);
        assert!(docs[0].path.ends_with("groundnut.txt"));
        assert_eq!(docs[0].pages.len(), 2);
        assert!(docs[1].path.ends_with("sesame.md"));
    }

    #[test]
    fn test_missing_directory_has_no_documents() {
        let dir = TempDir::new().unwrap();
        let docs = load_documents(&dir.path().join("absent")).unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_index_persists_and_reloads() {
        let docs_dir = TempDir::new().unwrap();
        let index_dir = TempDir::new().unwrap();
        write_docs(docs_dir.path());
        let embedder = embedder();

        assert!(!SemanticIndex::exists(index_dir.path()));
        let built = SemanticIndex::load_or_build(
            index_dir.path(),
            docs_dir.path(),
            embedder.as_ref(),
            ChunkingParams::default(),
        )
        .await
        .unwrap();
        assert!(SemanticIndex::exists(index_dir.path()));

        // documents removed: a second start must come from the persisted file
        fs::remove_file(docs_dir.path().join("groundnut.txt")).unwrap();
        let loaded = SemanticIndex::load_or_build(
            index_dir.path(),
            docs_dir.path(),
            embedder.as_ref(),
            ChunkingParams::default(),
        )
        .await
        .unwrap();

        assert_eq!(built.len(), 3);
        assert_eq!(loaded.len(), built.len());
        assert_eq!(loaded.embedding_model(), "hashing");
        assert_eq!(loaded.dimension(), 384);
    }

    #[tokio::test]
    async fn test_index_from_other_model_is_rejected() {
        let docs_dir = TempDir::new().unwrap();
        let index_dir = TempDir::new().unwrap();
        write_docs(docs_dir.path());
        SemanticIndex::load_or_build(
            index_dir.path(),
            docs_dir.path(),
            embedder().as_ref(),
            ChunkingParams::default(),
        )
        .await
        .unwrap();

        let other = RenamedEmbedder(HashingEmbedder::new(384));
        let result = SemanticIndex::load_or_build(
            index_dir.path(),
            docs_dir.path(),
            &other,
            ChunkingParams::default(),
        )
        .await;
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_no_index_and_no_documents_is_configuration_error() {
        let empty = TempDir::new().unwrap();
        let result = SemanticIndex::load_or_build(
            &empty.path().join("index"),
            &empty.path().join("docs"),
            embedder().as_ref(),
            ChunkingParams::default(),
        )
        .await;
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}

// ============================================================================
// Search Tests
// ============================================================================

#[cfg(test)]
mod search_tests {
    use super::*;

    async fn retriever(k: usize, fetch_k: usize) -> IndexRetriever {
        let embedder = embedder();
        let index = SemanticIndex::build(&corpus(), embedder.as_ref(), ChunkingParams::default())
            .await
            .unwrap();
        IndexRetriever::new(
            Arc::new(index),
            embedder,
            MmrParams {
                k,
                fetch_k,
                lambda: 0.3,
            },
        )
    }

    #[tokio::test]
    async fn test_most_relevant_passage_comes_first() {
        let retriever = retriever(3, 5).await;
        let passages = retriever.retrieve("how to control mustard aphid").await.unwrap();

        assert_eq!(passages.len(), 3);
        assert_eq!(passages[0].text, APHID_CONTROL);
        assert_eq!(passages[0].source_file, "docs/mustard_guide.txt");
        assert_eq!(passages[0].page, Some(2));
    }

    #[tokio::test]
    async fn test_near_duplicates_do_not_crowd_out_other_passages() {
        let retriever = retriever(2, 5).await;
        let passages = retriever.retrieve("mustard aphid control").await.unwrap();

        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].text, APHID_CONTROL);
        assert_ne!(passages[1].text, APHID_CONTROL);
    }

    #[tokio::test]
    async fn test_k_bounds_result_count() {
        let retriever = retriever(10, 20).await;
        let passages = retriever.retrieve("oilseed").await.unwrap();
        // one chunk per page: guide has two pages
        assert_eq!(passages.len(), 5);
    }

    #[tokio::test]
    async fn test_method_names_embedding_and_ranking() {
        let retriever = retriever(4, 8).await;
        assert_eq!(
            retriever.method(),
            "hashing embeddings, MMR (k=4, fetch_k=8, lambda=0.3)"
        );
    }
}

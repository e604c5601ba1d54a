//! Vector store abstraction layer.
//!
//! Backends persist chunk vectors together with the metadata needed to decide
//! whether an existing collection can be reused: the embedding model, the
//! vector dimension and the checksum of the source it was built from.

mod qdrant;
mod sqlite;

pub use qdrant::QdrantBackend;
pub use sqlite::{DB_FILE, SqliteBackend};

use async_trait::async_trait;

use crate::error::VectorStoreError;
use crate::models::{DocumentChunk, SearchResult, VectorDriver, VectorStoreConfig};

/// Metadata written when a collection is created.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionMeta {
    pub dimension: u64,
    pub embedding_model: String,
    pub source_checksum: Option<String>,
}

/// State of an existing collection.
#[derive(Debug, Clone, Default)]
pub struct CollectionInfo {
    pub points_count: u64,
    pub dimension: Option<u64>,
    pub embedding_model: Option<String>,
    pub source_checksum: Option<String>,
    /// Set once every chunk of the build has been stored. A collection left
    /// behind by an interrupted build stays incomplete.
    pub complete: bool,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check that the store is reachable.
    async fn health_check(&self) -> Result<bool, VectorStoreError>;

    /// Returns None if the collection doesn't exist.
    async fn get_collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError>;

    /// Create the collection if it doesn't exist and record its metadata.
    async fn create_collection(&self, meta: &CollectionMeta) -> Result<(), VectorStoreError>;

    /// Record that the build finished and the collection may be reused.
    async fn mark_complete(&self) -> Result<(), VectorStoreError>;

    /// Insert or replace chunks with their embeddings.
    async fn upsert_points(&self, chunks: Vec<DocumentChunk>) -> Result<(), VectorStoreError>;

    /// Cosine-similarity search, best match first.
    async fn search(
        &self,
        query_vector: Vec<f32>,
        limit: u64,
        min_score: Option<f32>,
    ) -> Result<Vec<SearchResult>, VectorStoreError>;

    /// Drop the collection and everything in it.
    async fn delete_collection(&self) -> Result<(), VectorStoreError>;

    fn collection(&self) -> &str;
}

/// Create a vector store backend based on configuration.
pub async fn create_backend(
    config: &VectorStoreConfig,
) -> Result<Box<dyn VectorStore>, VectorStoreError> {
    match config.driver {
        VectorDriver::Sqlite => {
            let backend = SqliteBackend::open(&config.path, &config.collection)?;
            Ok(Box::new(backend))
        }
        VectorDriver::Qdrant => {
            let backend = QdrantBackend::new(config)?;
            Ok(Box::new(backend))
        }
    }
}

/// Cosine similarity of two vectors; 0.0 when either is zero or lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

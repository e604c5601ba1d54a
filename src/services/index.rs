//! Persistent embedding index over the chunked source document.
//!
//! A collection is built once and reused on every later start while it holds
//! entries and its build ran to completion. A collection left behind by an
//! interrupted build is dropped and built again. Reuse checks that the stored embedding model and dimension match
//! the configured embedder; a changed source document only produces a
//! warning; `rebuild` is the explicit way to re-ingest.

use std::path::Path;
use std::sync::Arc;

use indicatif::ProgressBar;
use serde::Serialize;

use crate::error::{IndexError, IngestionError};
use crate::models::{Config, DocumentChunk, SearchResult};
use crate::services::batch::process_batch;
use crate::services::embedding::{Embedder, create_embedder};
use crate::services::ingest::DocumentIngestor;
use crate::services::vector_store::{CollectionInfo, CollectionMeta, VectorStore, create_backend};
use crate::utils::{RetryConfig, calculate_file_checksum};

/// How `build_or_load` satisfied the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndexStatus {
    /// Chunks were embedded and stored.
    Built { chunks: usize },
    /// An existing collection was reused without re-embedding.
    Reused { points: u64, stale: bool },
}

/// Result of opening the index for queries.
#[derive(Debug, Clone, Serialize)]
pub struct IndexHandle {
    pub collection: String,
    pub embedding_model: String,
    #[serde(flatten)]
    pub status: IndexStatus,
}

pub struct EmbeddingIndex {
    embedder: Arc<dyn Embedder>,
    store: Box<dyn VectorStore>,
    batch_size: usize,
    min_score: Option<f32>,
    retry: RetryConfig,
    progress: ProgressBar,
}

impl EmbeddingIndex {
    pub fn new(embedder: Arc<dyn Embedder>, store: Box<dyn VectorStore>, batch_size: usize) -> Self {
        Self {
            embedder,
            store,
            batch_size: batch_size.max(1),
            min_score: None,
            retry: RetryConfig::default(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Construct the embedder and store named by the configuration.
    pub async fn open(config: &Config) -> Result<Self, IndexError> {
        let embedder = create_embedder(&config.embedding)?;
        let store = create_backend(&config.vector_store)
            .await
            .map_err(IndexError::Unavailable)?;
        store.health_check().await.map_err(IndexError::Unavailable)?;

        Ok(Self::new(embedder, store, config.embedding.batch_size as usize)
            .with_min_score(config.retrieval.min_score))
    }

    #[must_use]
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Report embedding progress (in chunks) on this bar.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn collection(&self) -> &str {
        self.store.collection()
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub async fn info(&self) -> Result<Option<CollectionInfo>, IndexError> {
        self.store
            .get_collection_info()
            .await
            .map_err(IndexError::Unavailable)
    }

    /// Reuse the collection if it holds entries, otherwise embed and store
    /// the chunks produced by `load`.
    ///
    /// `load` is only called when a build is needed. `source_checksum`
    /// identifies the current source document version, if known.
    pub async fn build_or_load<F>(
        &self,
        source_checksum: Option<String>,
        load: F,
    ) -> Result<IndexHandle, IndexError>
    where
        F: FnOnce() -> Result<Vec<DocumentChunk>, IngestionError>,
    {
        let info = self.info().await?;

        if let Some(info) = info.as_ref()
            && info.points_count > 0
            && info.complete
        {
            self.verify_compatible(info)?;
            let stale = match (&info.source_checksum, &source_checksum) {
                (Some(stored), Some(current)) => stored != current,
                _ => false,
            };
            if stale {
                tracing::warn!(
                    collection = self.collection(),
                    "source document changed since the index was built; \
                     reusing the existing index (run `tqa index rebuild` to re-ingest)"
                );
            }
            tracing::info!(
                collection = self.collection(),
                points = info.points_count,
                "reusing existing index"
            );
            return Ok(self.handle(IndexStatus::Reused {
                points: info.points_count,
                stale,
            }));
        }

        // Empty or partial leftovers may carry other metadata
        if let Some(info) = info {
            if info.points_count > 0 {
                tracing::warn!(
                    collection = self.collection(),
                    points = info.points_count,
                    "index build did not finish last time; rebuilding"
                );
            }
            self.store.delete_collection().await?;
        }

        let chunks = load()?;
        let count = self.build(chunks, source_checksum).await?;
        Ok(self.handle(IndexStatus::Built { chunks: count }))
    }

    /// Drop the collection and build it again from `load`.
    pub async fn rebuild<F>(
        &self,
        source_checksum: Option<String>,
        load: F,
    ) -> Result<IndexHandle, IndexError>
    where
        F: FnOnce() -> Result<Vec<DocumentChunk>, IngestionError>,
    {
        // Load first so a broken source leaves the old index in place
        let chunks = load()?;
        self.store
            .delete_collection()
            .await
            .map_err(IndexError::Unavailable)?;
        let count = self.build(chunks, source_checksum).await?;
        Ok(self.handle(IndexStatus::Built { chunks: count }))
    }

    /// `build_or_load` for a document on disk.
    pub async fn build_or_load_file(
        &self,
        ingestor: &DocumentIngestor,
        path: &Path,
    ) -> Result<IndexHandle, IndexError> {
        let checksum = source_checksum(path);
        self.build_or_load(checksum, || ingestor.ingest(path)).await
    }

    /// `rebuild` for a document on disk.
    pub async fn rebuild_file(
        &self,
        ingestor: &DocumentIngestor,
        path: &Path,
    ) -> Result<IndexHandle, IndexError> {
        let checksum = source_checksum(path);
        self.rebuild(checksum, || ingestor.ingest(path)).await
    }

    /// Embed `text` with the index's embedder and return up to `top_k`
    /// chunks, most similar first.
    pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<SearchResult>, IndexError> {
        let vector = self.embedder.embed_query(text).await?;
        let results = self
            .store
            .search(vector, top_k as u64, self.min_score)
            .await?;
        Ok(results)
    }

    async fn build(
        &self,
        chunks: Vec<DocumentChunk>,
        source_checksum: Option<String>,
    ) -> Result<usize, IndexError> {
        let meta = CollectionMeta {
            dimension: self.embedder.dimension() as u64,
            embedding_model: self.embedder.model_id().to_string(),
            source_checksum,
        };
        self.store.create_collection(&meta).await?;

        match self.store_chunks(chunks, &meta).await {
            Ok(stored) => {
                self.store.mark_complete().await?;
                tracing::info!(collection = self.collection(), stored, "index built");
                Ok(stored)
            }
            Err(e) => {
                self.progress.abandon();
                if let Err(cleanup) = self.store.delete_collection().await {
                    tracing::warn!(
                        collection = self.collection(),
                        error = %cleanup,
                        "failed to drop partially built index"
                    );
                }
                Err(e)
            }
        }
    }

    async fn store_chunks(
        &self,
        chunks: Vec<DocumentChunk>,
        meta: &CollectionMeta,
    ) -> Result<usize, IndexError> {
        tracing::info!(
            collection = self.collection(),
            chunks = chunks.len(),
            batch_size = self.batch_size,
            model = %meta.embedding_model,
            "building index"
        );

        self.progress.set_length(chunks.len() as u64);
        let mut stored = 0;
        let mut remaining = chunks;
        while !remaining.is_empty() {
            let rest = remaining.split_off(remaining.len().min(self.batch_size));
            let batch = std::mem::replace(&mut remaining, rest);
            let n = process_batch(
                self.embedder.as_ref(),
                self.store.as_ref(),
                batch,
                &self.retry,
            )
            .await?;
            stored += n;
            self.progress.inc(n as u64);
            tracing::debug!(stored, "stored batch");
        }
        self.progress.finish_and_clear();
        Ok(stored)
    }

    fn verify_compatible(&self, info: &CollectionInfo) -> Result<(), IndexError> {
        if let Some(stored) = &info.embedding_model
            && stored != self.embedder.model_id()
        {
            return Err(IndexError::ModelMismatch {
                collection: self.collection().to_string(),
                stored: stored.clone(),
                configured: self.embedder.model_id().to_string(),
            });
        }
        if let Some(stored) = info.dimension
            && stored != self.embedder.dimension() as u64
        {
            return Err(IndexError::DimensionMismatch {
                collection: self.collection().to_string(),
                stored,
                configured: self.embedder.dimension() as u64,
            });
        }
        Ok(())
    }

    fn handle(&self, status: IndexStatus) -> IndexHandle {
        IndexHandle {
            collection: self.collection().to_string(),
            embedding_model: self.embedder.model_id().to_string(),
            status,
        }
    }
}

/// Checksum of the source file; None when it can't be read, which only
/// matters if a build turns out to be needed.
fn source_checksum(path: &Path) -> Option<String> {
    match calculate_file_checksum(path) {
        Ok(checksum) => Some(checksum),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "cannot checksum source document");
            None
        }
    }
}

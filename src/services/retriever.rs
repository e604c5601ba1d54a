use std::sync::Arc;

use crate::error::IndexError;
use crate::models::RetrievedContext;
use crate::services::index::EmbeddingIndex;

/// Top-k retrieval against a shared, already-built index.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<EmbeddingIndex>,
    top_k: usize,
}

impl Retriever {
    pub fn new(index: Arc<EmbeddingIndex>, top_k: usize) -> Self {
        Self {
            index,
            top_k: top_k.max(1),
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn index(&self) -> &Arc<EmbeddingIndex> {
        &self.index
    }

    pub async fn retrieve(&self, query: &str) -> Result<RetrievedContext, IndexError> {
        let results = self.index.query(query, self.top_k).await?;
        tracing::debug!(
            top_k = self.top_k,
            hits = results.len(),
            best = results.first().map(|r| r.score),
            "retrieved context"
        );
        Ok(RetrievedContext::new(query, results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentChunk;
    use crate::services::testing::HashEmbedder;
    use crate::services::vector_store::SqliteBackend;

    fn chunk(index: u32, content: &str) -> DocumentChunk {
        DocumentChunk {
            id: format!("c{}", index),
            document_id: "doc".to_string(),
            content: content.to_string(),
            chunk_index: index,
            total_chunks: 4,
            start_offset: 0,
            end_offset: 0,
            dense_vector: Vec::new(),
            checksum: "x".to_string(),
        }
    }

    async fn retriever(top_k: usize) -> Retriever {
        let index = EmbeddingIndex::new(
            Arc::new(HashEmbedder::new(128)),
            Box::new(SqliteBackend::open_in_memory("bio").unwrap()),
            2,
        );
        let chunks = vec![
            chunk(0, "The heart pumps blood around the body"),
            chunk(1, "Plants make food by photosynthesis in leaves"),
            chunk(2, "The kidneys filter blood and make urine"),
            chunk(3, "Bones support the body and protect organs"),
        ];
        index.build_or_load(None, || Ok(chunks)).await.unwrap();
        Retriever::new(Arc::new(index), top_k)
    }

    #[tokio::test]
    async fn test_retrieve_returns_at_most_top_k() {
        let retriever = retriever(3).await;
        let ctx = retriever.retrieve("What pumps blood?").await.unwrap();
        assert_eq!(ctx.len(), 3);
        assert_eq!(ctx.query, "What pumps blood?");
        assert!(ctx.results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_most_relevant_chunk_first() {
        let retriever = retriever(1).await;
        let ctx = retriever
            .retrieve("how do plants make food photosynthesis")
            .await
            .unwrap();
        assert_eq!(ctx.results[0].chunk_id, "c1");
    }

    #[test]
    fn test_top_k_floor() {
        let index = EmbeddingIndex::new(
            Arc::new(HashEmbedder::new(8)),
            Box::new(SqliteBackend::open_in_memory("bio").unwrap()),
            2,
        );
        assert_eq!(Retriever::new(Arc::new(index), 0).top_k(), 1);
    }
}

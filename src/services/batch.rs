use crate::error::{EmbeddingError, IndexError};
use crate::models::DocumentChunk;
use crate::services::embedding::Embedder;
use crate::services::vector_store::VectorStore;
use crate::utils::{RetryConfig, with_retry};

/// Embed one batch of chunks and write them to the store.
///
/// Both calls are retried on transient failures; returns the number of
/// chunks stored.
pub async fn process_batch(
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    mut chunks: Vec<DocumentChunk>,
    retry: &RetryConfig,
) -> Result<usize, IndexError> {
    if chunks.is_empty() {
        return Ok(0);
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let embeddings = with_retry(retry, "embed batch", || {
        embedder.embed_documents(texts.clone())
    })
    .await?;

    if embeddings.len() != chunks.len() {
        return Err(EmbeddingError::InvalidResponse(format!(
            "expected {} embeddings, got {}",
            chunks.len(),
            embeddings.len()
        ))
        .into());
    }

    for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
        chunk.dense_vector = embedding;
    }

    let count = chunks.len();
    with_retry(retry, "store batch", || store.upsert_points(chunks.clone())).await?;

    Ok(count)
}

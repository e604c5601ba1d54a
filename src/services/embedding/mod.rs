//! Embedding backends behind a single trait.
//!
//! The same [`Embedder`] instance must serve both index building and query
//! embedding; vectors from different models are not comparable.

mod http;
mod onnx;

pub use http::{HealthResponse, HttpEmbedder};
pub use onnx::{OnnxEmbedder, OnnxModel};

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EmbeddingError;
use crate::models::{EmbeddingConfig, EmbeddingProvider};

/// Instruction BGE English models expect in front of retrieval queries.
pub const BGE_QUERY_INSTRUCTION: &str =
    "Represent this sentence for searching relevant passages: ";

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed passages for storage in the index.
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a retrieval query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    async fn health_check(&self) -> Result<bool, EmbeddingError>;

    fn dimension(&self) -> usize;

    /// Identifier of the model producing the vectors.
    fn model_id(&self) -> &str;
}

/// Prefix a query with the model's retrieval instruction, if it has one.
pub fn query_text(model_id: &str, text: &str) -> String {
    if model_id.to_lowercase().contains("bge") && model_id.contains("-en") {
        format!("{}{}", BGE_QUERY_INSTRUCTION, text)
    } else {
        text.to_string()
    }
}

pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match config.provider {
        EmbeddingProvider::Http => Ok(Arc::new(HttpEmbedder::new(config)?)),
        EmbeddingProvider::Onnx => {
            let model_dir = config.model_path.clone().ok_or_else(|| {
                EmbeddingError::ModelError(
                    "embedding.model_path must point at an ONNX model directory".to_string(),
                )
            })?;
            Ok(Arc::new(OnnxEmbedder::load(config, &model_dir)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_text_prefix_for_bge() {
        let q = query_text("BAAI/bge-small-en-v1.5", "What pumps blood?");
        assert_eq!(
            q,
            "Represent this sentence for searching relevant passages: What pumps blood?"
        );
        assert_eq!(query_text("nomic-embed-text", "hi"), "hi");
    }

    #[test]
    fn test_onnx_requires_model_path() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::Onnx,
            ..Default::default()
        };
        assert!(matches!(
            create_embedder(&config),
            Err(EmbeddingError::ModelError(_))
        ));
    }

    #[test]
    fn test_http_embedder_from_defaults() {
        let embedder = create_embedder(&EmbeddingConfig::default()).unwrap();
        assert_eq!(embedder.model_id(), crate::models::DEFAULT_EMBEDDING_MODEL);
        assert_eq!(embedder.dimension(), 384);
    }
}

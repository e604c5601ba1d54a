mod config;
mod document;
mod mcq;
mod search;

pub use config::{
    Config, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_EMBEDDING_URL, DEFAULT_ORACLE_MODEL, DEFAULT_QDRANT_URL, DEFAULT_SERVICE_URL,
    EmbeddingConfig, EmbeddingProvider, FrontendConfig, IndexingConfig, OracleConfig,
    OutputConfig, ResolvedConfig, RetrievalConfig, ServerConfig, VectorDriver, VectorStoreConfig,
};
pub use document::{Document, DocumentChunk, DocumentMetadata};
pub use mcq::{McqAnswer, McqUnit, OPTION_LABELS};
pub use search::{OutputFormat, RetrievedContext, SearchResult};

//! Error types for the textbook QA pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors raised while loading and chunking the source document.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("source document not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read source document: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("failed to parse source document: {0}")]
    ParseError(String),

    #[error("source document contains no text: {}", .0.display())]
    EmptyDocument(PathBuf),
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding server: {0}")]
    ConnectionError(String),

    #[error("embedding server error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding model error: {0}")]
    ModelError(String),

    #[error("embedding timeout")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            // 5xx and rate limiting can clear up on their own
            EmbeddingError::ServerError(msg) => {
                msg.contains("503")
                    || msg.contains("502")
                    || msg.contains("504")
                    || msg.contains("429")
                    || msg.to_lowercase().contains("unavailable")
                    || msg.to_lowercase().contains("too many requests")
            }
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            EmbeddingError::InvalidResponse(_) | EmbeddingError::ModelError(_) => false,
        }
    }
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to open vector store: {0}")]
    ConnectionError(String),

    #[error("collection error: {0}")]
    CollectionError(String),

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("search error: {0}")]
    SearchError(String),

    #[error("delete error: {0}")]
    DeleteError(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Retryable for VectorStoreError {
    fn is_retryable(&self) -> bool {
        match self {
            VectorStoreError::ConnectionError(_) => true,
            VectorStoreError::CollectionError(msg)
            | VectorStoreError::UpsertError(msg)
            | VectorStoreError::SearchError(msg)
            | VectorStoreError::DeleteError(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("timeout")
                    || msg_lower.contains("connection")
                    || msg_lower.contains("unavailable")
                    || msg_lower.contains("too many")
            }
            VectorStoreError::Sqlite(e) => matches!(
                e.sqlite_error_code(),
                Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
            ),
        }
    }
}

/// Errors related to building and querying the embedding index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index store unavailable: {0}")]
    Unavailable(VectorStoreError),

    #[error("ingestion error: {0}")]
    Ingestion(#[from] IngestionError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    Store(#[from] VectorStoreError),

    #[error(
        "collection '{collection}' was built with embedding model '{stored}', \
         but '{configured}' is configured"
    )]
    ModelMismatch {
        collection: String,
        stored: String,
        configured: String,
    },

    #[error(
        "collection '{collection}' holds {stored}-dimensional vectors, \
         but the embedder produces {configured}"
    )]
    DimensionMismatch {
        collection: String,
        stored: u64,
        configured: u64,
    },
}

/// Errors returned by the answer oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("failed to reach language model: {0}")]
    ConnectionError(String),

    #[error("language model request timed out")]
    Timeout,

    #[error("language model error: {0}")]
    ServerError(String),

    #[error("invalid language model response: {0}")]
    InvalidResponse(String),

    #[error("no API key configured for the language model")]
    MissingApiKey,
}

/// Errors raised while parsing user-supplied MCQ text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum McqFormatError {
    /// Input matched neither the multi-line nor the single-line layout.
    #[error("input is not a multiple-choice question with four options")]
    Invalid,

    /// A batch block had fewer than four option lines after its question.
    #[error("MCQ block has {found} option lines, expected 4")]
    Malformed { found: usize },

    #[error("MCQ input is empty")]
    Empty,
}

/// Per-request failures of the answering pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] IndexError),

    #[error("oracle failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("invalid question: {0}")]
    Format(#[from] McqFormatError),
}

pub const APOLOGY_MESSAGE: &str = "Sorry, I couldn't answer that question right now.";
pub const INVALID_MCQ_MESSAGE: &str =
    "Please send a multiple-choice question with four options (A, B, C, D).";

impl PipelineError {
    /// Fixed message safe to show to an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::Retrieval(_) | PipelineError::Oracle(_) => APOLOGY_MESSAGE,
            PipelineError::Format(_) => INVALID_MCQ_MESSAGE,
        }
    }
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors raised by the HTTP client used by the conversational front end.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to quiz service failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("quiz service responded with status {0}")]
    Status(u16),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("server error: {0}")]
    Server(String),
}

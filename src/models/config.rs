use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::search::OutputFormat;
use crate::error::ConfigError;

pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:11411";
pub const DEFAULT_EMBEDDING_MODEL: &str = "BAAI/bge-small-en-v1.5";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 384;
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "Biology_S3_SB";
pub const DEFAULT_STORE_DIR: &str = "./index_store";
pub const DEFAULT_SOURCE_PATH: &str = "./books/Biology_S3_SB_compressed.pdf";
pub const DEFAULT_ORACLE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ORACLE_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8001";
pub const PROJECT_CONFIG_FILE: &str = "tqa.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub frontend: FrontendConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// A loaded configuration and the file it came from, if any.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: Config,
    pub path: Option<PathBuf>,
}

impl Config {
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("textbook-qa").join("config.toml"))
    }

    pub fn project_path() -> PathBuf {
        PathBuf::from(PROJECT_CONFIG_FILE)
    }

    /// Pick the first existing config file: explicit path, project file, global file.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let project = Self::project_path();
        if project.exists() {
            return Some(project);
        }
        Self::global_path().filter(|p| p.exists())
    }

    pub fn load(explicit: Option<&Path>) -> Result<ResolvedConfig, ConfigError> {
        // A missing .env is the common case
        let _ = dotenvy::dotenv();

        let path = Self::locate(explicit);
        let mut config = match path {
            Some(ref p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(ResolvedConfig { config, path })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn apply_env(&mut self) {
        if self.oracle.api_key.is_none()
            && let Ok(key) = std::env::var("OPENAI_API_KEY")
            && !key.is_empty()
        {
            self.oracle.api_key = Some(key);
        }
        if let Ok(path) = std::env::var("TQA_SOURCE_PATH") {
            self.indexing.source_path = PathBuf::from(path);
        }
        if let Ok(collection) = std::env::var("TQA_COLLECTION") {
            self.vector_store.collection = collection;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.indexing.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "indexing.chunk_size must be at least 1".to_string(),
            ));
        }
        if self.indexing.chunk_overlap >= self.indexing.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "indexing.chunk_overlap ({}) must be smaller than indexing.chunk_size ({})",
                self.indexing.chunk_overlap, self.indexing.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.batch_size must be at least 1".to_string(),
            ));
        }
        if self.vector_store.collection.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "vector_store.collection must not be empty".to_string(),
            ));
        }
        if self.oracle.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "oracle.max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Which embedding backend produces vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Remote text-embeddings-inference style server
    #[default]
    Http,
    /// In-process ONNX Runtime model
    Onnx,
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProvider::Http => write!(f, "http"),
            EmbeddingProvider::Onnx => write!(f, "onnx"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,

    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_embedding_model")]
    pub model_id: String,

    /// Directory holding `model.onnx` and `tokenizer.json` for the onnx provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,

    #[serde(default = "default_dimension")]
    pub dimension: u32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

fn default_embedding_url() -> String {
    DEFAULT_EMBEDDING_URL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_max_tokens() -> u32 {
    512
}

fn default_embedding_timeout() -> u64 {
    120
}

fn default_batch_size() -> u32 {
    80
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            url: default_embedding_url(),
            model_id: default_embedding_model(),
            model_path: None,
            dimension: default_dimension(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_embedding_timeout(),
            batch_size: default_batch_size(),
        }
    }
}

/// Which vector store persists the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorDriver {
    /// SQLite database rooted at `vector_store.path`
    #[default]
    Sqlite,
    Qdrant,
}

impl std::fmt::Display for VectorDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorDriver::Sqlite => write!(f, "sqlite"),
            VectorDriver::Qdrant => write!(f, "qdrant"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub driver: VectorDriver,

    /// Root directory of the sqlite store.
    #[serde(default = "default_store_dir")]
    pub path: PathBuf,

    #[serde(default = "default_qdrant_url")]
    pub url: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_store_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_DIR)
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            driver: VectorDriver::default(),
            path: default_store_dir(),
            url: default_qdrant_url(),
            collection: default_collection(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    #[serde(default = "default_source_path")]
    pub source_path: PathBuf,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Target chunk size in tokens.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Overlap between neighbouring chunks in tokens.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,
}

fn default_source_path() -> PathBuf {
    PathBuf::from(DEFAULT_SOURCE_PATH)
}

fn default_max_file_size() -> u64 {
    200 * 1024 * 1024
}

fn default_chunk_size() -> u32 {
    512
}

fn default_chunk_overlap() -> u32 {
    20
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            source_path: default_source_path(),
            max_file_size: default_max_file_size(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,
}

fn default_top_k() -> u32 {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_oracle_url")]
    pub url: String,

    #[serde(default = "default_oracle_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_num_output")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_oracle_url() -> String {
    DEFAULT_ORACLE_URL.to_string()
}

fn default_oracle_model() -> String {
    DEFAULT_ORACLE_MODEL.to_string()
}

fn default_oracle_timeout() -> u64 {
    30
}

fn default_num_output() -> u32 {
    512
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            url: default_oracle_url(),
            model: default_oracle_model(),
            api_key: None,
            timeout_secs: default_oracle_timeout(),
            max_tokens: default_num_output(),
            temperature: 0.0,
            max_concurrency: default_max_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Base URL of the quiz service as seen by the conversational front end.
    #[serde(default = "default_service_url")]
    pub service_url: String,

    #[serde(default = "default_frontend_timeout")]
    pub timeout_secs: u64,
}

fn default_service_url() -> String {
    DEFAULT_SERVICE_URL.to_string()
}

fn default_frontend_timeout() -> u64 {
    10
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            timeout_secs: default_frontend_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub default_format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.embedding.url, DEFAULT_EMBEDDING_URL);
        assert_eq!(config.vector_store.collection, DEFAULT_COLLECTION);
        assert_eq!(config.vector_store.driver, VectorDriver::Sqlite);
        assert_eq!(config.retrieval.top_k, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [indexing]
            chunk_size = 90
            chunk_overlap = 15

            [vector_store]
            driver = "qdrant"
            "#,
        )
        .unwrap();
        assert_eq!(config.indexing.chunk_size, 90);
        assert_eq!(config.indexing.chunk_overlap, 15);
        assert_eq!(config.vector_store.driver, VectorDriver::Qdrant);
        assert_eq!(config.embedding.batch_size, 80);
        assert_eq!(config.oracle.model, DEFAULT_ORACLE_MODEL);
    }

    #[test]
    fn test_validate_rejects_overlap_not_smaller_than_chunk() {
        let mut config = Config::default();
        config.indexing.chunk_size = 20;
        config.indexing.chunk_overlap = 20;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = Config::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tqa.toml");

        let mut config = Config::default();
        config.retrieval.top_k = 5;
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.retrieval.top_k, 5);
        assert_eq!(loaded.vector_store.collection, DEFAULT_COLLECTION);
    }

    #[test]
    fn test_locate_prefers_explicit_path() {
        let explicit = PathBuf::from("/tmp/some-config.toml");
        assert_eq!(Config::locate(Some(&explicit)), Some(explicit));
    }

    #[test]
    fn test_server_address() {
        let config = ServerConfig::default();
        assert_eq!(config.address(), "127.0.0.1:8001");
    }
}

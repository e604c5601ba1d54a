use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A source document loaded for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub path: PathBuf,
    pub checksum: String,
    pub metadata: DocumentMetadata,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub filename: Option<String>,
    pub extension: Option<String>,
    pub size_bytes: u64,
}

/// A contiguous span of document text used as a retrieval unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub chunk_index: u32,
    pub total_chunks: u32,
    pub start_offset: u64,
    pub end_offset: u64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub dense_vector: Vec<f32>,
    pub checksum: String,
}

impl Document {
    /// Documents are addressed by their content checksum, so two copies of
    /// the same book at different paths share chunk ids.
    pub fn generate_id(checksum: &str) -> String {
        checksum.chars().take(32).collect()
    }

    pub fn new(content: String, path: &Path, checksum: String, metadata: DocumentMetadata) -> Self {
        Self {
            id: Self::generate_id(&checksum),
            content,
            path: path.to_path_buf(),
            checksum,
            metadata,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl DocumentChunk {
    pub fn generate_id(document_id: &str, chunk_index: u32) -> String {
        use uuid::Uuid;
        let name = format!("{}:{}", document_id, chunk_index);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    pub fn from_document(
        document: &Document,
        content: String,
        chunk_index: u32,
        total_chunks: u32,
        start_offset: u64,
        end_offset: u64,
    ) -> Self {
        Self {
            id: Self::generate_id(&document.id, chunk_index),
            document_id: document.id.clone(),
            content,
            chunk_index,
            total_chunks,
            start_offset,
            end_offset,
            dense_vector: Vec::new(),
            checksum: document.checksum.clone(),
        }
    }
}

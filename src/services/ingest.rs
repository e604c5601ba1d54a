//! Loading the source document and turning it into chunks.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

use crate::error::IngestionError;
use crate::models::{Document, DocumentChunk, DocumentMetadata, IndexingConfig};
use crate::services::chunker::TextChunker;
use crate::utils::{DocumentKind, calculate_checksum, detect_kind, normalize_whitespace, read_file_bytes};

/// Reads one source document and splits it with a [`TextChunker`].
#[derive(Debug, Clone)]
pub struct DocumentIngestor {
    chunker: TextChunker,
    max_file_size: u64,
}

impl DocumentIngestor {
    pub fn new(config: &IndexingConfig) -> Self {
        Self {
            chunker: TextChunker::new(config),
            max_file_size: config.max_file_size,
        }
    }

    pub fn load(&self, path: &Path) -> Result<Document, IngestionError> {
        if !path.exists() {
            return Err(IngestionError::NotFound(path.to_path_buf()));
        }

        let bytes = read_file_bytes(path, self.max_file_size)?;
        let checksum = calculate_checksum(&bytes);

        let text = match detect_kind(path, &bytes) {
            DocumentKind::Pdf => extract_pdf_text(&bytes)?,
            DocumentKind::Text => String::from_utf8(bytes.clone()).map_err(|e| {
                IngestionError::ParseError(format!("document is not valid UTF-8: {}", e))
            })?,
            DocumentKind::Binary => {
                return Err(IngestionError::ParseError(format!(
                    "unsupported binary document: {}",
                    path.display()
                )));
            }
        };

        let content = normalize_whitespace(&text);
        if content.is_empty() {
            return Err(IngestionError::EmptyDocument(path.to_path_buf()));
        }

        let metadata = DocumentMetadata {
            filename: path.file_name().map(|n| n.to_string_lossy().to_string()),
            extension: path.extension().map(|e| e.to_string_lossy().to_lowercase()),
            size_bytes: bytes.len() as u64,
        };

        Ok(Document::new(content, path, checksum, metadata))
    }

    /// Load `path` and split it into chunks.
    pub fn ingest(&self, path: &Path) -> Result<Vec<DocumentChunk>, IngestionError> {
        let document = self.load(path)?;
        let chunks = self.chunker.chunk(&document);
        if chunks.is_empty() {
            return Err(IngestionError::EmptyDocument(path.to_path_buf()));
        }

        tracing::info!(
            path = %path.display(),
            chars = document.content.chars().count(),
            chunks = chunks.len(),
            "document chunked"
        );
        Ok(chunks)
    }
}

/// pdf-extract panics on some malformed files, so the call is isolated.
fn extract_pdf_text(bytes: &[u8]) -> Result<String, IngestionError> {
    match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(IngestionError::ParseError(format!(
            "PDF extraction failed: {}",
            e
        ))),
        Err(_) => Err(IngestionError::ParseError(
            "PDF extraction aborted on a malformed file".to_string(),
        )),
    }
}

//! File utilities for ingestion.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::Path;

/// Calculate SHA-256 checksum of bytes.
pub fn calculate_checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Calculate SHA-256 checksum of a file's raw bytes.
pub fn calculate_file_checksum(path: &Path) -> std::io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Read a whole file, refusing anything larger than `max_size`.
pub fn read_file_bytes(path: &Path, max_size: u64) -> std::io::Result<Vec<u8>> {
    let metadata = fs::metadata(path)?;

    if metadata.len() > max_size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "file exceeds maximum size: {} > {}",
                metadata.len(),
                max_size
            ),
        ));
    }

    fs::read(path)
}

/// Kind of source document, decided by extension and content sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
    Binary,
}

pub fn detect_kind(path: &Path, head: &[u8]) -> DocumentKind {
    if head.starts_with(b"%PDF-") {
        return DocumentKind::Pdf;
    }
    if let Some(ext) = path.extension() {
        let ext = ext.to_string_lossy().to_lowercase();
        if ext == "pdf" {
            return DocumentKind::Pdf;
        }
        if is_text_extension(&ext) {
            return DocumentKind::Text;
        }
    }
    // Null bytes in the first block mark a binary file
    let head_sample = &head[..head.len().min(512)];
    if head_sample.contains(&0) {
        DocumentKind::Binary
    } else {
        DocumentKind::Text
    }
}

fn is_text_extension(ext: &str) -> bool {
    matches!(
        ext,
        "txt" | "text" | "md" | "markdown" | "rst" | "adoc" | "org" | "html" | "htm" | "xml"
            | "json" | "csv"
    )
}

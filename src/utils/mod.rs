//! Utility modules.

pub mod file;
pub mod retry;
pub mod text;

pub use file::{DocumentKind, calculate_checksum, calculate_file_checksum, detect_kind, read_file_bytes};
pub use retry::{RetryConfig, Retryable, with_retry};
pub use text::{has_meaningful_content, normalize_whitespace};

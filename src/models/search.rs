//! Retrieval results and output format.

use serde::{Deserialize, Serialize};

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// A chunk returned by a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Matching chunk ID
    pub chunk_id: String,

    /// Cosine similarity (higher is closer)
    pub score: f32,

    /// Chunk content
    pub content: String,

    pub chunk_index: u32,

    /// Character offsets into the source document
    pub start_offset: u64,
    pub end_offset: u64,
}

/// Chunks retrieved for one query, most similar first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub query: String,
    pub results: Vec<SearchResult>,
}

impl RetrievedContext {
    pub fn new(query: impl Into<String>, results: Vec<SearchResult>) -> Self {
        Self {
            query: query.into(),
            results,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Chunk texts joined with blank lines, in rank order.
    pub fn text(&self) -> String {
        self.results
            .iter()
            .map(|r| r.content.trim())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(content: &str, score: f32) -> SearchResult {
        SearchResult {
            chunk_id: content.to_string(),
            score,
            content: content.to_string(),
            chunk_index: 0,
            start_offset: 0,
            end_offset: content.len() as u64,
        }
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_context_text_keeps_rank_order() {
        let ctx = RetrievedContext::new(
            "heart",
            vec![result(" first \n", 0.9), result("second", 0.5)],
        );
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.text(), "first\n\nsecond");
    }

    #[test]
    fn test_empty_context() {
        let ctx = RetrievedContext::default();
        assert!(ctx.is_empty());
        assert_eq!(ctx.text(), "");
    }
}

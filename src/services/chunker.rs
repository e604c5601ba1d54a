//! Fixed-size overlapping chunking of the source document.

use crate::models::{Document, DocumentChunk, IndexingConfig};
use crate::utils::has_meaningful_content;

/// Approximate characters per token for English prose.
pub const CHARS_PER_TOKEN: usize = 4;

/// Splits a document into overlapping chunks of a target token size.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap size in characters
    overlap: usize,
}

impl TextChunker {
    pub fn new(config: &IndexingConfig) -> Self {
        Self::from_tokens(config.chunk_size as usize, config.chunk_overlap as usize)
    }

    pub fn from_tokens(chunk_tokens: usize, overlap_tokens: usize) -> Self {
        Self {
            chunk_size: (chunk_tokens * CHARS_PER_TOKEN).max(1),
            overlap: overlap_tokens * CHARS_PER_TOKEN,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&IndexingConfig::default())
    }

    pub fn chunk(&self, document: &Document) -> Vec<DocumentChunk> {
        let content = &document.content;

        if content.trim().is_empty() {
            return Vec::new();
        }

        let char_count = content.chars().count();
        if char_count <= self.chunk_size {
            return vec![DocumentChunk::from_document(
                document,
                content.clone(),
                0,
                1,
                0,
                char_count as u64,
            )];
        }

        let spans: Vec<_> = self
            .split_with_overlap(content)
            .into_iter()
            .filter(|(text, _, _)| has_meaningful_content(text))
            .collect();

        let total_chunks = spans.len() as u32;

        spans
            .into_iter()
            .enumerate()
            .map(|(idx, (text, start, end))| {
                DocumentChunk::from_document(document, text, idx as u32, total_chunks, start, end)
            })
            .collect()
    }

    /// Split content into overlapping spans of (text, start, end) in char offsets.
    fn split_with_overlap(&self, content: &str) -> Vec<(String, u64, u64)> {
        let chars: Vec<char> = content.chars().collect();
        let total_chars = chars.len();
        let mut spans = Vec::new();

        let mut start = 0;
        while start < total_chars {
            let target_end = (start + self.chunk_size).min(total_chars);
            let end = self.find_break_point(&chars, start, target_end);

            let text: String = chars[start..end].iter().collect();
            spans.push((text, start as u64, end as u64));

            if end >= total_chars {
                break;
            }

            // Next chunk begins `overlap` chars before this one ended, but
            // always moves forward.
            let next = end.saturating_sub(self.overlap);
            start = if next > start { next } else { end };
        }

        spans
    }

    /// Find a natural break point in the last fifth of the window.
    fn find_break_point(&self, chars: &[char], start: usize, target_end: usize) -> usize {
        if target_end >= chars.len() {
            return chars.len();
        }

        let search_start = target_end
            .saturating_sub(self.chunk_size / 5)
            .max(start + 1);
        if search_start >= target_end {
            return target_end;
        }
        let window = &chars[search_start..target_end];

        // Priority: paragraph > newline > sentence end > space
        let mut paragraph = None;
        let mut newline = None;
        let mut sentence = None;
        let mut space = None;

        for (i, c) in window.iter().enumerate() {
            let pos = search_start + i;
            match c {
                '\n' => {
                    if i > 0 && window[i - 1] == '\n' {
                        paragraph = Some(pos + 1);
                    }
                    newline = Some(pos + 1);
                }
                '.' | '!' | '?' => {
                    if window.get(i + 1).is_some_and(|c| c.is_whitespace()) {
                        sentence = Some(pos + 1);
                    }
                }
                ' ' | '\t' => space = Some(pos + 1),
                _ => {}
            }
        }

        paragraph
            .or(newline)
            .or(sentence)
            .or(space)
            .unwrap_or(target_end)
    }
}

/// Estimate the number of tokens in a text.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMetadata;
    use std::path::Path;

    fn create_test_document(content: &str) -> Document {
        Document::new(
            content.to_string(),
            Path::new("/test.txt"),
            "0".repeat(64),
            DocumentMetadata::default(),
        )
    }

    fn sentences(n: usize) -> String {
        (0..n)
            .map(|i| format!("Sentence number {i} describes how the heart pumps blood."))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_small_document_single_chunk() {
        let chunker = TextChunker::with_defaults();
        let doc = create_test_document("The heart is a muscular organ.");
        let chunks = chunker.chunk(&doc);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "The heart is a muscular organ.");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].total_chunks, 1);
    }

    #[test]
    fn test_empty_document() {
        let chunker = TextChunker::with_defaults();
        assert!(chunker.chunk(&create_test_document("")).is_empty());
        assert!(chunker.chunk(&create_test_document("  \n\t ")).is_empty());
    }

    #[test]
    fn test_chunks_overlap_and_cover_document() {
        // 90 tokens with 15 overlap, as in the MCQ deployment
        let chunker = TextChunker::from_tokens(90, 15);
        let content = sentences(60);
        let doc = create_test_document(&content);
        let chunks = chunker.chunk(&doc);

        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(
            chunks.last().unwrap().end_offset,
            content.chars().count() as u64
        );
        for pair in chunks.windows(2) {
            assert!(pair[1].start_offset < pair[0].end_offset, "chunks must overlap");
            assert!(pair[1].start_offset > pair[0].start_offset, "chunks must advance");
        }
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as u32);
            assert_eq!(chunk.total_chunks, chunks.len() as u32);
            assert!(chunk.content.chars().count() <= 90 * CHARS_PER_TOKEN);
        }
    }

    #[test]
    fn test_prefers_sentence_boundaries() {
        let chunker = TextChunker::from_tokens(50, 5);
        let doc = create_test_document(&sentences(20));
        let chunks = chunker.chunk(&doc);

        assert!(chunks.len() > 1);
        assert!(chunks[0].content.trim_end().ends_with('.'));
    }

    #[test]
    fn test_unbroken_text_still_advances() {
        let chunker = TextChunker::from_tokens(10, 2);
        let doc = create_test_document(&"a".repeat(500));
        let chunks = chunker.chunk(&doc);

        assert!(chunks.len() > 1);
        assert_eq!(chunks.last().unwrap().end_offset, 500);
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens("1234"), 1);
        assert_eq!(estimate_tokens("12345678"), 2);
        assert_eq!(estimate_tokens(""), 0);
    }
}

//! Parsing user-supplied MCQ text into [`McqUnit`]s.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::McqFormatError;
use crate::models::{McqUnit, OPTION_LABELS};

static RE_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());
static RE_NUMBERED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)\.\s*(.*)$").unwrap());
static RE_SINGLE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)^\s*(.+?)\s+A[.)]\s*(.+?)\s+B[.)]\s*(.+?)\s+C[.)]\s*(.+?)\s+D[.)]\s*(.+?)\s*$",
    )
    .unwrap()
});

/// Split a batch of MCQs on blank lines. Blocks keep their order.
pub fn split_batch(text: &str) -> Vec<String> {
    RE_BLANK_LINES
        .split(text.trim())
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse one batch block: question line (optionally numbered "N. ") followed
/// by exactly the next four lines as options.
pub fn parse_mcq_block(block: &str) -> Result<McqUnit, McqFormatError> {
    let lines = non_empty_lines(block);
    let Some((first, rest)) = lines.split_first() else {
        return Err(McqFormatError::Empty);
    };
    if rest.len() < OPTION_LABELS.len() {
        return Err(McqFormatError::Malformed { found: rest.len() });
    }

    let (number, question) = split_number(first);
    let options = rest[..OPTION_LABELS.len()].join("\n");
    Ok(McqUnit::new(number, question, options))
}

/// Parse a single MCQ given either as question + four option lines or as
/// one line "<question> A. <a> B. <b> C. <c> D. <d>".
pub fn parse_mcq_input(text: &str) -> Result<McqUnit, McqFormatError> {
    if text.trim().is_empty() {
        return Err(McqFormatError::Empty);
    }

    if non_empty_lines(text).len() > OPTION_LABELS.len() {
        return parse_mcq_block(text);
    }

    let flattened = non_empty_lines(text).join(" ");
    let caps = RE_SINGLE_LINE
        .captures(&flattened)
        .ok_or(McqFormatError::Invalid)?;

    let (number, question) = split_number(&caps[1]);
    let options = OPTION_LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| format!("{}. {}", label, caps[i + 2].trim()))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(McqUnit::new(number, question, options))
}

fn non_empty_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

fn split_number(line: &str) -> (String, String) {
    let line = line.trim();
    match RE_NUMBERED.captures(line) {
        Some(caps) => (caps[1].to_string(), caps[2].trim().to_string()),
        None => (String::new(), line.to_string()),
    }
}

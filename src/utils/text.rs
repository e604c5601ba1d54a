//! Text processing utilities.

/// Minimum non-whitespace characters for a chunk worth embedding.
pub const MIN_CONTENT_LENGTH: usize = 20;

/// Check if content has meaningful text (not just whitespace/punctuation).
pub fn has_meaningful_content(content: &str) -> bool {
    content.chars().filter(|c| c.is_alphanumeric()).count() >= MIN_CONTENT_LENGTH
}

/// Collapse runs of spaces and tabs, trim each line, and drop blank-line runs
/// longer than one. Extracted PDF text is full of both.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;

    for line in text.replace('\0', "").lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_run += 1;
            if blank_run == 1 && !out.is_empty() {
                out.push('\n');
            }
            continue;
        }
        blank_run = 0;
        out.push_str(&collapsed);
        out.push('\n');
    }

    out.trim_end().to_string()
}

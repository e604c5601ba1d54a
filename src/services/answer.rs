//! Turning raw oracle text into answers.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::McqAnswer;

/// The first non-space character, when it is a letter A-D. Trailing
/// punctuation is optional, so "Answer: B" reads as A.
static RE_MCQ_ANSWER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*([A-D])[.\s\-:)]*").unwrap());

/// Extract the answer letter, or keep the raw text when there is none.
pub fn parse_mcq_answer(raw: &str) -> McqAnswer {
    match RE_MCQ_ANSWER
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().chars().next())
    {
        Some(letter) => McqAnswer::Parsed(letter.to_ascii_uppercase()),
        None => McqAnswer::Unparsed(raw.to_string()),
    }
}

pub fn parse_shortqa_answer(raw: &str) -> String {
    raw.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_with_explanation() {
        assert_eq!(parse_mcq_answer("B. Pumps blood"), McqAnswer::Parsed('B'));
    }

    #[test]
    fn test_unanchored_letter_falls_back() {
        assert_eq!(
            parse_mcq_answer("The answer is B"),
            McqAnswer::Unparsed("The answer is B".to_string())
        );
    }

    #[test]
    fn test_letter_variants() {
        for raw in ["B", " b", "\nB\n", "B)", "B:", "B - pump", "b. pump blood"] {
            assert_eq!(parse_mcq_answer(raw), McqAnswer::Parsed('B'), "input {:?}", raw);
        }
    }

    #[test]
    fn test_leading_letter_wins_without_separator() {
        assert_eq!(parse_mcq_answer("BA"), McqAnswer::Parsed('B'));
        assert_eq!(
            parse_mcq_answer("Because the heart pumps"),
            McqAnswer::Parsed('B')
        );
        assert_eq!(parse_mcq_answer("Answer: B"), McqAnswer::Parsed('A'));
    }

    #[test]
    fn test_non_option_letters_fall_back() {
        assert!(!parse_mcq_answer("E").is_parsed());
        assert!(!parse_mcq_answer("").is_parsed());
        assert!(!parse_mcq_answer("  Perhaps C").is_parsed());
    }

    #[test]
    fn test_fallback_keeps_text_verbatim() {
        let raw = "  I'm not sure.\n";
        assert_eq!(parse_mcq_answer(raw), McqAnswer::Unparsed(raw.to_string()));
    }

    #[test]
    fn test_shortqa_trims() {
        assert_eq!(
            parse_shortqa_answer("\n  Arteries, veins, and capillaries. \n"),
            "Arteries, veins, and capillaries."
        );
    }
}

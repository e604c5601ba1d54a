//! Multiple-choice question units and answers.

use serde::{Deserialize, Serialize};

/// Option labels, in order.
pub const OPTION_LABELS: [char; 4] = ['A', 'B', 'C', 'D'];

/// A parsed multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McqUnit {
    /// Leading question number, empty when the input had none.
    pub number: String,
    pub question: String,
    /// Four newline-joined option lines, conventionally "A. ..." to "D. ...".
    pub options: String,
}

impl McqUnit {
    pub fn new(
        number: impl Into<String>,
        question: impl Into<String>,
        options: impl Into<String>,
    ) -> Self {
        Self {
            number: number.into(),
            question: question.into(),
            options: options.into(),
        }
    }

    /// Text used to search the index: the question followed by its options.
    pub fn retrieval_text(&self) -> String {
        format!("{}\n{}", self.question, self.options)
    }

    pub fn has_number(&self) -> bool {
        !self.number.is_empty()
    }
}

/// Outcome of parsing the oracle's reply to an MCQ prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum McqAnswer {
    /// A letter in A-D was found at the start of the reply.
    Parsed(char),
    /// No letter was found; the raw reply is kept.
    Unparsed(String),
}

impl McqAnswer {
    pub fn is_parsed(&self) -> bool {
        matches!(self, McqAnswer::Parsed(_))
    }

    pub fn letter(&self) -> Option<char> {
        match self {
            McqAnswer::Parsed(c) => Some(*c),
            McqAnswer::Unparsed(_) => None,
        }
    }
}

impl std::fmt::Display for McqAnswer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            McqAnswer::Parsed(c) => write!(f, "{}", c),
            McqAnswer::Unparsed(raw) => write!(f, "{}", raw),
        }
    }
}

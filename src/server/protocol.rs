//! JSON bodies of the quiz HTTP API. Shared by the server and the client.

use serde::{Deserialize, Serialize};

/// Answer to `/mcq` when the options field is missing or blank.
pub const MISSING_OPTIONS_MESSAGE: &str = "Error: Please provide options (A, B, C, D) for the MCQ.";
/// Answer to `/mcq` and `/short_qa` when the question is blank.
pub const MISSING_QUESTION_MESSAGE: &str = "Error: Please provide a question.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McqRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McqResponse {
    pub answer: String,
    /// True only when `answer` is a single letter A-D.
    #[serde(default)]
    pub parsed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McqBatchRequest {
    #[serde(default)]
    pub mcqs: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McqBatchResponse {
    pub answers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShortQaRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortQaResponse {
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub collection: String,
    pub version: String,
}

//! Retrieval-augmented answering: retrieve, build prompt, ask the oracle,
//! parse the reply.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;

use crate::error::{OracleError, PipelineError};
use crate::models::{McqAnswer, McqUnit};
use crate::services::answer::{parse_mcq_answer, parse_shortqa_answer};
use crate::services::mcq_parser::{parse_mcq_block, parse_mcq_input, split_batch};
use crate::services::oracle::AnswerOracle;
use crate::services::prompt::{build_mcq_prompt, build_shortqa_prompt, with_context};
use crate::services::retriever::Retriever;

/// Outcome for one block of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchAnswer {
    pub number: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchOutcome {
    Answered { answer: McqAnswer },
    Failed { message: String },
}

impl fmt::Display for BatchAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.number.is_empty() {
            write!(f, "{}. ", self.number)?;
        }
        match &self.outcome {
            BatchOutcome::Answered { answer } => write!(f, "{}", answer),
            BatchOutcome::Failed { message } => write!(f, "{}", message),
        }
    }
}

/// Shared, read-only answering pipeline. Clones share the oracle permits.
#[derive(Clone)]
pub struct QaPipeline {
    retriever: Retriever,
    oracle: Arc<dyn AnswerOracle>,
    permits: Arc<Semaphore>,
}

impl QaPipeline {
    pub fn new(retriever: Retriever, oracle: Arc<dyn AnswerOracle>, max_concurrency: usize) -> Self {
        Self {
            retriever,
            oracle,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn oracle(&self) -> &Arc<dyn AnswerOracle> {
        &self.oracle
    }

    async fn ask(&self, prompt: &str) -> Result<String, OracleError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| OracleError::ConnectionError("oracle permits closed".to_string()))?;
        self.oracle.complete(prompt).await
    }

    pub async fn answer_mcq(&self, unit: &McqUnit) -> Result<McqAnswer, PipelineError> {
        let context = self.retriever.retrieve(&unit.retrieval_text()).await?;
        let prompt = with_context(
            &context.text(),
            &build_mcq_prompt(&unit.question, &unit.options),
        );

        let raw = self.ask(&prompt).await?;
        let answer = parse_mcq_answer(&raw);
        match &answer {
            McqAnswer::Parsed(letter) => {
                tracing::info!(number = %unit.number, %letter, "answered MCQ");
            }
            McqAnswer::Unparsed(_) => {
                tracing::warn!(number = %unit.number, "oracle reply has no answer letter");
            }
        }
        Ok(answer)
    }

    /// Parse raw MCQ text (multi-line or single-line) and answer it.
    pub async fn answer_mcq_text(&self, text: &str) -> Result<McqAnswer, PipelineError> {
        let unit = parse_mcq_input(text)?;
        self.answer_mcq(&unit).await
    }

    /// Answer a question whose options arrive separately. Options that
    /// don't parse as four labelled choices are passed through as given.
    pub async fn answer_mcq_parts(
        &self,
        question: &str,
        options: &str,
    ) -> Result<McqAnswer, PipelineError> {
        let unit = parse_mcq_input(&format!("{}\n{}", question, options))
            .unwrap_or_else(|_| McqUnit::new("", question.trim(), options.trim()));
        self.answer_mcq(&unit).await
    }

    /// Answer every blank-line separated block. A block that fails yields
    /// its own message instead of failing the batch.
    pub async fn answer_batch(&self, text: &str) -> Vec<BatchAnswer> {
        let blocks = split_batch(text);
        let mut answers = Vec::with_capacity(blocks.len());

        for (i, block) in blocks.iter().enumerate() {
            let answer = match parse_mcq_block(block) {
                Ok(unit) => {
                    let outcome = match self.answer_mcq(&unit).await {
                        Ok(answer) => BatchOutcome::Answered { answer },
                        Err(e) => {
                            tracing::error!(block = i + 1, error = %e, "batch question failed");
                            BatchOutcome::Failed {
                                message: e.user_message().to_string(),
                            }
                        }
                    };
                    BatchAnswer {
                        number: unit.number,
                        outcome,
                    }
                }
                Err(e) => {
                    tracing::warn!(block = i + 1, error = %e, "malformed batch block");
                    let error = PipelineError::from(e);
                    BatchAnswer {
                        number: leading_number(block),
                        outcome: BatchOutcome::Failed {
                            message: error.user_message().to_string(),
                        },
                    }
                }
            };
            answers.push(answer);
        }

        answers
    }

    pub async fn answer_short(&self, question: &str) -> Result<String, PipelineError> {
        let context = self.retriever.retrieve(question).await?;
        let context_text = context.text();
        let prompt = build_shortqa_prompt(question, Some(&context_text));
        let raw = self.ask(&prompt).await?;
        Ok(parse_shortqa_answer(&raw))
    }
}

fn leading_number(block: &str) -> String {
    block
        .lines()
        .next()
        .and_then(|line| line.trim().split_once('.'))
        .map(|(n, _)| n.trim())
        .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{APOLOGY_MESSAGE, INVALID_MCQ_MESSAGE, McqFormatError};
    use crate::models::DocumentChunk;
    use crate::services::index::EmbeddingIndex;
    use crate::services::testing::{HashEmbedder, ScriptedOracle};
    use crate::services::vector_store::SqliteBackend;

    const PASSAGES: [&str; 4] = [
        "The heart is a muscular organ whose function is to pump blood through the body.",
        "The stomach and intestines digest food and absorb nutrients.",
        "The kidneys filter waste from the blood to make urine.",
        "Glands of the endocrine system release hormones into the blood.",
    ];

    async fn pipeline(oracle: Arc<ScriptedOracle>) -> QaPipeline {
        let index = EmbeddingIndex::new(
            Arc::new(HashEmbedder::new(128)),
            Box::new(SqliteBackend::open_in_memory("bio").unwrap()),
            2,
        );
        let chunks: Vec<DocumentChunk> = PASSAGES
            .iter()
            .enumerate()
            .map(|(i, text)| DocumentChunk {
                id: format!("p{}", i),
                document_id: "bio".to_string(),
                content: text.to_string(),
                chunk_index: i as u32,
                total_chunks: PASSAGES.len() as u32,
                start_offset: 0,
                end_offset: text.len() as u64,
                dense_vector: Vec::new(),
                checksum: "x".to_string(),
            })
            .collect();
        index.build_or_load(None, || Ok(chunks)).await.unwrap();
        QaPipeline::new(Retriever::new(Arc::new(index), 3), oracle, 2)
    }

    #[tokio::test]
    async fn test_end_to_end_heart_question() {
        let oracle = Arc::new(ScriptedOracle::always("B. pump blood"));
        let pipeline = pipeline(oracle.clone()).await;

        let answer = pipeline
            .answer_mcq_text(
                "What is the function of the heart? A. digest B. pump blood C. filter D. hormones",
            )
            .await
            .unwrap();

        let letter = answer.letter().unwrap();
        assert!(['A', 'B', 'C', 'D'].contains(&letter));
        assert_eq!(answer.to_string().len(), 1);

        let prompts = oracle.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("pump blood through the body"));
        assert!(prompts[0].contains("Question: What is the function of the heart?"));
        assert!(prompts[0].contains("Options:\nA. digest\nB. pump blood\nC. filter\nD. hormones"));
    }

    #[tokio::test]
    async fn test_unparsed_reply_is_tagged() {
        let oracle = Arc::new(ScriptedOracle::always("The answer is B"));
        let pipeline = pipeline(oracle).await;
        let answer = pipeline
            .answer_mcq(&McqUnit::new("", "Q?", "A. w\nB. x\nC. y\nD. z"))
            .await
            .unwrap();
        assert_eq!(answer, McqAnswer::Unparsed("The answer is B".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_text_never_reaches_oracle() {
        let oracle = Arc::new(ScriptedOracle::always("A"));
        let pipeline = pipeline(oracle.clone()).await;
        let err = pipeline
            .answer_mcq_text("What is the function of the heart?")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Format(McqFormatError::Invalid)));
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_answer_parts_with_multiline_options() {
        let oracle = Arc::new(ScriptedOracle::always("C"));
        let pipeline = pipeline(oracle.clone()).await;
        let answer = pipeline
            .answer_mcq_parts(
                "Which organ filters blood?",
                "A. Heart\nB. Lung\nC. Kidney\nD. Skin",
            )
            .await
            .unwrap();
        assert_eq!(answer, McqAnswer::Parsed('C'));
        assert!(oracle.prompts()[0].contains("Question: Which organ filters blood?"));
    }

    #[tokio::test]
    async fn test_batch_mixes_answers_and_errors() {
        let oracle = Arc::new(
            ScriptedOracle::default()
                .then_reply("B")
                .then_fail(OracleError::Timeout),
        );
        let pipeline = pipeline(oracle).await;

        let answers = pipeline
            .answer_batch(
                "1. What pumps blood?\nA. Liver\nB. Heart\nC. Lung\nD. Skin\n\n\
                 2. What makes urine?\nA. Kidney\nB. Heart\nC. Lung\nD. Skin\n\n\
                 3. Broken question\nA. only one option",
            )
            .await;

        let lines: Vec<String> = answers.iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            vec![
                "1. B".to_string(),
                format!("2. {}", APOLOGY_MESSAGE),
                format!("3. {}", INVALID_MCQ_MESSAGE),
            ]
        );
    }

    #[tokio::test]
    async fn test_unnumbered_batch_lines() {
        let oracle = Arc::new(ScriptedOracle::always("D"));
        let pipeline = pipeline(oracle).await;
        let answers = pipeline
            .answer_batch("Q1\nA\nB\nC\nD\n\nQ2\nA\nB\nC\nD")
            .await;
        assert_eq!(answers.len(), 2);
        assert!(answers.iter().all(|a| a.to_string() == "D"));
    }

    #[tokio::test]
    async fn test_short_answer_uses_context() {
        let oracle = Arc::new(ScriptedOracle::always("  It releases hormones.\n"));
        let pipeline = pipeline(oracle.clone()).await;
        let answer = pipeline
            .answer_short("What do endocrine glands release?")
            .await
            .unwrap();
        assert_eq!(answer, "It releases hormones.");

        let prompt = &oracle.prompts()[0];
        assert!(prompt.contains("Glands of the endocrine system release hormones"));
        assert!(prompt.ends_with("Q: What do endocrine glands release?\nA:"));
    }

    #[tokio::test]
    async fn test_oracle_failure_maps_to_apology() {
        let oracle = Arc::new(
            ScriptedOracle::default()
                .then_fail(OracleError::ServerError("status 500: boom".to_string())),
        );
        let pipeline = pipeline(oracle).await;
        let err = pipeline.answer_short("What pumps blood?").await.unwrap_err();
        assert_eq!(err.user_message(), APOLOGY_MESSAGE);
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("7. Broken\nA. x"), "7");
        assert_eq!(leading_number("Broken. question"), "");
        assert_eq!(leading_number(""), "");
    }
}

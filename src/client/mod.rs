//! HTTP client for the quiz service, used by the conversational front end.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ClientError, INVALID_MCQ_MESSAGE};
use crate::models::FrontendConfig;
use crate::server::protocol::{
    HealthResponse, McqBatchRequest, McqBatchResponse, McqRequest, McqResponse, ShortQaRequest,
    ShortQaResponse,
};
use crate::services::parse_mcq_input;

pub const MCQ_UNREACHABLE_MESSAGE: &str = "Sorry, I couldn't reach the quiz engine.";
pub const SHORT_UNREACHABLE_MESSAGE: &str = "Sorry, I couldn't reach the short-answer engine.";

#[derive(Debug, Clone)]
pub struct QuizClient {
    client: Client,
    base_url: String,
}

impl QuizClient {
    pub fn new(config: &FrontendConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.service_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }

    pub async fn post_mcq(&self, question: &str, options: &str) -> Result<McqResponse, ClientError> {
        let request = McqRequest {
            question: question.to_string(),
            options: options.to_string(),
        };
        self.post("/mcq", &request).await
    }

    pub async fn post_mcqs(&self, mcqs: &str) -> Result<McqBatchResponse, ClientError> {
        let request = McqBatchRequest {
            mcqs: mcqs.to_string(),
        };
        self.post("/mcqs", &request).await
    }

    pub async fn post_short_qa(&self, question: &str) -> Result<ShortQaResponse, ClientError> {
        let request = ShortQaRequest {
            question: question.to_string(),
        };
        self.post("/short_qa", &request).await
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }
}

/// What the user is asking for in one utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Intent {
    #[default]
    Mcq,
    Batch,
    Short,
}

/// Turns one user utterance into exactly one reply string.
pub struct FrontendResponder {
    client: QuizClient,
}

impl FrontendResponder {
    pub fn new(client: QuizClient) -> Self {
        Self { client }
    }

    pub async fn respond(&self, intent: Intent, text: &str) -> String {
        match intent {
            Intent::Mcq => self.respond_mcq(text).await,
            Intent::Batch => self.respond_batch(text).await,
            Intent::Short => self.respond_short(text).await,
        }
    }

    /// Pre-parse the utterance; only well-formed MCQs reach the service.
    pub async fn respond_mcq(&self, text: &str) -> String {
        let unit = match parse_mcq_input(text) {
            Ok(unit) => unit,
            Err(e) => {
                tracing::debug!(error = %e, "utterance is not an MCQ");
                return INVALID_MCQ_MESSAGE.to_string();
            }
        };

        match self.client.post_mcq(&unit.question, &unit.options).await {
            Ok(response) => response.answer,
            Err(e) => {
                tracing::warn!(error = %e, "mcq request to quiz service failed");
                MCQ_UNREACHABLE_MESSAGE.to_string()
            }
        }
    }

    pub async fn respond_batch(&self, text: &str) -> String {
        match self.client.post_mcqs(text).await {
            Ok(response) => response.answers.join("\n"),
            Err(e) => {
                tracing::warn!(error = %e, "batch request to quiz service failed");
                MCQ_UNREACHABLE_MESSAGE.to_string()
            }
        }
    }

    pub async fn respond_short(&self, text: &str) -> String {
        match self.client.post_short_qa(text.trim()).await {
            Ok(response) => response.answer,
            Err(e) => {
                tracing::warn!(error = %e, "short answer request to quiz service failed");
                SHORT_UNREACHABLE_MESSAGE.to_string()
            }
        }
    }
}

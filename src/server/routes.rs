//! Request handlers. Every handler answers 200 with a body; failures become
//! fixed user-facing messages and are logged.

use axum::{Json, extract::State};

use crate::server::AppState;
use crate::server::protocol::{
    HealthResponse, MISSING_OPTIONS_MESSAGE, MISSING_QUESTION_MESSAGE, McqBatchRequest,
    McqBatchResponse, McqRequest, McqResponse, ShortQaRequest, ShortQaResponse,
};

/// POST /mcq
pub async fn answer_mcq(
    State(state): State<AppState>,
    Json(request): Json<McqRequest>,
) -> Json<McqResponse> {
    let question = request.question.trim();
    let options = request.options.trim();

    if options.is_empty() {
        return Json(McqResponse {
            answer: MISSING_OPTIONS_MESSAGE.to_string(),
            parsed: false,
        });
    }
    if question.is_empty() {
        return Json(McqResponse {
            answer: MISSING_QUESTION_MESSAGE.to_string(),
            parsed: false,
        });
    }

    tracing::info!(question, "mcq request");
    let response = match state.pipeline.answer_mcq_parts(question, options).await {
        Ok(answer) => McqResponse {
            parsed: answer.is_parsed(),
            answer: answer.to_string(),
        },
        Err(e) => {
            tracing::error!(error = %e, "mcq request failed");
            McqResponse {
                answer: e.user_message().to_string(),
                parsed: false,
            }
        }
    };
    Json(response)
}

/// POST /mcqs
pub async fn answer_mcq_batch(
    State(state): State<AppState>,
    Json(request): Json<McqBatchRequest>,
) -> Json<McqBatchResponse> {
    let answers = state.pipeline.answer_batch(&request.mcqs).await;
    tracing::info!(blocks = answers.len(), "mcq batch request");
    Json(McqBatchResponse {
        answers: answers.iter().map(ToString::to_string).collect(),
    })
}

/// POST /short_qa
pub async fn answer_short(
    State(state): State<AppState>,
    Json(request): Json<ShortQaRequest>,
) -> Json<ShortQaResponse> {
    let question = request.question.trim();
    if question.is_empty() {
        return Json(ShortQaResponse {
            answer: MISSING_QUESTION_MESSAGE.to_string(),
        });
    }

    tracing::info!(question, "short answer request");
    let answer = match state.pipeline.answer_short(question).await {
        Ok(answer) => answer,
        Err(e) => {
            tracing::error!(error = %e, "short answer request failed");
            e.user_message().to_string()
        }
    };
    Json(ShortQaResponse { answer })
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        collection: state.collection.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

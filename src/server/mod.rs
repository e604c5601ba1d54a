//! HTTP service exposing the answering pipeline.

pub mod protocol;
pub mod routes;

use std::net::SocketAddr;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::models::ServerConfig;
use crate::services::QaPipeline;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: QaPipeline,
    pub collection: String,
}

pub struct QaServer {
    config: ServerConfig,
    state: AppState,
}

impl QaServer {
    pub fn new(config: ServerConfig, pipeline: QaPipeline, collection: impl Into<String>) -> Self {
        Self {
            config,
            state: AppState {
                pipeline,
                collection: collection.into(),
            },
        }
    }

    pub fn address(&self) -> String {
        self.config.address()
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Serve until Ctrl+C or SIGTERM, then finish in-flight requests.
    pub async fn run(self) -> Result<(), AppError> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| AppError::Server(format!("invalid address {}: {}", self.address(), e)))?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::Server(format!("failed to bind {}: {}", addr, e)))?;

        tracing::info!(%addr, collection = %self.state.collection, "quiz service listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| AppError::Server(e.to_string()))?;

        tracing::info!("quiz service stopped");
        Ok(())
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/mcq", post(routes::answer_mcq))
        .route("/mcqs", post(routes::answer_mcq_batch))
        .route("/short_qa", post(routes::answer_short))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::error::{APOLOGY_MESSAGE, OracleError};
    use crate::models::DocumentChunk;
    use crate::server::protocol::{
        MISSING_OPTIONS_MESSAGE, MISSING_QUESTION_MESSAGE, McqBatchResponse, McqResponse,
        ShortQaResponse,
    };
    use crate::services::testing::{HashEmbedder, ScriptedOracle};
    use crate::services::{EmbeddingIndex, Retriever, SqliteBackend};

    async fn router(oracle: Arc<ScriptedOracle>) -> Router {
        let index = EmbeddingIndex::new(
            Arc::new(HashEmbedder::new(64)),
            Box::new(SqliteBackend::open_in_memory("bio").unwrap()),
            8,
        );
        let chunk = DocumentChunk {
            id: "c0".to_string(),
            document_id: "bio".to_string(),
            content: "The heart pumps blood through arteries and veins.".to_string(),
            chunk_index: 0,
            total_chunks: 1,
            start_offset: 0,
            end_offset: 50,
            dense_vector: Vec::new(),
            checksum: "x".to_string(),
        };
        index.build_or_load(None, || Ok(vec![chunk])).await.unwrap();
        let pipeline = QaPipeline::new(Retriever::new(Arc::new(index), 3), oracle, 2);
        QaServer::new(ServerConfig::default(), pipeline, "bio").router()
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        router: Router,
        uri: &str,
        body: serde_json::Value,
    ) -> T {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_mcq_missing_options_skips_pipeline() {
        let oracle = Arc::new(ScriptedOracle::always("A"));
        let app = router(oracle.clone()).await;

        let response: McqResponse = post_json(
            app.clone(),
            "/mcq",
            serde_json::json!({"question": "What pumps blood?"}),
        )
        .await;
        assert_eq!(response.answer, MISSING_OPTIONS_MESSAGE);
        assert!(!response.parsed);

        let response: McqResponse = post_json(
            app,
            "/mcq",
            serde_json::json!({"question": "What pumps blood?", "options": "   "}),
        )
        .await;
        assert_eq!(response.answer, MISSING_OPTIONS_MESSAGE);
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_mcq_blank_question_skips_pipeline() {
        let oracle = Arc::new(ScriptedOracle::always("A"));
        let app = router(oracle.clone()).await;

        let response: McqResponse = post_json(
            app,
            "/mcq",
            serde_json::json!({
                "question": "  \n",
                "options": "A. digest\nB. pump blood\nC. filter\nD. hormones"
            }),
        )
        .await;
        assert_eq!(response.answer, MISSING_QUESTION_MESSAGE);
        assert!(!response.parsed);
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_mcq_answer() {
        let oracle = Arc::new(ScriptedOracle::always("B. pump blood"));
        let response: McqResponse = post_json(
            router(oracle).await,
            "/mcq",
            serde_json::json!({
                "question": "What is the function of the heart?",
                "options": "A. digest\nB. pump blood\nC. filter\nD. hormones"
            }),
        )
        .await;
        assert_eq!(
            response,
            McqResponse {
                answer: "B".to_string(),
                parsed: true
            }
        );
    }

    #[tokio::test]
    async fn test_mcq_oracle_failure_is_apology() {
        let oracle = Arc::new(ScriptedOracle::default().then_fail(OracleError::Timeout));
        let response: McqResponse = post_json(
            router(oracle).await,
            "/mcq",
            serde_json::json!({"question": "Q?", "options": "A. w B. x C. y D. z"}),
        )
        .await;
        assert_eq!(response.answer, APOLOGY_MESSAGE);
        assert!(!response.parsed);
    }

    #[tokio::test]
    async fn test_mcq_batch() {
        let oracle = Arc::new(ScriptedOracle::always("C"));
        let response: McqBatchResponse = post_json(
            router(oracle).await,
            "/mcqs",
            serde_json::json!({"mcqs": "1. Q1\nA. a\nB. b\nC. c\nD. d\n\n2. Q2\nA. a\nB. b\nC. c\nD. d"}),
        )
        .await;
        assert_eq!(response.answers, vec!["1. C", "2. C"]);
    }

    #[tokio::test]
    async fn test_short_qa() {
        let oracle = Arc::new(ScriptedOracle::always(" It pumps blood. "));
        let response: ShortQaResponse = post_json(
            router(oracle).await,
            "/short_qa",
            serde_json::json!({"question": "What does the heart do?"}),
        )
        .await;
        assert_eq!(response.answer, "It pumps blood.");
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(Arc::new(ScriptedOracle::always("A")))
            .await
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["collection"], "bio");
    }
}

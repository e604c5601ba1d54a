use anyhow::Result;

use crate::cli::output::{StatusInfo, get_formatter};
use crate::client::QuizClient;
use crate::models::{Config, OutputFormat, VectorDriver};
use crate::services::{AnswerOracle, OpenAiOracle, create_backend, create_embedder};

pub async fn handle_status(config: Config, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    let embedding_reachable = match create_embedder(&config.embedding) {
        Ok(embedder) => embedder.health_check().await.unwrap_or(false),
        Err(e) => {
            tracing::debug!(error = %e, "embedder unavailable");
            false
        }
    };

    let (vector_store_connected, vector_store_points) =
        if let Ok(store) = create_backend(&config.vector_store).await {
            let connected = store.health_check().await.unwrap_or(false);
            let points = if connected {
                store
                    .get_collection_info()
                    .await
                    .ok()
                    .flatten()
                    .map_or(0, |info| info.points_count)
            } else {
                0
            };
            (connected, points)
        } else {
            (false, 0)
        };

    let oracle_reachable = match OpenAiOracle::new(&config.oracle) {
        Ok(oracle) => oracle.health_check().await.unwrap_or(false),
        Err(e) => {
            tracing::debug!(error = %e, "oracle unavailable");
            false
        }
    };

    let service_reachable = match QuizClient::new(&config.frontend) {
        Ok(client) => client.health().await.is_ok(),
        Err(_) => false,
    };

    let vector_store_location = match config.vector_store.driver {
        VectorDriver::Sqlite => config.vector_store.path.display().to_string(),
        VectorDriver::Qdrant => config.vector_store.url.clone(),
    };

    let status = StatusInfo {
        embedding_provider: config.embedding.provider.to_string(),
        embedding_model: config.embedding.model_id.clone(),
        embedding_reachable,
        vector_store_driver: config.vector_store.driver.to_string(),
        vector_store_location,
        vector_store_connected,
        vector_store_points,
        collection: config.vector_store.collection.clone(),
        oracle_model: config.oracle.model.clone(),
        oracle_url: config.oracle.url.clone(),
        oracle_reachable,
        service_url: config.frontend.service_url.clone(),
        service_reachable,
    };

    print!("{}", formatter.format_status(&status));

    if format == OutputFormat::Text {
        if !embedding_reachable {
            eprintln!();
            eprintln!(
                "Warning: embedding backend not reachable at {}",
                config.embedding.url
            );
        }
        if !vector_store_connected && config.vector_store.driver == VectorDriver::Qdrant {
            eprintln!("Warning: Qdrant not running. Start with: docker compose up -d qdrant");
        }
        if !oracle_reachable && config.oracle.api_key.is_none() {
            eprintln!("Hint: set OPENAI_API_KEY or oracle.api_key to reach the language model.");
        }
    }

    Ok(())
}

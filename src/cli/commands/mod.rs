mod ask;
mod chat;
mod config;
mod index;
mod serve;
mod status;

pub use ask::AskCommand;
pub use chat::ChatArgs;
pub use config::ConfigCommand;
pub use index::IndexCommand;
pub use serve::ServeArgs;

pub use ask::handle_ask;
pub use chat::handle_chat;
pub use config::handle_config;
pub use index::handle_index;
pub use serve::handle_serve;
pub use status::handle_status;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::models::Config;
use crate::services::{
    DocumentIngestor, EmbeddingIndex, IndexHandle, OpenAiOracle, QaPipeline, Retriever,
};

/// Chunk progress bar for index builds. Hidden in JSON mode.
pub(crate) fn progress_bar(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Open the index, building it from `source` on first use.
pub(crate) async fn open_index(
    config: &Config,
    source: &Path,
    progress: ProgressBar,
) -> Result<(Arc<EmbeddingIndex>, IndexHandle)> {
    let index = EmbeddingIndex::open(config)
        .await
        .context("failed to open the index")?
        .with_progress(progress.clone());
    let ingestor = DocumentIngestor::new(&config.indexing);

    let handle = index
        .build_or_load_file(&ingestor, source)
        .await
        .with_context(|| format!("failed to build or load the index from {}", source.display()))?;
    progress.finish_and_clear();

    Ok((Arc::new(index), handle))
}

/// Wire index, retriever and oracle into a ready pipeline.
pub(crate) async fn open_pipeline(
    config: &Config,
    progress: ProgressBar,
) -> Result<(QaPipeline, IndexHandle)> {
    let oracle = OpenAiOracle::new(&config.oracle).context("failed to configure the oracle")?;
    let (index, handle) = open_index(config, &config.indexing.source_path, progress).await?;

    let retriever = Retriever::new(index, config.retrieval.top_k as usize);
    let pipeline = QaPipeline::new(retriever, Arc::new(oracle), config.oracle.max_concurrency);
    Ok((pipeline, handle))
}

/// Ask for confirmation on stdin. Anything but y/yes declines.
pub(crate) fn confirm(prompt: &str) -> Result<bool> {
    println!("{} [y/N]", prompt);
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    let answer = input.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

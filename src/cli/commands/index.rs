//! Index command implementation.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::commands::{confirm, open_index, progress_bar};
use crate::cli::output::{IndexInfo, get_formatter};
use crate::models::{Config, OutputFormat};
use crate::services::{DocumentIngestor, EmbeddingIndex};
use crate::utils::calculate_file_checksum;

#[derive(Debug, Subcommand)]
pub enum IndexCommand {
    /// Build the index if the collection is empty, otherwise reuse it
    Build {
        /// Textbook to ingest (overrides indexing.source_path)
        #[arg(long, short = 's')]
        source: Option<PathBuf>,
    },

    /// Drop the collection and ingest the textbook again
    Rebuild {
        /// Textbook to ingest (overrides indexing.source_path)
        #[arg(long, short = 's')]
        source: Option<PathBuf>,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Show what the collection holds and whether it matches the source
    Status,
}

pub async fn handle_index(cmd: IndexCommand, config: Config, format: OutputFormat) -> Result<()> {
    match cmd {
        IndexCommand::Build { source } => handle_build(source, config, format).await,
        IndexCommand::Rebuild { source, yes } => handle_rebuild(source, yes, config, format).await,
        IndexCommand::Status => handle_status(config, format).await,
    }
}

async fn handle_build(source: Option<PathBuf>, config: Config, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let source = source.unwrap_or_else(|| config.indexing.source_path.clone());
    let start = Instant::now();

    let (_, handle) = open_index(&config, &source, progress_bar(format == OutputFormat::Text)).await?;

    print!(
        "{}",
        formatter.format_index_built(&handle, start.elapsed().as_millis() as u64)
    );
    Ok(())
}

async fn handle_rebuild(
    source: Option<PathBuf>,
    yes: bool,
    config: Config,
    format: OutputFormat,
) -> Result<()> {
    let formatter = get_formatter(format);
    let source = source.unwrap_or_else(|| config.indexing.source_path.clone());

    if !yes
        && !confirm(&format!(
            "This will delete collection '{}' and re-ingest {}. Continue?",
            config.vector_store.collection,
            source.display()
        ))?
    {
        print!("{}", formatter.format_message("Cancelled."));
        return Ok(());
    }

    let start = Instant::now();
    let progress = progress_bar(format == OutputFormat::Text);
    let index = EmbeddingIndex::open(&config)
        .await
        .context("failed to open the index")?
        .with_progress(progress.clone());
    let ingestor = DocumentIngestor::new(&config.indexing);

    let handle = index
        .rebuild_file(&ingestor, &source)
        .await
        .with_context(|| format!("failed to rebuild the index from {}", source.display()))?;
    progress.finish_and_clear();

    print!(
        "{}",
        formatter.format_index_built(&handle, start.elapsed().as_millis() as u64)
    );
    Ok(())
}

async fn handle_status(config: Config, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let index = EmbeddingIndex::open(&config)
        .await
        .context("failed to open the index")?;

    let mut info = IndexInfo {
        collection: index.collection().to_string(),
        driver: config.vector_store.driver.to_string(),
        ..Default::default()
    };

    if let Some(stored) = index.info().await? {
        let current = calculate_file_checksum(&config.indexing.source_path).ok();
        info.exists = true;
        info.complete = stored.complete;
        info.points = stored.points_count;
        info.dimension = stored.dimension;
        info.embedding_model = stored.embedding_model;
        info.source_current = match (&stored.source_checksum, &current) {
            (Some(stored), Some(current)) => Some(stored == current),
            _ => None,
        };
        info.source_checksum = stored.source_checksum;
    }

    print!("{}", formatter.format_index_info(&info));
    Ok(())
}

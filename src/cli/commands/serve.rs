use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::cli::commands::{open_pipeline, progress_bar};
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::server::QaServer;

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, help = "Address to bind (overrides server.host)")]
    pub host: Option<String>,

    #[arg(long, short = 'p', help = "Port to bind (overrides server.port)")]
    pub port: Option<u16>,

    #[arg(long, short = 's', help = "Textbook to index (overrides indexing.source_path)")]
    pub source: Option<PathBuf>,
}

pub async fn handle_serve(args: ServeArgs, mut config: Config, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(source) = args.source {
        config.indexing.source_path = source;
    }

    // Ingestion and index failures are fatal here, before the port is bound
    let start = std::time::Instant::now();
    let (pipeline, handle) =
        open_pipeline(&config, progress_bar(format == OutputFormat::Text)).await?;
    eprint!(
        "{}",
        formatter.format_index_built(&handle, start.elapsed().as_millis() as u64)
    );

    let server = QaServer::new(config.server.clone(), pipeline, handle.collection.clone());
    eprint!(
        "{}",
        formatter.format_message(&format!("Serving quiz API on http://{}", server.address()))
    );
    server.run().await?;
    Ok(())
}

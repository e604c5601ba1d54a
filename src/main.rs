use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use textbook_qa::cli::commands::{
    handle_ask, handle_chat, handle_config, handle_index, handle_serve, handle_status,
};
use textbook_qa::cli::{Cli, Commands};
use textbook_qa::models::{Config, OutputFormat};
use textbook_qa::server::shutdown_signal;

/// Detect ONNX Runtime library path and set ORT_DYLIB_PATH if not already set.
/// Must be called before any ort code runs.
fn detect_and_set_ort_path() {
    if std::env::var("ORT_DYLIB_PATH").is_ok_and(|p| Path::new(&p).exists()) {
        return;
    }

    let home = std::env::var("HOME").unwrap_or_default();

    let candidates: Vec<String> = if cfg!(target_os = "macos") {
        vec![
            format!("{home}/.local/lib/textbook-qa/libonnxruntime.dylib"),
            "/opt/homebrew/opt/onnxruntime/lib/libonnxruntime.dylib".into(),
            "/usr/local/opt/onnxruntime/lib/libonnxruntime.dylib".into(),
        ]
    } else if cfg!(target_os = "linux") {
        vec![
            format!("{home}/.local/lib/textbook-qa/libonnxruntime.so"),
            "/usr/lib/libonnxruntime.so".into(),
            "/usr/local/lib/libonnxruntime.so".into(),
            "/usr/lib/x86_64-linux-gnu/libonnxruntime.so".into(),
            "/usr/lib/aarch64-linux-gnu/libonnxruntime.so".into(),
        ]
    } else {
        Vec::new()
    };

    if let Some(path) = candidates.into_iter().find(|p| Path::new(p).exists()) {
        // SAFETY: Called at program start before any threads are spawned.
        unsafe {
            std::env::set_var("ORT_DYLIB_PATH", path);
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("textbook_qa={level},tower_http={level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> Result<()> {
    detect_and_set_ort_path();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let explicit = cli.config.as_deref();

    let command = match cli.command {
        // Config subcommands must work even when the current file is invalid
        Commands::Config(cmd) => {
            return handle_config(cmd, explicit, cli.format.unwrap_or_default());
        }
        command => command,
    };

    let resolved = Config::load(explicit)?;
    if let Some(ref path) = resolved.path {
        tracing::debug!(path = %path.display(), "loaded config");
    }
    let config = resolved.config;
    let format = cli.format.unwrap_or(config.output.default_format);

    match command {
        // The server drains in-flight requests on its own shutdown signal
        Commands::Serve(args) => handle_serve(args, config, format).await,
        command => {
            tokio::select! {
                result = run_command(command, config, format) => result,
                _ = shutdown_signal() => {
                    eprintln!("\nReceived shutdown signal, cleaning up...");
                    Ok(())
                }
            }
        }
    }
}

async fn run_command(command: Commands, config: Config, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Index(cmd) => handle_index(cmd, config, format).await,
        Commands::Ask(cmd) => handle_ask(cmd, config, format).await,
        Commands::Chat(args) => handle_chat(args, config, format).await,
        Commands::Status => handle_status(config, format).await,
        Commands::Serve(_) | Commands::Config(_) => Ok(()),
    }
}

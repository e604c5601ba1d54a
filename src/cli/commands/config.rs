use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::{Formatter, get_formatter};
use crate::models::{Config, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Write a config file with default values")]
    Init {
        #[arg(
            long,
            short = 'g',
            help = "Create global config instead of ./tqa.toml"
        )]
        global: bool,
        #[arg(long, help = "Overwrite an existing config file")]
        force: bool,
    },
    #[command(about = "Show the effective configuration")]
    Show,
    #[command(about = "Show configuration file paths")]
    Path {
        #[arg(long, help = "Show all possible config paths")]
        all: bool,
    },
}

pub fn handle_config(
    cmd: ConfigCommand,
    explicit: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let formatter = get_formatter(format);

    match cmd {
        ConfigCommand::Init { global, force } => {
            handle_init(explicit, global, force, formatter.as_ref())
        }
        ConfigCommand::Show => handle_show(explicit, format),
        ConfigCommand::Path { all } => handle_path(explicit, all),
    }
}

fn handle_init(
    explicit: Option<&Path>,
    global: bool,
    force: bool,
    formatter: &dyn Formatter,
) -> Result<()> {
    let path: PathBuf = match (explicit, global) {
        (Some(path), _) => path.to_path_buf(),
        (None, true) => Config::global_path()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?,
        (None, false) => Config::project_path(),
    };

    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }

    Config::default()
        .save(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    print!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", path.display()))
    );
    Ok(())
}

fn handle_show(explicit: Option<&Path>, format: OutputFormat) -> Result<()> {
    let resolved = Config::load(explicit)?;
    let mut config = resolved.config;
    mask_secrets(&mut config);

    if format == OutputFormat::Json {
        let output = serde_json::json!({
            "path": resolved.path,
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match resolved.path {
        Some(ref path) => println!("# Loaded from: {}", path.display()),
        None => println!("# No config file found, using defaults"),
    }
    println!();
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn mask_secrets(config: &mut Config) {
    if config.oracle.api_key.is_some() {
        config.oracle.api_key = Some("********".to_string());
    }
    if config.vector_store.api_key.is_some() {
        config.vector_store.api_key = Some("********".to_string());
    }
}

fn handle_path(explicit: Option<&Path>, show_all: bool) -> Result<()> {
    println!("Configuration paths:");
    println!();

    match Config::locate(explicit) {
        Some(path) => println!("Active config: {}", path.display()),
        None => println!("Active config: (none, using defaults)"),
    }

    if show_all {
        println!("Project config: {}", Config::project_path().display());
        if let Some(path) = Config::global_path() {
            println!("Global config:  {}", path.display());
        }
        if let Ok(cwd) = std::env::current_dir() {
            println!(".env file:      {}", cwd.join(".env").display());
        }
    }

    Ok(())
}

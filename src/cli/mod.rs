//! Command-line interface for the textbook quiz answerer.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Answer multiple-choice and short-answer questions from a textbook.
#[derive(Debug, Parser)]
#[command(name = "tqa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(long, short = 'c', global = true, help = "Path to a config file")]
    pub config: Option<PathBuf>,

    #[arg(long, short = 'f', global = true, help = "Output format: text or json")]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build or load the index, then serve the quiz HTTP API
    Serve(commands::ServeArgs),

    /// Build, rebuild or inspect the textbook index
    #[command(subcommand)]
    Index(commands::IndexCommand),

    /// Answer a question from the command line
    #[command(subcommand)]
    Ask(commands::AskCommand),

    /// Relay stdin lines to a running quiz service, one reply per line
    Chat(commands::ChatArgs),

    /// Check embedding backend, vector store, oracle and service status
    Status,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tqa", "ask", "short", "What is osmosis?", "--format", "json", "-v",
        ])
        .unwrap();
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Ask(_)));
    }

    #[test]
    fn test_parse_index_rebuild_yes() {
        let cli = Cli::try_parse_from(["tqa", "index", "rebuild", "--yes"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Index(commands::IndexCommand::Rebuild { yes: true, .. })
        ));
    }
}

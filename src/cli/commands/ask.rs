use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use tokio::io::AsyncReadExt;

use crate::cli::commands::{open_pipeline, progress_bar};
use crate::cli::output::{Formatter, get_formatter};
use crate::models::{Config, OutputFormat};
use crate::services::{QaPipeline, parse_mcq_input};

#[derive(Debug, Subcommand)]
pub enum AskCommand {
    /// Answer one multiple-choice question
    Mcq {
        /// The question, or the whole MCQ when --options is omitted
        question: String,

        /// Options A-D, newline separated or inline
        #[arg(long, short = 'o')]
        options: Option<String>,

        /// Print the retrieved passages before the answer
        #[arg(long)]
        show_context: bool,
    },

    /// Answer a short-answer question
    Short {
        question: String,

        /// Print the retrieved passages before the answer
        #[arg(long)]
        show_context: bool,
    },

    /// Answer blank-line separated MCQs from a file, or stdin when omitted
    Batch { file: Option<PathBuf> },
}

pub async fn handle_ask(cmd: AskCommand, config: Config, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let (pipeline, _) = open_pipeline(&config, progress_bar(format == OutputFormat::Text)).await?;

    match cmd {
        AskCommand::Mcq {
            question,
            options,
            show_context,
        } => {
            if show_context {
                let query = match options {
                    Some(ref options) => format!("{}\n{}", question.trim(), options.trim()),
                    None => parse_mcq_input(&question)
                        .map(|unit| unit.retrieval_text())
                        .unwrap_or_else(|_| question.clone()),
                };
                print_context(&pipeline, &query, formatter.as_ref()).await?;
            }

            let result = match options {
                Some(ref options) => pipeline.answer_mcq_parts(&question, options).await,
                None => pipeline.answer_mcq_text(&question).await,
            };
            match result {
                Ok(answer) => print!("{}", formatter.format_mcq(&answer)),
                Err(e) => {
                    tracing::error!(error = %e, "mcq failed");
                    print!("{}", formatter.format_error(e.user_message()));
                }
            }
        }
        AskCommand::Short {
            question,
            show_context,
        } => {
            if show_context {
                print_context(&pipeline, &question, formatter.as_ref()).await?;
            }
            match pipeline.answer_short(&question).await {
                Ok(answer) => print!("{}", formatter.format_short(&answer)),
                Err(e) => {
                    tracing::error!(error = %e, "short answer failed");
                    print!("{}", formatter.format_error(e.user_message()));
                }
            }
        }
        AskCommand::Batch { file } => {
            let text = match file {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => {
                    let mut text = String::new();
                    tokio::io::stdin()
                        .read_to_string(&mut text)
                        .await
                        .context("failed to read stdin")?;
                    text
                }
            };
            let answers = pipeline.answer_batch(&text).await;
            print!("{}", formatter.format_batch(&answers));
        }
    }

    Ok(())
}

async fn print_context(pipeline: &QaPipeline, query: &str, formatter: &dyn Formatter) -> Result<()> {
    let context = pipeline
        .retriever()
        .retrieve(query)
        .await
        .context("retrieval failed")?;
    print!("{}", formatter.format_context(&context));
    Ok(())
}

use anyhow::{Context, Result};
use clap::Args;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

use crate::cli::output::get_formatter;
use crate::client::{FrontendResponder, Intent, QuizClient};
use crate::models::{Config, OutputFormat};

#[derive(Debug, Args)]
pub struct ChatArgs {
    /// How each utterance is treated. `batch` reads all of stdin as one request.
    #[arg(long, short = 'i', value_enum, default_value_t = Intent::Mcq)]
    pub intent: Intent,

    /// Quiz service base URL (overrides frontend.service_url)
    #[arg(long)]
    pub url: Option<String>,
}

pub async fn handle_chat(args: ChatArgs, mut config: Config, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    if let Some(url) = args.url {
        config.frontend.service_url = url;
    }

    let client = QuizClient::new(&config.frontend).context("failed to build HTTP client")?;
    tracing::debug!(url = client.base_url(), intent = ?args.intent, "chat session");
    let responder = FrontendResponder::new(client);

    if args.intent == Intent::Batch {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("failed to read stdin")?;
        let reply = responder.respond(Intent::Batch, &text).await;
        print!("{}", formatter.format_message(&reply));
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = responder.respond(args.intent, &line).await;
        print!("{}", formatter.format_message(&reply));
    }

    Ok(())
}

mod cli;
mod server_client;
mod terminal;

use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use crate::cli::{CliArgs, Command};
use crate::server_client::ServerClient;
use crate::terminal::Terminal;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    // Before parsing, so CIDRAG_SERVER can come from .env.
    cidrag_core::config::load_dotenv();
    let args = CliArgs::parse();

    let client = ServerClient::new(&args.server, Duration::from_secs(args.timeout))?;
    debug!("using server {}", client.base_url());
    run(&client, &Terminal, args.command).await
}

async fn run(client: &ServerClient, terminal: &Terminal, command: Command) -> Result<()> {
    match command {
        Command::AddText { text } => {
            let text = if text == "-" { read_stdin()? } else { text };
            terminal.print_uploaded(&client.add_text(&text).await?)
        }
        Command::AddUrl { url } => terminal.print_uploaded(&client.add_url(&url).await?),
        Command::AddPdf { path } => terminal.print_uploaded(&client.add_pdf(&path).await?),
        Command::AddFile => terminal.print_uploaded(&client.add_knowledge_file().await?),
        Command::Ask { question, show_context } => {
            terminal.print_answer(&client.ask(&question).await?, show_context)
        }
        Command::Chat { show_context } => chat(client, terminal, show_context).await,
        Command::Health => terminal.print_json(&client.health().await?),
    }
}

/// Question loop; a failed question is reported and the loop continues.
async fn chat(client: &ServerClient, terminal: &Terminal, show_context: bool) -> Result<()> {
    terminal.print_banner(client.base_url())?;
    while let Some(question) = terminal.read_input()? {
        if question.is_empty() {
            continue;
        }
        match client.ask(&question).await {
            Ok(answer) => terminal.print_answer(&answer, show_context)?,
            Err(e) => terminal.print_error(&e)?,
        }
    }
    Ok(())
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("failed to read text from stdin")?;
    Ok(text)
}

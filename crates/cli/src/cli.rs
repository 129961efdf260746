use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line client for the cidrag RAG service.
///
/// Ingests documents into a running server and asks it questions.
#[derive(Parser, Debug)]
#[command(name = "cidrag-cli", about = "Command-line client for the cidrag RAG service", version)]
pub struct CliArgs {
    /// Base URL of the cidrag server
    #[arg(long, env = "CIDRAG_SERVER", default_value = "http://localhost:3000", global = true)]
    pub server: String,

    /// Per-request timeout in seconds (uploads embed every chunk, so keep it generous)
    #[arg(long, default_value = "300", global = true)]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Ingest raw text ("-" reads it from stdin)
    AddText { text: String },

    /// Fetch a web page on the server and ingest its article text
    AddUrl { url: String },

    /// Upload and ingest a PDF
    AddPdf { path: PathBuf },

    /// Ingest the knowledge file configured on the server
    AddFile,

    /// Ask a single question
    Ask {
        question: String,
        /// Also print the retrieved context chunks
        #[arg(long)]
        show_context: bool,
    },

    /// Ask questions interactively until `exit`
    Chat {
        #[arg(long)]
        show_context: bool,
    },

    /// Show server health and wiring
    Health,
}

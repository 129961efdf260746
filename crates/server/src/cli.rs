//! CLI argument parsing and subcommand dispatch.

use std::path::Path;

use anyhow::{bail, Context};
use tracing::info;

use cidrag_core::Config;

use crate::startup;

/// Parse CLI arguments and run a one-shot subcommand.
///
/// Returns `Ok(true)` if a subcommand was handled, `Ok(false)` if `serve`
/// should be started (handled by the caller).
pub async fn dispatch(config: &Config, args: &[String]) -> anyhow::Result<bool> {
    match args.get(1).map(|s| s.as_str()) {
        None | Some("serve") => Ok(false),
        Some("ingest") => {
            let Some(path) = args.get(2) else {
                bail!("Usage: cidrag-server ingest <file>");
            };
            ingest_file(config, Path::new(path)).await?;
            Ok(true)
        }
        Some("config") => {
            config.log_summary();
            Ok(true)
        }
        _ => {
            print_usage();
            Ok(true)
        }
    }
}

/// Ingest a local file through the same pipeline `/rag/upload` uses,
/// printing one JSON line per stored chunk.
async fn ingest_file(config: &Config, path: &Path) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("file name is not valid UTF-8")?;

    let doc = cidrag_ingest::extract_text(&bytes, filename)?;
    let text = doc.full_text();
    if text.trim().is_empty() {
        bail!("{} contains no extractable text", path.display());
    }
    let chunk_size = if doc.file_type == "pdf" {
        config.ingest.pdf_chunk_size
    } else {
        config.ingest.text_chunk_size
    };

    let state = startup::build_app_state(config).await?;
    let uploaded = state.pipeline.ingest_text(&text, chunk_size).await?;
    for chunk in &uploaded {
        println!("{}", serde_json::to_string(chunk)?);
    }
    info!("ingested {} chunks from {}", uploaded.len(), path.display());
    Ok(())
}

fn print_usage() {
    println!("cidrag-server v{}", env!("CARGO_PKG_VERSION"));
    println!("Usage: cidrag-server [command]");
    println!("  serve            Start the HTTP server (default)");
    println!("  ingest <file>    Chunk, store and index a local .txt/.md/.html/.pdf file");
    println!("  config           Print the effective configuration");
}

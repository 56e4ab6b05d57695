//! Runs one web search and prints the response.
//!
//! Tracing goes to stderr; stdout carries only the formatted response.
//! Ctrl+C closes the rendering pool and extractor before exiting.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use websift::output::{self, OutputFormat};
use websift_search::WebSearcher;

/// Keyless web search with page content extraction.
#[derive(Parser)]
#[command(name = "websift-host", version, about)]
struct Cli {
    /// Search query.
    query: String,

    /// Number of results to return.
    #[arg(short = 'n', long, default_value_t = 5)]
    limit: usize,

    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum characters of page text per result. 0 disables truncation.
    #[arg(long)]
    max_content_length: Option<usize>,

    /// List results without fetching their pages.
    #[arg(long)]
    no_extract: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    websift::init_tracing();
    let cli = Cli::parse();

    let config = websift::config::load(cli.config.as_deref())?;
    let shutdown_budget = Duration::from_millis(config.shutdown_timeout_ms);
    let searcher = Arc::new(WebSearcher::new(config)?);

    let work = {
        let searcher = Arc::clone(&searcher);
        async move { run(&searcher, &cli).await }
    };

    let outcome = tokio::select! {
        outcome = work => Some(outcome),
        signal = tokio::signal::ctrl_c() => {
            if signal.is_ok() {
                info!("received Ctrl+C, shutting down...");
            }
            None
        }
    };

    // close_all bounds itself by shutdown_timeout_ms; the outer timeout
    // covers a pool that never answers.
    if tokio::time::timeout(shutdown_budget * 2, searcher.close_all())
        .await
        .is_err()
    {
        tracing::warn!("shutdown timed out");
    }

    match outcome {
        Some(result) => {
            let text = result?;
            print!("{text}");
            Ok(())
        }
        None => anyhow::bail!("interrupted"),
    }
}

async fn run(searcher: &WebSearcher, cli: &Cli) -> anyhow::Result<String> {
    if cli.no_extract {
        let response = searcher.search(&cli.query, Some(cli.limit)).await?;
        return Ok(match cli.format {
            OutputFormat::Text => output::format_response(&response),
            OutputFormat::Json => output::to_json(&response)? + "\n",
        });
    }

    let response = searcher
        .search_and_extract(&cli.query, cli.limit, cli.max_content_length)
        .await?;
    Ok(match cli.format {
        OutputFormat::Text => output::format_enriched(&response),
        OutputFormat::Json => output::to_json(&response)? + "\n",
    })
}

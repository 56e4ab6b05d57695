//! Plain-text and JSON rendering of search responses.

use std::fmt::Write as _;

use clap::ValueEnum;
use serde::Serialize;
use websift_search::{EnrichedResponse, FetchStatus, ResultQuality, SearchResponse};

use crate::error::{HostError, Result};

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Pretty JSON for any serializable response.
///
/// # Errors
///
/// Returns [`HostError::Output`] if serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| HostError::Output(e.to_string()))
}

fn header(out: &mut String, provider: &str, quality: ResultQuality, relevance: f64) {
    let _ = write!(out, "Provider: {provider} (relevance {relevance:.2}");
    if quality == ResultQuality::Degraded {
        out.push_str(", degraded");
    }
    out.push_str(")\n");
}

/// Text listing of a search without extraction.
pub fn format_response(response: &SearchResponse) -> String {
    let mut out = String::new();
    header(
        &mut out,
        response.provider.name(),
        response.quality,
        response.relevance,
    );
    for (i, result) in response.results.iter().enumerate() {
        let _ = write!(out, "\n{}. {}\n   {}\n", i + 1, result.title, result.url);
        if !result.description.is_empty() {
            let _ = writeln!(out, "   {}", result.description);
        }
    }
    for failure in &response.failures {
        let _ = writeln!(out, "\n! {}: {}", failure.url, failure.error);
    }
    out
}

/// Text listing of a search with extracted content.
///
/// Successful items show their preview, failed items their error, and the
/// status summary closes the listing.
pub fn format_enriched(response: &EnrichedResponse) -> String {
    let mut out = String::new();
    header(
        &mut out,
        response.provider.name(),
        response.quality,
        response.relevance,
    );
    for (i, item) in response.results.iter().enumerate() {
        let _ = write!(
            out,
            "\n{}. {}\n   {}\n",
            i + 1,
            item.result.title,
            item.result.url
        );
        match item.status {
            FetchStatus::Success => {
                if let Some(preview) = &item.content_preview {
                    let _ = writeln!(out, "   {preview}");
                }
            }
            FetchStatus::Error => {
                if let Some(error) = &item.error {
                    let _ = writeln!(out, "   [{}] {}", error.category.label(), error.message);
                }
            }
            FetchStatus::Skipped => out.push_str("   [skipped: not an HTML page]\n"),
            FetchStatus::Pending => {}
        }
    }
    let _ = write!(out, "\n{}\n", response.summary);
    out
}

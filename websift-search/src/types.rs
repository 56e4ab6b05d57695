//! Core types for queries, provider results, and enriched extraction output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SearchError;
use crate::failure::FailureCategory;

/// Upper bound on the number of results a single query may request.
pub const MAX_RESULTS: usize = 10;

/// A validated search request. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    text: String,
    count: usize,
}

impl SearchQuery {
    /// Create a query, rejecting empty text and counts outside `1..=MAX_RESULTS`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidQuery`] for blank text or an out-of-range count.
    pub fn new(text: &str, count: usize) -> Result<Self, SearchError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SearchError::InvalidQuery("query must not be empty".into()));
        }
        if count == 0 || count > MAX_RESULTS {
            return Err(SearchError::InvalidQuery(format!(
                "result count must be between 1 and {MAX_RESULTS}, got {count}"
            )));
        }
        Ok(Self {
            text: text.to_owned(),
            count,
        })
    }

    /// The trimmed query text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The requested number of results.
    pub fn count(&self) -> usize {
        self.count
    }
}

/// Result-listing providers, in their default priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Provider {
    /// Bing. Good general index, blocks plain HTTP clients aggressively.
    Bing,
    /// Brave Search. Independent index, tolerant of light clients.
    Brave,
    /// DuckDuckGo HTML endpoint, no JavaScript required.
    DuckDuckGo,
}

/// How a provider's result page is retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchProfile {
    /// Always go through a rendering engine.
    AlwaysRender,
    /// Try plain HTTP first, render when blocked or unparseable.
    LightweightFirst,
}

impl Provider {
    /// Human-readable provider name, also used as the response tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bing => "Bing",
            Self::Brave => "Brave",
            Self::DuckDuckGo => "DuckDuckGo",
        }
    }

    /// Bot-resistance profile for this provider.
    pub fn fetch_profile(&self) -> FetchProfile {
        match self {
            Self::Bing => FetchProfile::AlwaysRender,
            Self::Brave | Self::DuckDuckGo => FetchProfile::LightweightFirst,
        }
    }

    /// Host names belonging to the provider itself. Results pointing back
    /// at these are navigation chrome, not organic hits.
    pub fn own_hosts(&self) -> &'static [&'static str] {
        match self {
            Self::Bing => &["bing.com", "www.bing.com", "go.microsoft.com"],
            Self::Brave => &["search.brave.com", "brave.com"],
            Self::DuckDuckGo => &["duckduckgo.com", "html.duckduckgo.com"],
        }
    }

    /// All providers in default priority order.
    pub fn all() -> &'static [Provider] {
        &[Self::Bing, Self::Brave, Self::DuckDuckGo]
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single result returned by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result title as shown by the provider.
    pub title: String,
    /// Absolute target URL.
    pub url: String,
    /// Provider snippet.
    pub description: String,
    /// When the provider adapter parsed this result.
    pub discovered_at: DateTime<Utc>,
    /// Which provider returned this result.
    pub provider: Provider,
}

impl SearchResult {
    /// Build a result stamped with the current time.
    pub fn new(title: String, url: String, description: String, provider: Provider) -> Self {
        Self {
            title,
            url,
            description,
            discovered_at: Utc::now(),
            provider,
        }
    }
}

/// Whether the returned list passed the relevance gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultQuality {
    /// The scorer accepted the list.
    Accepted,
    /// No list was accepted; this is the best rejected one.
    Degraded,
}

/// An ordered result list from exactly one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Results in provider rank order.
    pub results: Vec<SearchResult>,
    /// The provider whose list was accepted.
    pub provider: Provider,
    /// Number of results.
    pub count: usize,
    /// List-level relevance score in `[0, 1]`.
    pub relevance: f64,
    /// Acceptance marker.
    pub quality: ResultQuality,
    /// Provider-level failures observed while building this response.
    pub failures: Vec<FailureRecord>,
}

/// Terminal or pending state of a page extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    /// Not yet attempted.
    Pending,
    /// Content extracted.
    Success,
    /// Both fetch paths failed.
    Error,
    /// Not attempted because the target is not an HTML page.
    Skipped,
}

/// A categorised extraction failure attached to an [`EnrichedResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchFailure {
    /// Raw error text.
    pub message: String,
    /// Diagnostic category.
    pub category: FailureCategory,
}

impl FetchFailure {
    /// Failure for a typed error, categorised by its variant.
    pub fn from_error(err: &SearchError) -> Self {
        Self {
            message: err.to_string(),
            category: err.category(),
        }
    }

    /// Categorise a raw error message.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let category = FailureCategory::classify(&message);
        Self { message, category }
    }
}

/// A search result plus the outcome of extracting its page content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedResult {
    /// The provider result this enrichment belongs to.
    #[serde(flatten)]
    pub result: SearchResult,
    /// Full cleaned page text.
    pub full_content: Option<String>,
    /// Short preview of the cleaned text.
    pub content_preview: Option<String>,
    /// Extraction status.
    pub status: FetchStatus,
    /// Failure details when `status` is [`FetchStatus::Error`].
    pub error: Option<FetchFailure>,
}

/// Characters kept in [`EnrichedResult::content_preview`].
pub const PREVIEW_CHARS: usize = 300;

/// Terminal outcome of one extraction, applied via [`EnrichedResult::finish`].
#[derive(Debug, Clone)]
pub enum ExtractionOutcome {
    /// Cleaned text.
    Success(String),
    /// Target skipped with a reason.
    Skipped(String),
    /// Extraction failed.
    Failed(FetchFailure),
}

impl EnrichedResult {
    /// Wrap a result in the pending state.
    pub fn pending(result: SearchResult) -> Self {
        Self {
            result,
            full_content: None,
            content_preview: None,
            status: FetchStatus::Pending,
            error: None,
        }
    }

    /// Move a pending result to its terminal state. A result that has
    /// already left `Pending` is returned unchanged.
    pub fn finish(mut self, outcome: ExtractionOutcome) -> Self {
        if self.status != FetchStatus::Pending {
            tracing::warn!(url = %self.result.url, status = ?self.status, "ignoring second extraction outcome");
            return self;
        }
        match outcome {
            ExtractionOutcome::Success(text) => {
                self.content_preview = Some(preview(&text));
                self.full_content = Some(text);
                self.status = FetchStatus::Success;
            }
            ExtractionOutcome::Skipped(reason) => {
                tracing::debug!(url = %self.result.url, %reason, "extraction skipped");
                self.status = FetchStatus::Skipped;
            }
            ExtractionOutcome::Failed(failure) => {
                self.error = Some(failure);
                self.status = FetchStatus::Error;
            }
        }
        self
    }

    /// Whether extraction succeeded.
    pub fn is_success(&self) -> bool {
        self.status == FetchStatus::Success
    }
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_owned(),
    }
}

/// One failed fetch, aggregated per request for diagnostics only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    /// The URL (page or provider endpoint) that failed.
    pub url: String,
    /// Raw error text.
    pub error: String,
    /// Diagnostic category.
    pub category: FailureCategory,
}

impl FailureRecord {
    /// Record a typed error, categorised by its variant.
    pub fn from_error(url: impl Into<String>, err: &SearchError) -> Self {
        Self {
            url: url.into(),
            error: err.to_string(),
            category: err.category(),
        }
    }

    /// Build a record, categorising the raw error text.
    pub fn new(url: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        let category = FailureCategory::classify(&error);
        Self {
            url: url.into(),
            error,
            category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result(url: &str) -> SearchResult {
        SearchResult::new(
            "Example".into(),
            url.into(),
            "An example page".into(),
            Provider::Brave,
        )
    }

    #[test]
    fn query_trims_and_keeps_count() {
        let query = SearchQuery::new("  rust ownership  ", 3).expect("valid query");
        assert_eq!(query.text(), "rust ownership");
        assert_eq!(query.count(), 3);
    }

    #[test]
    fn query_rejects_empty_text() {
        let err = SearchQuery::new("   ", 3).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn query_rejects_out_of_range_count() {
        assert!(SearchQuery::new("rust", 0).is_err());
        assert!(SearchQuery::new("rust", MAX_RESULTS + 1).is_err());
        assert!(SearchQuery::new("rust", MAX_RESULTS).is_ok());
    }

    #[test]
    fn provider_display_and_order() {
        assert_eq!(Provider::Bing.to_string(), "Bing");
        assert_eq!(Provider::DuckDuckGo.to_string(), "DuckDuckGo");
        assert_eq!(
            Provider::all(),
            &[Provider::Bing, Provider::Brave, Provider::DuckDuckGo]
        );
    }

    #[test]
    fn bing_always_renders() {
        assert_eq!(Provider::Bing.fetch_profile(), FetchProfile::AlwaysRender);
        assert_eq!(
            Provider::DuckDuckGo.fetch_profile(),
            FetchProfile::LightweightFirst
        );
    }

    #[test]
    fn provider_serde_uses_variant_names() {
        let json = serde_json::to_string(&Provider::DuckDuckGo).expect("serialize");
        assert_eq!(json, "\"DuckDuckGo\"");
    }

    #[test]
    fn pending_then_success_sets_preview() {
        let long = "a".repeat(PREVIEW_CHARS + 50);
        let enriched =
            EnrichedResult::pending(make_result("https://a.com")).finish(ExtractionOutcome::Success(long));
        assert_eq!(enriched.status, FetchStatus::Success);
        let preview = enriched.content_preview.expect("preview");
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
        assert!(enriched.error.is_none());
    }

    #[test]
    fn finish_only_applies_once() {
        let enriched = EnrichedResult::pending(make_result("https://a.com"))
            .finish(ExtractionOutcome::Skipped("pdf".into()))
            .finish(ExtractionOutcome::Success("late".into()));
        assert_eq!(enriched.status, FetchStatus::Skipped);
        assert!(enriched.full_content.is_none());
    }

    #[test]
    fn failure_is_categorised() {
        let enriched = EnrichedResult::pending(make_result("https://a.com")).finish(
            ExtractionOutcome::Failed(FetchFailure::from_message("timeout: exceeded 100ms")),
        );
        assert_eq!(enriched.status, FetchStatus::Error);
        assert_eq!(
            enriched.error.map(|e| e.category),
            Some(FailureCategory::Timeout)
        );
    }

    #[test]
    fn typed_failure_ignores_url_text() {
        let err = SearchError::BotDetected(
            "https://example.com/guides/connection-timeout-settings: HTTP 403".into(),
        );
        let failure = FetchFailure::from_error(&err);
        assert_eq!(failure.category, FailureCategory::BotDetection);
        assert!(failure.message.starts_with("bot detection: "));

        let record = FailureRecord::from_error("https://search.example/404", &err);
        assert_eq!(record.category, FailureCategory::BotDetection);
    }

    #[test]
    fn fetch_status_serialises_lowercase() {
        let json = serde_json::to_string(&FetchStatus::Skipped).expect("serialize");
        assert_eq!(json, "\"skipped\"");
    }
}

//! Error types for the websift-search crate.
//!
//! All errors use stable string messages suitable for display to users
//! and for failure categorisation. Query text never appears in an error
//! message produced by this crate.

use crate::failure::FailureCategory;

/// Errors that can occur during search, rendering, or extraction.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// No provider produced a usable result list.
    #[error("no provider produced results: {0}")]
    NoProviderResults(String),

    /// An operation exceeded its time budget.
    #[error("timeout: {0}")]
    Timeout(String),

    /// An HTTP request failed at the transport or status level.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Failed to parse a provider or page response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The query or requested result count is out of bounds.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The rendering pool could not hand out a context in time.
    #[error("rendering pool unavailable: {0}")]
    PoolUnavailable(String),

    /// The rendering pool has been shut down.
    #[error("rendering pool closed")]
    PoolClosed,

    /// A rendering engine failed to launch, navigate, or respond.
    #[error("browser error: {0}")]
    Browser(String),

    /// The target is not an HTML document.
    #[error("non-HTML content: {0}")]
    NonHtml(String),

    /// The response body exceeds the configured size limit.
    #[error("content too large: {0}")]
    ContentTooLarge(String),

    /// The response carries a bot-detection signature.
    #[error("bot detection: {0}")]
    BotDetected(String),

    /// The component has been shut down with `close_all`.
    #[error("{0} has been shut down")]
    ShutDown(&'static str),
}

impl SearchError {
    /// Diagnostic category of this error.
    ///
    /// Taken from the variant. Only the free-form transport and browser
    /// details are matched as text, and those never carry the target URL.
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::Timeout(_) => FailureCategory::Timeout,
            Self::BotDetected(_) => FailureCategory::BotDetection,
            Self::ContentTooLarge(_) => FailureCategory::ContentTooLarge,
            Self::Http(detail) | Self::Browser(detail) => FailureCategory::classify(detail),
            Self::NoProviderResults(_)
            | Self::Parse(_)
            | Self::Config(_)
            | Self::InvalidQuery(_)
            | Self::PoolUnavailable(_)
            | Self::PoolClosed
            | Self::NonHtml(_)
            | Self::ShutDown(_) => FailureCategory::Other,
        }
    }
}

/// Convenience type alias for websift-search results.
pub type Result<T> = std::result::Result<T, SearchError>;

//! Capability interface for result providers.
//!
//! Each provider (Bing, Brave, DuckDuckGo) implements [`ResultProvider`]
//! to submit a query and parse the provider's result markup into
//! [`SearchResult`] values in native rank order. The orchestrator only
//! ever calls [`ResultProvider::fetch_results`], which never fails: adapter
//! errors become an empty list plus a [`FailureRecord`].

use std::future::Future;

use crate::error::SearchError;
use crate::types::{FailureRecord, Provider, SearchQuery, SearchResult};

/// What one provider produced for one query.
#[derive(Debug, Clone)]
pub struct ProviderOutcome {
    /// The provider queried.
    pub provider: Provider,
    /// Results in provider rank order; empty on failure.
    pub results: Vec<SearchResult>,
    /// Set when the provider failed or produced nothing.
    pub failure: Option<FailureRecord>,
}

impl ProviderOutcome {
    /// A failed outcome with no results.
    pub fn failed(provider: Provider, failure: FailureRecord) -> Self {
        Self {
            provider,
            results: Vec::new(),
            failure: Some(failure),
        }
    }
}

/// A result-listing backend.
///
/// Implementors handle URL construction, the request (lightweight or
/// rendered, per [`Provider::fetch_profile`]), and parsing. All
/// implementations must be `Send + Sync` so the orchestrator can query
/// several concurrently.
pub trait ResultProvider: Send + Sync {
    /// Which provider this is.
    fn provider(&self) -> Provider;

    /// Base URL queried, used to label failure records.
    fn endpoint(&self) -> &str;

    /// Query the provider and parse its results.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the request fails, the provider blocks the
    /// client, or the response cannot be parsed.
    fn search(
        &self,
        query: &SearchQuery,
    ) -> impl Future<Output = Result<Vec<SearchResult>, SearchError>> + Send;

    /// Query the provider, absorbing every failure into the outcome.
    fn fetch_results(&self, query: &SearchQuery) -> impl Future<Output = ProviderOutcome> + Send {
        async move {
            let provider = self.provider();
            match self.search(query).await {
                Ok(results) if results.is_empty() => {
                    tracing::info!(%provider, "provider returned no parseable results");
                    ProviderOutcome::failed(
                        provider,
                        FailureRecord::new(self.endpoint(), "no results parsed"),
                    )
                }
                Ok(results) => {
                    tracing::debug!(%provider, count = results.len(), "provider returned results");
                    ProviderOutcome {
                        provider,
                        results,
                        failure: None,
                    }
                }
                Err(err) => {
                    tracing::warn!(%provider, error = %err, "provider query failed");
                    ProviderOutcome::failed(
                        provider,
                        FailureRecord::from_error(self.endpoint(), &err),
                    )
                }
            }
        }
    }
}

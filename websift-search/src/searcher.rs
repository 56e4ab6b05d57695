//! The `WebSearcher` facade: one orchestrator, one extractor and the
//! rendering pool they share.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::SearchConfig;
use crate::content::ContentExtractor;
use crate::error::SearchError;
use crate::http;
use crate::orchestrator::SearchOrchestrator;
use crate::provider::ResultProvider;
use crate::providers::{ProviderAdapter, ProviderEnv};
use crate::render::chromium::ChromiumLauncher;
use crate::render::{EngineLauncher, RenderPool};
use crate::summary::StatusSummary;
use crate::types::{
    EnrichedResult, FailureRecord, Provider, ResultQuality, SearchQuery, SearchResponse,
    MAX_RESULTS,
};

/// Search results with extracted page content.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedResponse {
    /// The single provider every result came from.
    pub provider: Provider,
    /// Whether the provider's list passed the relevance check.
    pub quality: ResultQuality,
    /// List-level relevance score.
    pub relevance: f64,
    /// At most `limit` results in provider rank order.
    pub results: Vec<EnrichedResult>,
    /// Counts of what was requested, found, extracted and failed.
    pub summary: StatusSummary,
    /// Provider-level failures observed on the way.
    pub failures: Vec<FailureRecord>,
}

/// Keyless web search with page extraction.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> websift_search::Result<()> {
/// use websift_search::{SearchConfig, WebSearcher};
///
/// let searcher = WebSearcher::new(SearchConfig::default())?;
/// let response = searcher.search_and_extract("rust ownership", 3, None).await?;
/// println!("{} via {}", response.summary, response.provider);
/// searcher.close_all().await;
/// # Ok(())
/// # }
/// ```
pub struct WebSearcher<P = ProviderAdapter> {
    config: Arc<SearchConfig>,
    orchestrator: SearchOrchestrator<P>,
    extractor: ContentExtractor,
    pool: RenderPool,
    closed: AtomicBool,
}

impl WebSearcher<ProviderAdapter> {
    /// Searcher over the configured providers, rendering with locally
    /// installed Chromium-family browsers.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for an invalid configuration or
    /// [`SearchError::Http`] if an HTTP client cannot be built.
    pub fn new(config: SearchConfig) -> Result<Self, SearchError> {
        let launcher = Arc::new(ChromiumLauncher::new(config.user_agent.clone()));
        Self::with_launcher(config, launcher)
    }

    /// Searcher over the configured providers with a custom engine launcher.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_launcher(
        config: SearchConfig,
        launcher: Arc<dyn EngineLauncher>,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        let config = Arc::new(config);
        let pool = pool_for(&config, launcher);
        let env = ProviderEnv {
            client: http::build_client(&config)?,
            pool: pool.clone(),
            config: Arc::clone(&config),
        };
        let orchestrator = SearchOrchestrator::new(env);
        Self::assemble(config, orchestrator, pool)
    }
}

impl<P: ResultProvider> WebSearcher<P> {
    /// Searcher over an explicit provider list.
    ///
    /// # Errors
    ///
    /// Same as [`WebSearcher::new`].
    pub fn with_providers(
        config: SearchConfig,
        providers: Vec<P>,
        launcher: Arc<dyn EngineLauncher>,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        let config = Arc::new(config);
        let pool = pool_for(&config, launcher);
        let orchestrator = SearchOrchestrator::with_providers(providers, &config);
        Self::assemble(config, orchestrator, pool)
    }

    fn assemble(
        config: Arc<SearchConfig>,
        orchestrator: SearchOrchestrator<P>,
        pool: RenderPool,
    ) -> Result<Self, SearchError> {
        let extractor = ContentExtractor::new(Arc::clone(&config), pool.clone())?;
        Ok(Self {
            config,
            orchestrator,
            extractor,
            pool,
            closed: AtomicBool::new(false),
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The shared rendering pool.
    pub fn pool(&self) -> &RenderPool {
        &self.pool
    }

    /// The content extractor.
    pub fn extractor(&self) -> &ContentExtractor {
        &self.extractor
    }

    /// Search without extracting content. `None` uses `default_results`.
    ///
    /// # Errors
    ///
    /// See [`SearchOrchestrator::search`].
    pub async fn search(
        &self,
        query: &str,
        num_results: Option<usize>,
    ) -> Result<SearchResponse, SearchError> {
        let count = num_results.unwrap_or(self.config.default_results);
        self.orchestrator.search(query, count).await
    }

    /// Search, then extract content for up to `limit` results.
    ///
    /// Twice `limit` candidates (at most ten) are requested from the
    /// provider so that skipped and failed pages can be replaced.
    /// `max_content_length` overrides the configured limit; 0 disables
    /// truncation.
    ///
    /// # Errors
    ///
    /// Fails only when the query is invalid, the searcher is shut down, or
    /// no provider produced a result list. Extraction failures are reported
    /// per result and in the summary.
    pub async fn search_and_extract(
        &self,
        query: &str,
        limit: usize,
        max_content_length: Option<usize>,
    ) -> Result<EnrichedResponse, SearchError> {
        let query = SearchQuery::new(query, limit)?;
        let candidates = (limit * 2).min(MAX_RESULTS);
        let response = self.orchestrator.search(query.text(), candidates).await?;

        let max_length = max_content_length.unwrap_or(self.config.max_content_length);
        let obtained = response.count;
        let report = self
            .extractor
            .extract_batch(response.results, limit, Some(max_length))
            .await;
        let summary = StatusSummary::from_finished(limit, obtained, &report.finished);
        tracing::info!(provider = %response.provider, %summary, "search and extract complete");

        Ok(EnrichedResponse {
            provider: response.provider,
            quality: response.quality,
            relevance: response.relevance,
            results: report.selected,
            summary,
            failures: response.failures,
        })
    }

    /// Extract one page. See [`ContentExtractor::extract_content`].
    ///
    /// # Errors
    ///
    /// See [`ContentExtractor::extract_content`].
    pub async fn extract_content(
        &self,
        url: &str,
        max_content_length: Option<usize>,
    ) -> Result<String, SearchError> {
        self.extractor.extract_content(url, max_content_length).await
    }

    /// Close the extractor, the orchestrator and the rendering pool within
    /// `shutdown_timeout_ms`. Safe to call more than once.
    pub async fn close_all(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let budget = Duration::from_millis(self.config.shutdown_timeout_ms);
        let close = async {
            self.extractor.close_all().await;
            self.orchestrator.close_all().await;
            self.pool.close_all().await;
        };
        match tokio::time::timeout(budget, close).await {
            Ok(()) => tracing::info!("web searcher shut down"),
            Err(_) => tracing::warn!(
                timeout_ms = self.config.shutdown_timeout_ms,
                "shutdown did not finish in time"
            ),
        }
    }
}

fn pool_for(config: &SearchConfig, launcher: Arc<dyn EngineLauncher>) -> RenderPool {
    RenderPool::new(
        launcher,
        config.max_pool_size,
        config.enabled_engines.clone(),
        Duration::from_millis(config.pool_acquire_timeout_ms),
    )
}

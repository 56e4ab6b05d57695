//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] controls the provider chain, relevance gating, the
//! rendering pool, and extraction limits. The defaults are tuned for a
//! single interactive query answered within a few seconds.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::SearchError;
use crate::render::EngineKind;
use crate::types::{Provider, MAX_RESULTS};

/// Binds a provider to the rendering engine used for its result pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEngine {
    /// The provider.
    pub provider: Provider,
    /// Engine kind used when this provider renders.
    pub engine: EngineKind,
}

/// Configuration for searching and content extraction.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour. Missing fields in a serialized
/// config fall back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Providers in priority order.
    pub providers: Vec<Provider>,
    /// Result count used when a caller does not specify one.
    pub default_results: usize,
    /// Default per-operation timeout in milliseconds (provider request,
    /// page navigation, per-URL extraction).
    pub timeout_ms: u64,
    /// Maximum characters of extracted page text. 0 disables truncation.
    pub max_content_length: usize,
    /// Maximum concurrently live rendering contexts.
    pub max_pool_size: usize,
    /// How long an acquire may wait for a free rendering slot.
    pub pool_acquire_timeout_ms: u64,
    /// Rendering engine kinds that may be launched.
    pub enabled_engines: Vec<EngineKind>,
    /// Per-provider engine selection. Providers without an entry use the
    /// first enabled engine.
    pub provider_engines: Vec<ProviderEngine>,
    /// Consecutive lightweight failures for a host before extraction goes
    /// straight to rendering.
    pub lightweight_failure_threshold: u32,
    /// Seconds before a host that forced rendering gets another lightweight attempt.
    pub strategy_cooldown_secs: u64,
    /// Consecutive failures before a provider is skipped.
    pub provider_failure_threshold: u32,
    /// Seconds a tripped provider is skipped.
    pub provider_cooldown_secs: u64,
    /// Whether the relevance scorer gates provider lists.
    pub relevance_checking: bool,
    /// Minimum list score for acceptance.
    pub relevance_threshold: f64,
    /// Query every provider and keep the best-scoring list.
    pub exhaustive: bool,
    /// Return the best rejected list instead of failing when nothing is accepted.
    pub degraded_fallback: bool,
    /// Per-request cap on concurrent page extractions.
    pub extraction_concurrency: usize,
    /// Largest response body the lightweight path will read.
    pub max_response_bytes: u64,
    /// How long accepted responses are cached in seconds. 0 disables caching.
    pub cache_ttl_seconds: u64,
    /// Random pause range in milliseconds `(min, max)` used to pace
    /// simulated scrolling in rendered sessions.
    pub human_delay_ms: (u64, u64),
    /// Custom User-Agent string. If `None`, rotates through a built-in list.
    pub user_agent: Option<String>,
    /// Request safe-search filtering where a provider supports it.
    pub safe_search: bool,
    /// Budget for the coordinated shutdown in milliseconds.
    pub shutdown_timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            providers: Provider::all().to_vec(),
            default_results: 5,
            timeout_ms: 8_000,
            max_content_length: 100_000,
            max_pool_size: 3,
            pool_acquire_timeout_ms: 5_000,
            enabled_engines: vec![EngineKind::Chromium],
            provider_engines: vec![
                ProviderEngine {
                    provider: Provider::Bing,
                    engine: EngineKind::Chromium,
                },
                ProviderEngine {
                    provider: Provider::Brave,
                    engine: EngineKind::Chrome,
                },
            ],
            lightweight_failure_threshold: 2,
            strategy_cooldown_secs: 300,
            provider_failure_threshold: 3,
            provider_cooldown_secs: 60,
            relevance_checking: true,
            relevance_threshold: 0.3,
            exhaustive: false,
            degraded_fallback: true,
            extraction_concurrency: 4,
            max_response_bytes: 5 * 1024 * 1024,
            cache_ttl_seconds: 600,
            human_delay_ms: (150, 600),
            user_agent: None,
            safe_search: true,
            shutdown_timeout_ms: 5_000,
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.providers.is_empty() {
            return Err(SearchError::Config(
                "at least one provider must be enabled".into(),
            ));
        }
        if self.default_results == 0 || self.default_results > MAX_RESULTS {
            return Err(SearchError::Config(format!(
                "default_results must be between 1 and {MAX_RESULTS}"
            )));
        }
        if self.timeout_ms == 0 {
            return Err(SearchError::Config(
                "timeout_ms must be greater than 0".into(),
            ));
        }
        if self.max_pool_size == 0 {
            return Err(SearchError::Config(
                "max_pool_size must be greater than 0".into(),
            ));
        }
        if self.enabled_engines.is_empty() {
            return Err(SearchError::Config(
                "at least one rendering engine must be enabled".into(),
            ));
        }
        if self.extraction_concurrency == 0 {
            return Err(SearchError::Config(
                "extraction_concurrency must be greater than 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            return Err(SearchError::Config(
                "relevance_threshold must be within [0, 1]".into(),
            ));
        }
        if self.human_delay_ms.0 > self.human_delay_ms.1 {
            return Err(SearchError::Config(
                "human_delay_ms min must be <= max".into(),
            ));
        }
        Ok(())
    }

    /// Default per-operation timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Overall budget for one page extraction: a lightweight attempt
    /// followed by a rendered attempt, each bounded by [`timeout`](Self::timeout).
    pub fn extraction_timeout(&self) -> Duration {
        self.timeout() * 2
    }

    /// Engine kind a provider renders with, honouring `enabled_engines`.
    pub fn engine_for(&self, provider: Provider) -> EngineKind {
        self.provider_engines
            .iter()
            .find(|pe| pe.provider == provider)
            .map(|pe| pe.engine)
            .filter(|engine| self.enabled_engines.contains(engine))
            .or_else(|| self.enabled_engines.first().copied())
            .unwrap_or_default()
    }

    /// Engine kind used for page extraction.
    pub fn extraction_engine(&self) -> EngineKind {
        self.enabled_engines.first().copied().unwrap_or_default()
    }
}

//! # websift-search
//!
//! Keyless web search with page content extraction.
//!
//! Results come from public search providers (Bing, Brave, DuckDuckGo)
//! without API keys. Providers are tried in priority order and the first
//! list that passes a relevance check is returned, tagged with its
//! provider; lists from different providers are never merged. Each result
//! page is then fetched with a plain HTTP request, falling back to a
//! headless Chromium-family browser drawn from a small bounded pool when
//! the fast path is blocked or returns too little text.
//!
//! ## Design
//!
//! - Strict provider fallback with relevance gating and a degraded fallback
//! - Per-provider and per-host circuit breakers
//! - One shared rendering pool with isolated incognito contexts
//! - Concurrent extraction under a per-request cap and a per-URL timeout
//! - Response cache with configurable TTL
//! - Every failure is absorbed into per-item status and a summary; a
//!   request fails only when no provider produced any list
//!
//! ## Security
//!
//! - No API keys or secrets to leak
//! - No network listeners; this is a library, not a server
//! - Search queries are logged only at trace level
//!
//! # Examples
//!
//! ```no_run
//! # async fn example() -> websift_search::Result<()> {
//! use websift_search::{SearchConfig, WebSearcher};
//!
//! let searcher = WebSearcher::new(SearchConfig::default())?;
//! let response = searcher.search_and_extract("rust ownership", 3, Some(2_000)).await?;
//! for item in &response.results {
//!     println!("{} [{:?}]", item.result.url, item.status);
//! }
//! println!("{}", response.summary);
//! searcher.close_all().await;
//! # Ok(())
//! # }
//! ```

pub mod bot;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod content;
pub mod error;
pub mod failure;
pub mod http;
pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod render;
pub mod searcher;
pub mod summary;
pub mod types;

pub use config::{ProviderEngine, SearchConfig};
pub use content::{BatchReport, ContentExtractor};
pub use error::{Result, SearchError};
pub use failure::FailureCategory;
pub use orchestrator::SearchOrchestrator;
pub use provider::{ProviderOutcome, ResultProvider};
pub use providers::{ProviderAdapter, ProviderEnv};
pub use render::{Engine, EngineKind, EngineLauncher, RenderPool, RenderSession, RenderingContext};
pub use searcher::{EnrichedResponse, WebSearcher};
pub use summary::StatusSummary;
pub use types::{
    EnrichedResult, ExtractionOutcome, FailureRecord, FetchFailure, FetchStatus, Provider,
    ResultQuality, SearchQuery, SearchResponse, SearchResult, MAX_RESULTS,
};

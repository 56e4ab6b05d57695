//! Provider adapter implementations.
//!
//! Each module provides a struct implementing
//! [`crate::provider::ResultProvider`] for one provider, plus a pure
//! `parse_*_html` function tested against inline markup. [`ProviderAdapter`]
//! is the closed set of variants the orchestrator iterates over.

pub mod bing;
pub mod brave;
pub mod duckduckgo;

use std::sync::Arc;

use scraper::{ElementRef, Selector};

pub use bing::BingProvider;
pub use brave::BraveProvider;
pub use duckduckgo::DuckDuckGoProvider;

use crate::bot;
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;
use crate::orchestrator::url_normalize::host_of;
use crate::provider::ResultProvider;
use crate::render::{self, RenderPool};
use crate::types::{Provider, SearchQuery, SearchResult};

/// Shared collaborators handed to every provider adapter.
#[derive(Debug, Clone)]
pub struct ProviderEnv {
    /// HTTP client for lightweight requests.
    pub client: reqwest::Client,
    /// Rendering pool for rendered requests.
    pub pool: RenderPool,
    /// Search configuration.
    pub config: Arc<SearchConfig>,
}

impl ProviderEnv {
    /// Render `url` on the engine configured for `provider` and check the
    /// result for a challenge page.
    pub(crate) async fn render(&self, provider: Provider, url: &str) -> Result<String, SearchError> {
        tracing::debug!(%provider, "rendering result page");
        let html = render::render_page(
            &self.pool,
            self.config.engine_for(provider),
            url,
            self.config.timeout(),
            self.config.human_delay_ms,
        )
        .await?;
        if let Some(signature) = bot::bot_signature(200, &html) {
            return Err(SearchError::BotDetected(format!("{provider}: {signature}")));
        }
        Ok(html)
    }
}

/// Send a lightweight request and return the body, treating blocking
/// statuses and challenge pages as bot detection.
pub(crate) async fn fetch_lightweight(
    provider: Provider,
    request: reqwest::RequestBuilder,
) -> Result<String, SearchError> {
    let response = request.send().await.map_err(|e| {
        let detail = http::describe_error(&e);
        if e.is_timeout() {
            SearchError::Timeout(format!("{provider}: {detail}"))
        } else {
            SearchError::Http(format!("{provider}: {detail}"))
        }
    })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| SearchError::Http(format!("{provider}: {}", http::describe_error(&e))))?;
    tracing::trace!(%provider, bytes = body.len(), status = status.as_u16(), "provider response received");

    if let Some(signature) = bot::bot_signature(status.as_u16(), &body) {
        return Err(SearchError::BotDetected(format!("{provider}: {signature}")));
    }
    if !status.is_success() {
        return Err(SearchError::Http(format!("{provider} returned HTTP {status}")));
    }
    Ok(body)
}

/// Parser signature shared by every provider module.
pub(crate) type ParseFn = fn(&str, usize) -> Result<Vec<SearchResult>, SearchError>;

/// The lightweight-first fetch profile: plain HTTP, falling back to a
/// rendered load of `render_url` when the request fails, is blocked, or
/// parses to nothing.
pub(crate) async fn lightweight_then_render(
    env: &ProviderEnv,
    provider: Provider,
    request: reqwest::RequestBuilder,
    render_url: &str,
    max_results: usize,
    parse: ParseFn,
) -> Result<Vec<SearchResult>, SearchError> {
    match fetch_lightweight(provider, request).await {
        Ok(body) => match parse(&body, max_results) {
            Ok(results) if !results.is_empty() => return Ok(results),
            Ok(_) => tracing::debug!(%provider, "lightweight page had no results, rendering"),
            Err(e) => tracing::debug!(%provider, error = %e, "lightweight parse failed, rendering"),
        },
        Err(e) => tracing::debug!(%provider, error = %e, "lightweight fetch failed, rendering"),
    }

    let html = env.render(provider, render_url).await?;
    parse(&html, max_results)
}

/// Compile a CSS selector, mapping failures to [`SearchError::Parse`].
pub(crate) fn selector(css: &str) -> Result<Selector, SearchError> {
    Selector::parse(css).map_err(|e| SearchError::Parse(format!("invalid selector {css:?}: {e:?}")))
}

/// Whitespace-collapsed text of an element.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Accept `url` as an organic result target: absolute http(s) and not
/// pointing back at the provider itself.
pub(crate) fn organic_url(url: &str, provider: Provider) -> Option<String> {
    let host = host_of(url)?;
    let own = provider
        .own_hosts()
        .iter()
        .any(|h| host == *h || host.ends_with(&format!(".{h}")));
    (!own).then(|| url.to_owned())
}

/// The closed set of provider adapters.
#[derive(Debug, Clone)]
pub enum ProviderAdapter {
    /// Bing, always rendered.
    Bing(BingProvider),
    /// Brave Search, lightweight first.
    Brave(BraveProvider),
    /// DuckDuckGo HTML endpoint, lightweight first.
    DuckDuckGo(DuckDuckGoProvider),
}

impl ProviderAdapter {
    /// Build the adapter for `provider` against its public endpoint.
    pub fn new(provider: Provider, env: ProviderEnv) -> Self {
        match provider {
            Provider::Bing => Self::Bing(BingProvider::new(env)),
            Provider::Brave => Self::Brave(BraveProvider::new(env)),
            Provider::DuckDuckGo => Self::DuckDuckGo(DuckDuckGoProvider::new(env)),
        }
    }

    /// Adapters for every provider in `config.providers`, in order.
    pub fn chain(env: &ProviderEnv) -> Vec<Self> {
        env.config
            .providers
            .iter()
            .map(|p| Self::new(*p, env.clone()))
            .collect()
    }
}

impl ResultProvider for ProviderAdapter {
    fn provider(&self) -> Provider {
        match self {
            Self::Bing(_) => Provider::Bing,
            Self::Brave(_) => Provider::Brave,
            Self::DuckDuckGo(_) => Provider::DuckDuckGo,
        }
    }

    fn endpoint(&self) -> &str {
        match self {
            Self::Bing(p) => p.endpoint(),
            Self::Brave(p) => p.endpoint(),
            Self::DuckDuckGo(p) => p.endpoint(),
        }
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SearchError> {
        match self {
            Self::Bing(p) => p.search(query).await,
            Self::Brave(p) => p.search(query).await,
            Self::DuckDuckGo(p) => p.search(query).await,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organic_url_rejects_own_hosts_and_non_web() {
        assert_eq!(
            organic_url("https://www.rust-lang.org/", Provider::Bing).as_deref(),
            Some("https://www.rust-lang.org/")
        );
        assert!(organic_url("https://www.bing.com/images/search?q=x", Provider::Bing).is_none());
        assert!(organic_url("https://search.brave.com/news", Provider::Brave).is_none());
        assert!(organic_url("/relative", Provider::DuckDuckGo).is_none());
        assert!(organic_url("javascript:void(0)", Provider::DuckDuckGo).is_none());
    }

    #[test]
    fn element_text_collapses_whitespace() {
        let html = scraper::Html::parse_fragment("<p>  Rust \n\t <b>ownership</b>  </p>");
        let p = selector("p").expect("selector");
        let el = html.select(&p).next().expect("p");
        assert_eq!(element_text(el), "Rust ownership");
    }

    #[test]
    fn adapter_chain_follows_config_order() {
        let (env, _) = testing::env_rendering(
            "",
            SearchConfig {
                providers: vec![Provider::DuckDuckGo, Provider::Bing],
                ..Default::default()
            },
        );
        let chain = ProviderAdapter::chain(&env);
        let providers: Vec<Provider> = chain.iter().map(|a| a.provider()).collect();
        assert_eq!(providers, vec![Provider::DuckDuckGo, Provider::Bing]);
    }

    #[test]
    fn adapter_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProviderAdapter>();
    }
}

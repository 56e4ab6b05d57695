//! Brave Search adapter. Lightweight first.
//!
//! Brave has its own crawler and index, which makes it a useful second
//! opinion next to Bing. Its server-rendered result page is usually served
//! to plain HTTP clients; rate limiting triggers the rendered fallback.

use scraper::Html;
use url::Url;

use super::{element_text, lightweight_then_render, organic_url, selector, ProviderEnv};
use crate::error::SearchError;
use crate::provider::ResultProvider;
use crate::types::{Provider, SearchQuery, SearchResult};

const ENDPOINT: &str = "https://search.brave.com/search";

/// Brave Search adapter.
#[derive(Debug, Clone)]
pub struct BraveProvider {
    env: ProviderEnv,
    endpoint: String,
}

impl BraveProvider {
    /// Adapter against the public endpoint.
    pub fn new(env: ProviderEnv) -> Self {
        Self::with_endpoint(env, ENDPOINT)
    }

    /// Adapter against a custom endpoint.
    pub fn with_endpoint(env: ProviderEnv, endpoint: impl Into<String>) -> Self {
        Self {
            env,
            endpoint: endpoint.into(),
        }
    }

    fn search_url(&self, query: &SearchQuery) -> Result<Url, SearchError> {
        let safe = if self.env.config.safe_search {
            "strict"
        } else {
            "off"
        };
        Url::parse_with_params(
            &self.endpoint,
            &[("q", query.text()), ("source", "web"), ("safesearch", safe)],
        )
        .map_err(|e| SearchError::Config(format!("invalid Brave endpoint: {e}")))
    }
}

impl ResultProvider for BraveProvider {
    fn provider(&self) -> Provider {
        Provider::Brave
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SearchError> {
        tracing::trace!(query = query.text(), "Brave search");
        let url = self.search_url(query)?;
        let request = self.env.client.get(url.as_str());
        lightweight_then_render(
            &self.env,
            Provider::Brave,
            request,
            url.as_str(),
            query.count(),
            parse_brave_html,
        )
        .await
    }
}

/// Parse a Brave Search results page. Only `data-type="web"` snippets are
/// organic; ads, news clusters and discussions carry other types.
pub(crate) fn parse_brave_html(html: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
    let document = Html::parse_document(html);

    let result_sel = selector(r#".snippet[data-type="web"]"#)?;
    let link_sel = selector("a[href]")?;
    let title_sel = selector(".title, .snippet-title, .search-snippet-title")?;
    let description_sel = selector(".snippet-description, .snippet-content, .generic-snippet .content")?;

    let mut results = Vec::new();

    for element in document.select(&result_sel) {
        let Some(link) = element.select(&link_sel).next() else {
            continue;
        };
        let Some(url) = link
            .value()
            .attr("href")
            .and_then(|href| organic_url(href, Provider::Brave))
        else {
            continue;
        };

        let title = element
            .select(&title_sel)
            .next()
            .map(element_text)
            .unwrap_or_else(|| element_text(link));
        if title.is_empty() {
            continue;
        }

        let description = element
            .select(&description_sel)
            .next()
            .map(element_text)
            .unwrap_or_default();

        results.push(SearchResult::new(title, url, description, Provider::Brave));
        if results.len() >= max_results {
            break;
        }
    }

    tracing::debug!(count = results.len(), "Brave results parsed");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::providers::testing::env_rendering;
    use std::sync::atomic::Ordering;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MOCK_BRAVE_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<div id="results">
  <div class="snippet" data-type="ad">
    <a href="https://ads.example.com/"><div class="title">Rust Hosting Sale</div></a>
  </div>
  <div class="snippet" data-type="web" data-pos="1">
    <a href="https://www.rust-lang.org/"><div class="title">Rust Programming Language</div></a>
    <div class="snippet-description">A language empowering everyone to build reliable and efficient software.</div>
  </div>
  <div class="snippet" data-type="web" data-pos="2">
    <a href="https://doc.rust-lang.org/book/"><div class="title">The Rust Programming Language</div></a>
    <div class="snippet-content">An introductory book about Rust.</div>
  </div>
  <div class="snippet" data-type="web" data-pos="3">
    <a href="/search?q=rust&amp;offset=1"><div class="title">More results</div></a>
  </div>
  <div class="snippet" data-type="news">
    <a href="https://news.example.com/rust"><div class="title">Rust news</div></a>
  </div>
  <div class="snippet" data-type="web" data-pos="4">
    <a href="https://en.wikipedia.org/wiki/Rust_(programming_language)"><div class="title">Rust (programming language) - Wikipedia</div></a>
    <div class="snippet-description">Rust is a general-purpose programming language.</div>
  </div>
</div>
</body>
</html>"#;

    #[test]
    fn parse_mock_html_keeps_only_web_results() {
        let results = parse_brave_html(MOCK_BRAVE_HTML, 10).expect("should parse");
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title, "Rust Programming Language");
        assert_eq!(results[0].url, "https://www.rust-lang.org/");
        assert!(results[0].description.contains("reliable"));
        assert_eq!(results[1].description, "An introductory book about Rust.");
        assert!(results[2].url.contains("wikipedia.org"));
        assert!(results.iter().all(|r| r.provider == Provider::Brave));
    }

    #[test]
    fn parse_respects_max_results() {
        assert_eq!(parse_brave_html(MOCK_BRAVE_HTML, 1).expect("parse").len(), 1);
    }

    #[test]
    fn parse_empty_html_returns_empty() {
        assert!(parse_brave_html("<html></html>", 10).expect("parse").is_empty());
    }

    #[tokio::test]
    async fn lightweight_request_carries_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "rust lang"))
            .and(query_param("safesearch", "strict"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MOCK_BRAVE_HTML))
            .expect(1)
            .mount(&server)
            .await;

        let (env, stats) = env_rendering("", SearchConfig::default());
        let provider = BraveProvider::with_endpoint(env, format!("{}/search", server.uri()));
        let query = SearchQuery::new("rust lang", 3).expect("query");

        let results = provider.search(&query).await.expect("results");
        assert_eq!(results.len(), 3);
        assert_eq!(stats.navigations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rate_limited_falls_back_to_rendering() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let (env, stats) = env_rendering(MOCK_BRAVE_HTML, SearchConfig::default());
        let provider = BraveProvider::with_endpoint(env, format!("{}/search", server.uri()));
        let query = SearchQuery::new("rust", 2).expect("query");

        let results = provider.search(&query).await.expect("rendered");
        assert_eq!(results.len(), 2);
        assert_eq!(stats.navigations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[ignore] // Live test: run with `cargo test -- --ignored`
    async fn live_brave_search() {
        let config = SearchConfig::default();
        let pool = crate::render::RenderPool::new(
            std::sync::Arc::new(crate::render::chromium::ChromiumLauncher::new(None)),
            1,
            config.enabled_engines.clone(),
            config.timeout(),
        );
        let env = ProviderEnv {
            client: crate::http::build_client(&config).expect("client"),
            pool: pool.clone(),
            config: std::sync::Arc::new(config),
        };
        let query = SearchQuery::new("rust programming language", 5).expect("query");
        let results = BraveProvider::new(env).search(&query).await;
        pool.close_all().await;
        assert!(!results.expect("live search").is_empty());
    }
}

//! DuckDuckGo adapter. Lightweight first.
//!
//! Uses the HTML-only endpoint at `https://html.duckduckgo.com/html/`,
//! which needs no JavaScript and tolerates plain HTTP clients most of the
//! time. When it serves a challenge instead, the same page is rendered.

use scraper::Html;
use url::Url;

use super::{element_text, lightweight_then_render, organic_url, selector, ProviderEnv};
use crate::error::SearchError;
use crate::provider::ResultProvider;
use crate::types::{Provider, SearchQuery, SearchResult};

const ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// DuckDuckGo HTML adapter.
#[derive(Debug, Clone)]
pub struct DuckDuckGoProvider {
    env: ProviderEnv,
    endpoint: String,
}

impl DuckDuckGoProvider {
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

    fn params<'a>(&self, query: &'a SearchQuery) -> Vec<(&'static str, &'a str)> {
        let mut params = vec![("q", query.text())];
        // kp=1 strict, kp=-2 off.
        params.push(("kp", if self.env.config.safe_search { "1" } else { "-2" }));
        params
    }
}

impl ResultProvider for DuckDuckGoProvider {
    fn provider(&self) -> Provider {
        Provider::DuckDuckGo
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SearchError> {
        tracing::trace!(query = query.text(), "DuckDuckGo search");
        let params = self.params(query);

        let request = self.env.client.post(&self.endpoint).form(&params);
        let render_url = Url::parse_with_params(&self.endpoint, &params)
            .map_err(|e| SearchError::Config(format!("invalid DuckDuckGo endpoint: {e}")))?;

        lightweight_then_render(
            &self.env,
            Provider::DuckDuckGo,
            request,
            render_url.as_str(),
            query.count(),
            parse_duckduckgo_html,
        )
        .await
    }
}

/// Extract the target URL from DuckDuckGo's redirect wrapper.
///
/// DDG wraps links as `//duckduckgo.com/l/?uddg=<percent-encoded>&rut=...`.
fn extract_url(href: &str) -> Option<String> {
    let full_href = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&full_href).ok()?;
    let is_ddg = parsed
        .host_str()
        .is_some_and(|h| h == "duckduckgo.com" || h.ends_with(".duckduckgo.com"));

    if is_ddg && parsed.path().starts_with("/l/") {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned())
    } else {
        Some(full_href)
    }
}

/// Parse a DuckDuckGo HTML results page, skipping ads and malformed
/// entries.
pub(crate) fn parse_duckduckgo_html(
    html: &str,
    max_results: usize,
) -> Result<Vec<SearchResult>, SearchError> {
    let document = Html::parse_document(html);

    let result_sel = selector(".result.results_links:not(.result--ad), .web-result:not(.result--ad)")?;
    let title_sel = selector(".result__a")?;
    let snippet_sel = selector(".result__snippet")?;
    let ad_badge_sel = selector(".badge--ad")?;

    let mut results = Vec::new();

    for element in document.select(&result_sel) {
        if element.select(&ad_badge_sel).next().is_some() {
            continue;
        }
        let Some(title_el) = element.select(&title_sel).next() else {
            continue;
        };

        let title = element_text(title_el);
        if title.is_empty() {
            continue;
        }

        let Some(url) = title_el
            .value()
            .attr("href")
            .and_then(extract_url)
            .and_then(|u| organic_url(&u, Provider::DuckDuckGo))
        else {
            continue;
        };

        let description = element
            .select(&snippet_sel)
            .next()
            .map(element_text)
            .unwrap_or_default();

        results.push(SearchResult::new(title, url, description, Provider::DuckDuckGo));
        if results.len() >= max_results {
            break;
        }
    }

    tracing::debug!(count = results.len(), "DuckDuckGo results parsed");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::providers::testing::env_rendering;
    use std::sync::atomic::Ordering;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MOCK_DDG_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<div class="result results_links results_links_deep web-result result--ad">
    <a class="result__a" href="https://duckduckgo.com/y.js?ad_provider=bingv7aa">Rust Hosting Deals</a>
</div>
<div class="result results_links results_links_deep web-result">
    <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc123">
        Rust Programming Language
    </a>
    <div class="result__snippet">
        A language empowering everyone to build reliable and efficient software.
    </div>
</div>
<div class="result results_links results_links_deep web-result">
    <a class="result__a" href="https://doc.rust-lang.org/book/">
        The Rust Programming Language Book
    </a>
    <div class="result__snippet">An introductory book about Rust.</div>
</div>
<div class="result results_links results_links_deep web-result">
    <a class="result__a">No link here</a>
</div>
<div class="result results_links results_links_deep web-result">
    <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fen.wikipedia.org%2Fwiki%2FRust_(programming_language)&amp;rut=def456">
        Rust (programming language) - Wikipedia
    </a>
    <div class="result__snippet">Rust is a multi-paradigm, general-purpose programming language.</div>
</div>
</body>
</html>"#;

    #[test]
    fn extract_url_from_ddg_redirect() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fpage&rut=abc";
        assert_eq!(
            extract_url(href).as_deref(),
            Some("https://example.com/page")
        );
    }

    #[test]
    fn extract_url_direct_and_invalid() {
        assert_eq!(
            extract_url("https://example.com/direct").as_deref(),
            Some("https://example.com/direct")
        );
        assert!(extract_url("not-a-url").is_none());
    }

    #[test]
    fn parse_mock_html_skips_ads_and_malformed() {
        let results = parse_duckduckgo_html(MOCK_DDG_HTML, 10).expect("should parse");
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title, "Rust Programming Language");
        assert_eq!(results[0].url, "https://www.rust-lang.org/");
        assert!(results[0].description.contains("reliable and efficient"));
        assert_eq!(results[0].provider, Provider::DuckDuckGo);
        assert_eq!(results[1].url, "https://doc.rust-lang.org/book/");
        assert!(results[2].url.contains("wikipedia.org"));
    }

    #[test]
    fn parse_respects_max_results() {
        assert_eq!(
            parse_duckduckgo_html(MOCK_DDG_HTML, 2).expect("parse").len(),
            2
        );
    }

    #[test]
    fn parse_empty_html_returns_empty() {
        assert!(parse_duckduckgo_html("<html><body></body></html>", 10)
            .expect("parse")
            .is_empty());
    }

    #[tokio::test]
    async fn lightweight_success_skips_rendering() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/html/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MOCK_DDG_HTML))
            .mount(&server)
            .await;

        let (env, stats) = env_rendering("", SearchConfig::default());
        let provider = DuckDuckGoProvider::with_endpoint(env, format!("{}/html/", server.uri()));
        let query = SearchQuery::new("rust", 5).expect("query");

        let results = provider.search(&query).await.expect("results");
        assert_eq!(results.len(), 3);
        assert_eq!(stats.navigations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blocked_lightweight_falls_back_to_rendering() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
            .mount(&server)
            .await;

        let (env, stats) = env_rendering(MOCK_DDG_HTML, SearchConfig::default());
        let provider = DuckDuckGoProvider::with_endpoint(env, format!("{}/html/", server.uri()));
        let query = SearchQuery::new("rust", 5).expect("query");

        let results = provider.search(&query).await.expect("rendered results");
        assert_eq!(results.len(), 3);
        assert_eq!(stats.navigations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn both_paths_failing_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let (env, _) = env_rendering("<html><body></body></html>", SearchConfig::default());
        let provider = DuckDuckGoProvider::with_endpoint(env, format!("{}/html/", server.uri()));
        let query = SearchQuery::new("rust", 5).expect("query");

        let outcome = provider.fetch_results(&query).await;
        assert!(outcome.results.is_empty());
        assert!(outcome.failure.is_some());
    }

    #[tokio::test]
    #[ignore] // Live test: run with `cargo test -- --ignored`
    async fn live_duckduckgo_search() {
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
        let results = DuckDuckGoProvider::new(env).search(&query).await;
        pool.close_all().await;
        assert!(!results.expect("live search").is_empty());
    }
}

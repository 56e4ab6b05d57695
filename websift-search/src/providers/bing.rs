//! Bing adapter. Always rendered.
//!
//! Bing blocks plain HTTP clients aggressively, so its result page is
//! always loaded through the rendering pool. Result links are frequently
//! wrapped in a `/ck/a` click-tracking redirect whose `u` parameter holds
//! the target as `a1` + URL-safe base64.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use scraper::Html;
use url::Url;

use super::{element_text, organic_url, selector, ProviderEnv};
use crate::error::SearchError;
use crate::provider::ResultProvider;
use crate::types::{Provider, SearchQuery, SearchResult};

const ENDPOINT: &str = "https://www.bing.com/search";

/// Bing result-page adapter.
#[derive(Debug, Clone)]
pub struct BingProvider {
    env: ProviderEnv,
    endpoint: String,
}

impl BingProvider {
    /// Adapter against the public Bing endpoint.
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
        let adult = if self.env.config.safe_search {
            "Strict"
        } else {
            "Off"
        };
        let count = query.count().to_string();
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("q", query.text()),
                ("setlang", "en"),
                ("count", count.as_str()),
                ("adlt", adult),
            ],
        )
        .map_err(|e| SearchError::Config(format!("invalid Bing endpoint: {e}")))
    }
}

impl ResultProvider for BingProvider {
    fn provider(&self) -> Provider {
        Provider::Bing
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SearchError> {
        tracing::trace!(query = query.text(), "Bing search");
        let url = self.search_url(query)?;
        let html = self.env.render(Provider::Bing, url.as_str()).await?;
        parse_bing_html(&html, query.count())
    }
}

/// Resolve a Bing result href to its target URL.
///
/// Click-tracking links (`bing.com/ck/a?...&u=a1<base64>`) are decoded;
/// direct links pass through.
fn unwrap_bing_href(href: &str) -> Option<String> {
    let parsed = Url::parse(href).ok()?;
    let is_bing = parsed
        .host_str()
        .is_some_and(|h| h == "bing.com" || h.ends_with(".bing.com"));
    if !(is_bing && parsed.path().starts_with("/ck/")) {
        return Some(href.to_owned());
    }

    let encoded = parsed
        .query_pairs()
        .find(|(key, _)| key == "u")
        .map(|(_, value)| value.into_owned())?;
    let payload = encoded.strip_prefix("a1").unwrap_or(&encoded);
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    String::from_utf8(bytes).ok()
}

/// Parse a Bing result page into results, skipping ads and malformed
/// entries.
pub(crate) fn parse_bing_html(html: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
    let document = Html::parse_document(html);

    // Organic results are li.b_algo; ads live in li.b_ad blocks.
    let result_sel = selector("li.b_algo")?;
    let title_link_sel = selector("h2 a[href]")?;
    let snippet_sel = selector(".b_caption p, .b_lineclamp2, .b_lineclamp3, .b_algoSlug")?;
    let ad_marker_sel = selector(".b_adSlug, .b_adurl")?;

    let mut results = Vec::new();

    for element in document.select(&result_sel) {
        if element.select(&ad_marker_sel).next().is_some() {
            continue;
        }

        let Some(link) = element.select(&title_link_sel).next() else {
            continue;
        };
        let title = element_text(link);
        if title.is_empty() {
            continue;
        }

        let Some(url) = link
            .value()
            .attr("href")
            .and_then(unwrap_bing_href)
            .and_then(|u| organic_url(&u, Provider::Bing))
        else {
            continue;
        };

        let description = element
            .select(&snippet_sel)
            .next()
            .map(element_text)
            .unwrap_or_default();

        results.push(SearchResult::new(title, url, description, Provider::Bing));
        if results.len() >= max_results {
            break;
        }
    }

    tracing::debug!(count = results.len(), "Bing results parsed");
    Ok(results)
}

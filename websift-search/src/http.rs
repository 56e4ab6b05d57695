//! Shared HTTP clients with User-Agent rotation.
//!
//! Provides [`reqwest::Client`]s with browser-like headers, cookie support,
//! and rotating User-Agent strings so provider and page requests look like
//! an ordinary browser. A second, HTTP/1.1-only client serves as the
//! downgraded transport when protocol negotiation fails.

use crate::config::SearchConfig;
use crate::error::SearchError;
use rand::seq::SliceRandom;
use reqwest::header::{self, HeaderMap, HeaderValue};

/// Realistic browser User-Agent strings, rotated per client.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
];

/// Error text fragments that indicate the HTTP version negotiation failed
/// rather than the server being unreachable. Matched against
/// [`describe_error`] output, which never contains the URL.
const PROTOCOL_NEGOTIATION_MARKERS: &[&str] = &[
    "http2 error",
    "frame with invalid size",
    "use http/1.1 for request",
    "alpn",
    "noapplicationprotocol",
    "invalid http version parsed",
];

/// Build a [`reqwest::Client`] for provider and page requests.
///
/// The client has:
/// - Cookie store enabled (consent interstitials set cookies)
/// - Timeout from config
/// - Random User-Agent from built-in rotation list (or custom if configured)
/// - Browser-like `Accept` and `Accept-Language` headers
/// - Brotli and gzip decompression
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the client cannot be constructed.
pub fn build_client(config: &SearchConfig) -> Result<reqwest::Client, SearchError> {
    base_builder(config)
        .build()
        .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))
}

/// Build the downgraded transport: identical to [`build_client`] but
/// restricted to HTTP/1.1.
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the client cannot be constructed.
pub fn build_downgraded_client(config: &SearchConfig) -> Result<reqwest::Client, SearchError> {
    base_builder(config)
        .http1_only()
        .build()
        .map_err(|e| SearchError::Http(format!("failed to build HTTP/1.1 client: {e}")))
}

fn base_builder(config: &SearchConfig) -> reqwest::ClientBuilder {
    let ua = match config.user_agent {
        Some(ref custom) => custom.clone(),
        None => random_user_agent().to_owned(),
    };

    reqwest::Client::builder()
        .cookie_store(true)
        .timeout(config.timeout())
        .user_agent(ua)
        .default_headers(browser_headers())
        .redirect(reqwest::redirect::Policy::limited(10))
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers
}

/// Whether a transport error came from HTTP version negotiation, which a
/// retry over [`build_downgraded_client`] may fix.
pub fn is_protocol_negotiation_error(err: &reqwest::Error) -> bool {
    is_protocol_negotiation_failure(&describe_error(err))
}

/// [`is_protocol_negotiation_error`] over an already described error.
pub fn is_protocol_negotiation_failure(detail: &str) -> bool {
    let text = detail.to_lowercase();
    PROTOCOL_NEGOTIATION_MARKERS
        .iter()
        .any(|marker| text.contains(marker))
}

/// The kind of a request error followed by its source chain, so that causes
/// such as `dns error` or `connection refused` survive into failure records.
///
/// reqwest's own message embeds the request URL; it is left out so that
/// nothing matching on the text can be misled by the path or query.
pub fn describe_error(err: &reqwest::Error) -> String {
    let mut text = String::from(error_kind(err));
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

fn error_kind(err: &reqwest::Error) -> &'static str {
    if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "connection failed"
    } else if err.is_redirect() {
        "redirect failed"
    } else if err.is_body() {
        "reading body failed"
    } else if err.is_decode() {
        "decoding body failed"
    } else if err.is_builder() {
        "invalid request"
    } else {
        "request failed"
    }
}

/// Select a random User-Agent string from the rotation list.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS
        .choose(&mut rng)
        .copied()
        // USER_AGENTS is non-empty; choose only returns None on empty slices.
        .unwrap_or(USER_AGENTS[0])
}

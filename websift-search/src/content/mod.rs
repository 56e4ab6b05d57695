//! Page content extraction.
//!
//! Each URL goes through a small state machine:
//!
//! ```text
//! NotStarted ──► LightweightAttempted ──► RenderAttempted ──► Done
//!     │                                                        ▲
//!     └──────────── success / skipped / too large ─────────────┘
//! ```
//!
//! The lightweight path is a plain HTTP GET (retried over HTTP/1.1 when
//! protocol negotiation fails). A failure, a bot-detection signature, or
//! too little text moves the URL on to a rendered load through the shared
//! [`RenderPool`]. Hosts whose lightweight fetches keep failing skip
//! straight to rendering until a cooldown elapses. Thin text is kept and
//! returned if rendering cannot do better.

pub mod batch;
pub mod clean;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tokio_util::sync::CancellationToken;
use url::Url;

pub use batch::BatchReport;
pub use clean::{clean_html, truncate_chars, TRUNCATION_MARKER};

use crate::bot;
use crate::circuit_breaker::{BreakerPolicy, CircuitBreaker};
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;
use crate::orchestrator::url_normalize::host_of;
use crate::render::{self, RenderPool};
use crate::types::{EnrichedResult, ExtractionOutcome, FetchFailure, SearchResult};

/// Lightweight pages with less cleaned text than this are rendered instead.
pub const MIN_CONTENT_CHARS: usize = 200;

/// Path extensions of documents that are never fetched.
const NON_HTML_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "rtf", "zip", "gz", "tgz", "rar",
    "7z", "tar", "exe", "dmg", "iso", "mp3", "mp4", "avi", "mov", "wav", "png", "jpg", "jpeg",
    "gif", "webp", "svg",
];

/// Whether `url` points at a document that is not an HTML page, judged from
/// the URL alone.
pub fn is_non_html_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let path = parsed.path().to_ascii_lowercase();
    let by_extension = path
        .rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .is_some_and(|(_, ext)| NON_HTML_EXTENSIONS.contains(&ext));
    let pdf_route = path.contains("/pdf/");
    let pdf_query = parsed.query_pairs().any(|(key, value)| {
        matches!(key.as_ref(), "format" | "filetype" | "type") && value.eq_ignore_ascii_case("pdf")
    });
    by_extension || pdf_route || pdf_query
}

fn is_html_content_type(value: &str) -> bool {
    let mime = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.is_empty() || mime == "text/html" || mime == "application/xhtml+xml"
}

/// Where one URL is in the extraction state machine.
#[derive(Debug)]
enum Stage {
    NotStarted,
    /// The lightweight path failed or was skipped for this host. `thin`
    /// holds text from a page that loaded but said too little.
    LightweightAttempted {
        failure: Option<SearchError>,
        thin: Option<String>,
    },
    RenderAttempted {
        rendered: Result<String, SearchError>,
        lightweight_failure: Option<SearchError>,
        thin: Option<String>,
    },
    Done(Result<String, SearchError>),
}

struct ExtractorInner {
    client: reqwest::Client,
    downgraded: reqwest::Client,
    pool: RenderPool,
    config: Arc<SearchConfig>,
    hosts: CircuitBreaker<String>,
    shutdown: CancellationToken,
    closed: AtomicBool,
}

/// Fetches and cleans page content, one URL or a ranked batch at a time.
///
/// Cloning is cheap; clones share the HTTP clients, the host tracker and
/// the shutdown state.
#[derive(Clone)]
pub struct ContentExtractor {
    inner: Arc<ExtractorInner>,
}

impl std::fmt::Debug for ContentExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentExtractor")
            .field("pool", &self.inner.pool)
            .field("closed", &self.inner.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl ContentExtractor {
    /// Create an extractor rendering through `pool`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if an HTTP client cannot be built.
    pub fn new(config: Arc<SearchConfig>, pool: RenderPool) -> Result<Self, SearchError> {
        let client = http::build_client(&config)?;
        let downgraded = http::build_downgraded_client(&config)?;
        Ok(Self::with_clients(config, pool, client, downgraded))
    }

    fn with_clients(
        config: Arc<SearchConfig>,
        pool: RenderPool,
        client: reqwest::Client,
        downgraded: reqwest::Client,
    ) -> Self {
        let hosts = CircuitBreaker::new(BreakerPolicy {
            failure_threshold: config.lightweight_failure_threshold,
            cooldown: Duration::from_secs(config.strategy_cooldown_secs),
        });
        Self {
            inner: Arc::new(ExtractorInner {
                client,
                downgraded,
                pool,
                config,
                hosts,
                shutdown: CancellationToken::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Whether [`close_all`](Self::close_all) has run.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Fetch `url` and return its cleaned text.
    ///
    /// `max_content_length` truncates the text to that many characters and
    /// appends [`TRUNCATION_MARKER`]; `None` or `Some(0)` leaves it whole.
    ///
    /// # Errors
    ///
    /// - [`SearchError::NonHtml`] for documents that are not HTML pages
    /// - [`SearchError::ContentTooLarge`] when the body exceeds `max_response_bytes`
    /// - [`SearchError::BotDetected`], [`SearchError::Timeout`], [`SearchError::Http`]
    ///   or a rendering error when both paths fail
    /// - [`SearchError::ShutDown`] after [`close_all`](Self::close_all)
    pub async fn extract_content(
        &self,
        url: &str,
        max_content_length: Option<usize>,
    ) -> Result<String, SearchError> {
        if self.is_closed() {
            return Err(SearchError::ShutDown("content extractor"));
        }
        let text = self.run(url).await?;
        Ok(truncate_chars(text, max_content_length.unwrap_or(0)))
    }

    /// Extract one result under the per-URL timeout and move it to its
    /// terminal status.
    pub(crate) async fn extract_result(
        &self,
        result: SearchResult,
        max_content_length: Option<usize>,
    ) -> EnrichedResult {
        let enriched = EnrichedResult::pending(result);
        let budget = self.inner.config.extraction_timeout();
        let attempt = self.extract_content(&enriched.result.url, max_content_length);

        let outcome = match tokio::time::timeout(budget, attempt).await {
            Ok(Ok(text)) => ExtractionOutcome::Success(text),
            Ok(Err(SearchError::NonHtml(reason))) => ExtractionOutcome::Skipped(reason),
            Ok(Err(err)) => {
                tracing::debug!(url = %enriched.result.url, error = %err, "extraction failed");
                ExtractionOutcome::Failed(FetchFailure::from_error(&err))
            }
            Err(_) => {
                tracing::debug!(url = %enriched.result.url, "extraction timed out");
                ExtractionOutcome::Failed(FetchFailure::from_error(&SearchError::Timeout(format!(
                    "extraction exceeded {}ms",
                    budget.as_millis()
                ))))
            }
        };
        enriched.finish(outcome)
    }

    async fn run(&self, url: &str) -> Result<String, SearchError> {
        let mut stage = Stage::NotStarted;
        loop {
            stage = match stage {
                Stage::NotStarted => self.start(url).await,
                Stage::LightweightAttempted { failure, thin } => {
                    if self.inner.shutdown.is_cancelled() {
                        Stage::Done(Err(SearchError::ShutDown("content extractor")))
                    } else {
                        Stage::RenderAttempted {
                            rendered: self.render(url).await,
                            lightweight_failure: failure,
                            thin,
                        }
                    }
                }
                Stage::RenderAttempted {
                    rendered,
                    lightweight_failure,
                    thin,
                } => Stage::Done(keep_thin_on_failure(
                    url,
                    settle_rendered(url, rendered, lightweight_failure),
                    thin,
                )),
                Stage::Done(outcome) => return outcome,
            };
        }
    }

    async fn start(&self, url: &str) -> Stage {
        if is_non_html_url(url) {
            return Stage::Done(Err(SearchError::NonHtml(format!(
                "{url} is not an HTML page"
            ))));
        }
        let Some(host) = host_of(url) else {
            return Stage::Done(Err(SearchError::Parse(format!(
                "not an http(s) URL: {url}"
            ))));
        };

        if !self.inner.hosts.should_attempt(&host) {
            tracing::debug!(%host, "host forced to rendering");
            return Stage::LightweightAttempted {
                failure: None,
                thin: None,
            };
        }

        match self.fetch_lightweight(url).await {
            Ok(text) if text.chars().count() >= MIN_CONTENT_CHARS => {
                self.inner.hosts.record_success(&host);
                Stage::Done(Ok(text))
            }
            Ok(text) => {
                let chars = text.chars().count();
                tracing::debug!(url, chars, "lightweight page too thin, rendering");
                self.inner.hosts.record_failure(&host);
                Stage::LightweightAttempted {
                    failure: Some(SearchError::Parse(format!(
                        "insufficient content: {chars} characters"
                    ))),
                    thin: (!text.is_empty()).then_some(text),
                }
            }
            Err(err @ (SearchError::NonHtml(_) | SearchError::ContentTooLarge(_))) => {
                Stage::Done(Err(err))
            }
            Err(err) => {
                tracing::debug!(url, error = %err, "lightweight fetch failed, rendering");
                self.inner.hosts.record_failure(&host);
                Stage::LightweightAttempted {
                    failure: Some(err),
                    thin: None,
                }
            }
        }
    }

    async fn fetch_lightweight(&self, url: &str) -> Result<String, SearchError> {
        let response = match self.inner.client.get(url).send().await {
            Ok(response) => response,
            Err(err) if http::is_protocol_negotiation_error(&err) => {
                tracing::debug!(url, error = %err, "protocol negotiation failed, retrying over HTTP/1.1");
                self.inner
                    .downgraded
                    .get(url)
                    .send()
                    .await
                    .map_err(request_error)?
            }
            Err(err) => return Err(request_error(err)),
        };

        let status = response.status();
        if status.is_success() {
            if let Some(content_type) = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
            {
                if !is_html_content_type(content_type) {
                    return Err(SearchError::NonHtml(format!("{url} served {content_type}")));
                }
            }
        }

        let limit = self.inner.config.max_response_bytes;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(SearchError::ContentTooLarge(format!(
                "{url} is larger than {limit} bytes"
            )));
        }
        let body = read_limited(response, url, limit).await?;

        if let Some(signature) = bot::bot_signature(status.as_u16(), &body) {
            return Err(SearchError::BotDetected(format!("{url}: {signature}")));
        }
        if !status.is_success() {
            return Err(SearchError::Http(format!("HTTP {status}")));
        }

        Ok(clean_html(&body))
    }

    async fn render(&self, url: &str) -> Result<String, SearchError> {
        let config = &self.inner.config;
        render::render_page(
            &self.inner.pool,
            config.extraction_engine(),
            url,
            config.timeout(),
            config.human_delay_ms,
        )
        .await
    }

    /// Cancel in-flight batch work and shut down the rendering pool.
    /// Safe to call more than once.
    pub async fn close_all(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.shutdown.cancel();
        self.inner.pool.close_all().await;
        tracing::debug!("content extractor closed");
    }
}

/// Judge a rendered page. When rendering was unavailable or produced no
/// text, the lightweight failure is the more useful diagnosis.
fn settle_rendered(
    url: &str,
    rendered: Result<String, SearchError>,
    lightweight_failure: Option<SearchError>,
) -> Result<String, SearchError> {
    match rendered {
        Ok(html) => {
            if let Some(signature) = bot::bot_signature(200, &html) {
                return Err(SearchError::BotDetected(format!("{url}: {signature}")));
            }
            let text = clean_html(&html);
            if text.is_empty() {
                return Err(lightweight_failure.unwrap_or_else(|| {
                    SearchError::Parse(format!("no extractable content at {url}"))
                }));
            }
            Ok(text)
        }
        Err(err @ (SearchError::PoolUnavailable(_) | SearchError::PoolClosed | SearchError::Browser(_))) => {
            match lightweight_failure {
                Some(earlier) => {
                    tracing::debug!(url, error = %err, "rendering unavailable");
                    Err(earlier)
                }
                None => Err(err),
            }
        }
        Err(err) => Err(err),
    }
}

/// Thin lightweight text still beats a failed or empty render.
fn keep_thin_on_failure(
    url: &str,
    settled: Result<String, SearchError>,
    thin: Option<String>,
) -> Result<String, SearchError> {
    match (settled, thin) {
        (Err(err), Some(text)) => {
            tracing::debug!(url, error = %err, "rendering failed, keeping thin page text");
            Ok(text)
        }
        (settled, _) => settled,
    }
}

fn request_error(err: reqwest::Error) -> SearchError {
    let detail = http::describe_error(&err);
    if err.is_timeout() {
        SearchError::Timeout(detail)
    } else {
        SearchError::Http(detail)
    }
}

async fn read_limited(
    mut response: reqwest::Response,
    url: &str,
    limit: u64,
) -> Result<String, SearchError> {
    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(request_error)? {
        if (body.len() + chunk.len()) as u64 > limit {
            return Err(SearchError::ContentTooLarge(format!(
                "{url} is larger than {limit} bytes"
            )));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::render::pool::testing::{FakeLauncher, FakeStats};
    use crate::render::EngineKind;

    /// Extractor whose rendering pool serves `html`.
    pub fn extractor_rendering(html: &str, config: SearchConfig) -> (ContentExtractor, Arc<FakeStats>) {
        let launcher = FakeLauncher::serving(html);
        let stats = Arc::clone(&launcher.stats);
        let pool = RenderPool::new(
            Arc::new(launcher),
            config.max_pool_size,
            vec![EngineKind::Chromium],
            Duration::from_millis(500),
        );
        let config = SearchConfig {
            human_delay_ms: (0, 0),
            ..config
        };
        let extractor = ContentExtractor::new(Arc::new(config), pool).expect("extractor");
        (extractor, stats)
    }

    /// A page whose cleaned text comfortably passes the sufficiency check.
    pub fn article(topic: &str) -> String {
        format!(
            "<html><body><nav>Home | About</nav><article><h1>{topic}</h1><p>{}</p></article></body></html>",
            format!("{topic} is discussed at length in this paragraph. ").repeat(8)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{article, extractor_rendering};
    use super::*;
    use std::sync::atomic::Ordering;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn html(body: impl Into<String>) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.into().into_bytes(), "text/html; charset=utf-8")
    }

    #[test]
    fn non_html_urls_detected() {
        assert!(is_non_html_url("https://example.com/paper.pdf"));
        assert!(is_non_html_url("https://example.com/Report.PDF"));
        assert!(is_non_html_url("https://arxiv.org/pdf/2401.00001"));
        assert!(is_non_html_url("https://example.com/get?id=3&format=pdf"));
        assert!(is_non_html_url("https://example.com/archive.tar.gz"));
        assert!(!is_non_html_url("https://example.com/pdf-tools.html"));
        assert!(!is_non_html_url("https://example.com/docs/"));
        assert!(!is_non_html_url("https://example.com/v1.2/guide"));
    }

    #[test]
    fn html_content_types() {
        assert!(is_html_content_type("text/html; charset=utf-8"));
        assert!(is_html_content_type("application/xhtml+xml"));
        assert!(!is_html_content_type("application/pdf"));
        assert!(!is_html_content_type("application/json"));
    }

    #[tokio::test]
    async fn lightweight_success_skips_rendering() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ownership"))
            .respond_with(html(article("Ownership")))
            .mount(&server)
            .await;

        let (extractor, stats) = extractor_rendering("", SearchConfig::default());
        let text = extractor
            .extract_content(&format!("{}/ownership", server.uri()), None)
            .await
            .expect("content");
        assert!(text.starts_with("Ownership"));
        assert!(!text.contains("Home | About"));
        assert_eq!(stats.navigations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn pdf_is_skipped_without_fetching() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html(article("never")))
            .expect(0)
            .mount(&server)
            .await;

        let (extractor, stats) = extractor_rendering("", SearchConfig::default());
        let err = extractor
            .extract_content(&format!("{}/paper.pdf", server.uri()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::NonHtml(_)));
        assert_eq!(stats.navigations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_html_content_type_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"{}".to_vec(), "application/json"))
            .mount(&server)
            .await;

        let (extractor, _) = extractor_rendering("", SearchConfig::default());
        let err = extractor
            .extract_content(&format!("{}/api", server.uri()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::NonHtml(_)));
    }

    #[tokio::test]
    async fn blocked_fetch_falls_back_to_rendering() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
            .mount(&server)
            .await;

        let (extractor, stats) = extractor_rendering(&article("Rendered"), SearchConfig::default());
        let text = extractor
            .extract_content(&format!("{}/page", server.uri()), None)
            .await
            .expect("rendered content");
        assert!(text.starts_with("Rendered"));
        assert_eq!(stats.navigations.load(Ordering::SeqCst), 1);
        assert_eq!(stats.open_sessions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn thin_page_is_rendered() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html("<html><body><div id=\"app\">Loading...</div></body></html>"))
            .mount(&server)
            .await;

        let (extractor, stats) = extractor_rendering(&article("Hydrated"), SearchConfig::default());
        let text = extractor
            .extract_content(&format!("{}/spa", server.uri()), None)
            .await
            .expect("rendered content");
        assert!(text.contains("Hydrated"));
        assert_eq!(stats.navigations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn challenge_on_both_paths_is_bot_detection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let (extractor, _) = extractor_rendering(
            "<html><body>Please complete the captcha</body></html>",
            SearchConfig::default(),
        );
        let err = extractor
            .extract_content(&format!("{}/page", server.uri()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::BotDetected(_)));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html(article("Huge")))
            .mount(&server)
            .await;

        let (extractor, stats) = extractor_rendering(
            "",
            SearchConfig {
                max_response_bytes: 64,
                ..Default::default()
            },
        );
        let err = extractor
            .extract_content(&format!("{}/big", server.uri()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::ContentTooLarge(_)));
        assert_eq!(stats.navigations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_host_goes_straight_to_rendering() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let (extractor, stats) = extractor_rendering(
            &article("Rendered"),
            SearchConfig {
                lightweight_failure_threshold: 1,
                strategy_cooldown_secs: 600,
                ..Default::default()
            },
        );
        for page in ["one", "two"] {
            extractor
                .extract_content(&format!("{}/{page}", server.uri()), None)
                .await
                .expect("rendered");
        }
        assert_eq!(stats.navigations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unavailable_rendering_reports_lightweight_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let (extractor, _) = extractor_rendering("", SearchConfig::default());
        extractor.inner.pool.close_all().await;
        let err = extractor
            .extract_content(&format!("{}/page", server.uri()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::BotDetected(_)));
    }

    #[tokio::test]
    async fn truncation_applies_only_when_positive() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html(article("Ownership")))
            .mount(&server)
            .await;

        let (extractor, _) = extractor_rendering("", SearchConfig::default());
        let url = format!("{}/page", server.uri());

        let truncated = extractor.extract_content(&url, Some(50)).await.expect("content");
        assert!(truncated.ends_with(TRUNCATION_MARKER));
        assert_eq!(truncated.trim_end_matches(TRUNCATION_MARKER).chars().count(), 50);

        let whole = extractor.extract_content(&url, Some(0)).await.expect("content");
        assert!(!whole.contains("[Content truncated]"));
        assert!(whole.chars().count() > MIN_CONTENT_CHARS);
    }

    #[tokio::test]
    async fn closed_extractor_refuses_work() {
        let (extractor, stats) = extractor_rendering("", SearchConfig::default());
        extractor.close_all().await;
        extractor.close_all().await;
        let err = extractor
            .extract_content("https://example.com/", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::ShutDown(_)));
        assert_eq!(stats.launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn article_loading_captcha_widget_is_extracted() {
        let prose = "Write to the editors about any article and we read every message we receive. "
            .repeat(7);
        let page = format!(
            "<html><head><title>Contact the editors</title>\
             <script src=\"https://www.google.com/recaptcha/api.js\" async defer></script></head>\
             <body><article><h1>Contact the editors</h1><p>{prose}</p>\
             <form><div class=\"g-recaptcha\" data-sitekey=\"site-key\"></div></form>\
             </article></body></html>"
        );
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html(page))
            .mount(&server)
            .await;

        let (extractor, stats) = extractor_rendering("", SearchConfig::default());
        let text = extractor
            .extract_content(&format!("{}/contact", server.uri()), None)
            .await
            .expect("article content");
        assert!(text.contains("we read every message"));
        assert_eq!(stats.navigations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blocked_page_category_ignores_url_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let (extractor, _) = extractor_rendering(
            "<html><body>Please complete the captcha</body></html>",
            SearchConfig::default(),
        );
        let result = SearchResult::new(
            "Timeout settings".into(),
            format!("{}/guides/connection-timeout-settings", server.uri()),
            String::new(),
            crate::types::Provider::Brave,
        );
        let enriched = extractor.extract_result(result, None).await;
        assert_eq!(
            enriched.error.map(|e| e.category),
            Some(crate::failure::FailureCategory::BotDetection)
        );
    }

    #[tokio::test]
    async fn thin_page_kept_when_rendering_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html("<html><body><p>Opening hours: 9 to 5.</p></body></html>"))
            .mount(&server)
            .await;

        let (extractor, _) = extractor_rendering("", SearchConfig::default());
        extractor.inner.pool.close_all().await;
        let text = extractor
            .extract_content(&format!("{}/hours", server.uri()), None)
            .await
            .expect("thin text");
        assert_eq!(text, "Opening hours: 9 to 5.");
    }

    #[tokio::test]
    async fn thin_page_kept_when_render_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html("<html><body><p>Opening hours: 9 to 5.</p></body></html>"))
            .mount(&server)
            .await;

        let (extractor, stats) = extractor_rendering("<html><body></body></html>", SearchConfig::default());
        let text = extractor
            .extract_content(&format!("{}/hours", server.uri()), None)
            .await
            .expect("thin text");
        assert_eq!(text, "Opening hours: 9 to 5.");
        assert_eq!(stats.navigations.load(Ordering::SeqCst), 1);
    }

    /// Serves every connection a plain HTTP/1.1 response, whatever protocol
    /// the client opened with.
    async fn http1_only_server(body: String) -> std::net::SocketAddr {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let body = body.clone();
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 4096];
                    loop {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => {
                                request.extend_from_slice(&buf[..n]);
                                if request.windows(4).any(|w| w == b"\r\n\r\n") {
                                    break;
                                }
                            }
                        }
                    }
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.flush().await;
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn negotiation_failure_retries_over_http1() {
        let addr = http1_only_server(article("Downgraded")).await;

        let config = Arc::new(SearchConfig {
            human_delay_ms: (0, 0),
            ..Default::default()
        });
        let launcher = crate::render::pool::testing::FakeLauncher::serving("");
        let stats = Arc::clone(&launcher.stats);
        let pool = RenderPool::new(
            Arc::new(launcher),
            config.max_pool_size,
            vec![crate::render::EngineKind::Chromium],
            Duration::from_millis(500),
        );
        let h2_only = reqwest::Client::builder()
            .http2_prior_knowledge()
            .build()
            .unwrap();
        let downgraded = http::build_downgraded_client(&config).unwrap();
        let extractor = ContentExtractor::with_clients(config, pool, h2_only, downgraded);

        let text = extractor
            .extract_content(&format!("http://{addr}/page"), None)
            .await
            .expect("content over HTTP/1.1");
        assert!(text.starts_with("Downgraded"));
        assert_eq!(stats.navigations.load(Ordering::SeqCst), 0);
    }
}

//! URL canonicalisation and host helpers.
//!
//! Equivalent pages that differ only in scheme/host case, default port,
//! trailing slash, query-parameter order, tracking parameters, or fragment
//! normalise to the same string.

use url::Url;

/// Query parameters dropped during normalisation.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "msclkid",
    "ref",
    "si",
];

/// Normalise a URL for duplicate detection.
///
/// Unparseable input is returned unchanged.
///
/// # Examples
///
/// ```
/// use websift_search::orchestrator::url_normalize::normalize_url;
///
/// let a = normalize_url("https://Example.COM:443/docs/?b=2&a=1#intro");
/// let b = normalize_url("https://example.com/docs?a=1&b=2");
/// assert_eq!(a, b);
/// ```
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw) else {
        return raw.to_string();
    };

    parsed.set_fragment(None);

    if matches!(
        (parsed.scheme(), parsed.port()),
        ("http", Some(80)) | ("https", Some(443))
    ) {
        let _ = parsed.set_port(None);
    }

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.to_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort();

    if params.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(&params);
    }

    let path = parsed.path().to_string();
    if let Some(trimmed) = path.strip_suffix('/').filter(|p| !p.is_empty()) {
        parsed.set_path(trimmed);
    }

    parsed.to_string()
}

/// Lowercased host of an absolute http(s) URL, without a leading `www.`.
pub fn host_of(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").map(str::to_owned).unwrap_or(host))
}

/// Whether `raw` is an absolute http(s) URL with a host.
pub fn is_web_url(raw: &str) -> bool {
    host_of(raw).is_some()
}

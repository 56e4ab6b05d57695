//! Failure classification for diagnostics.
//!
//! Maps errors onto a small closed set of categories. Typed errors carry
//! their category (see [`SearchError::category`](crate::SearchError::category));
//! [`FailureCategory::classify`] handles free-form transport and browser
//! text, which must not include the target URL. Categories are for
//! reporting only; control flow never branches on them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Diagnostic category of a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureCategory {
    /// The operation ran out of time.
    Timeout,
    /// Access denied, rate limited, or challenged by bot detection.
    BotDetection,
    /// The target does not exist.
    NotFound,
    /// The response was larger than allowed.
    ContentTooLarge,
    /// TLS handshake, certificate, or protocol negotiation failure.
    Transport,
    /// Connection refused, reset, or otherwise unreachable.
    Network,
    /// The host name could not be resolved.
    NameResolution,
    /// Anything else.
    Other,
}

/// Ordered pattern table; the first matching row wins.
const PATTERNS: &[(FailureCategory, &[&str])] = &[
    (
        FailureCategory::Timeout,
        &["timeout", "timed out", "err_timed_out", "deadline has elapsed"],
    ),
    (
        FailureCategory::NameResolution,
        &[
            "dns error",
            "failed to lookup address",
            "name resolution",
            "name or service not known",
            "enotfound",
            "getaddrinfo",
            "no such host",
            "err_name_not_resolved",
        ],
    ),
    (
        FailureCategory::BotDetection,
        &[
            "bot detection",
            "captcha",
            "403",
            "429",
            "forbidden",
            "too many requests",
            "access denied",
            "unusual traffic",
        ],
    ),
    (
        FailureCategory::ContentTooLarge,
        &["content too large", "too large", "payload"],
    ),
    (
        FailureCategory::NotFound,
        &["404", "not found", "410 gone"],
    ),
    (
        FailureCategory::Transport,
        &[
            "ssl",
            "tls",
            "certificate",
            "handshake",
            "http2",
            "protocol error",
            "alpn",
            "err_cert_",
            "err_ssl_",
        ],
    ),
    (
        FailureCategory::Network,
        &[
            "connection refused",
            "connection reset",
            "connection closed",
            "error sending request",
            "network",
            "unreachable",
            "broken pipe",
            "err_connection_",
            "err_internet_disconnected",
        ],
    ),
];

impl FailureCategory {
    /// Categorise raw error text (case-insensitive substring match).
    pub fn classify(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        PATTERNS
            .iter()
            .find(|(_, needles)| needles.iter().any(|n| lower.contains(n)))
            .map_or(Self::Other, |(category, _)| *category)
    }

    /// Display label used in status summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Timeout => "Timeout",
            Self::BotDetection => "Bot detection",
            Self::NotFound => "Not found",
            Self::ContentTooLarge => "Content too large",
            Self::Transport => "SSL error",
            Self::Network => "Network error",
            Self::NameResolution => "DNS error",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Count categories and return the `limit` most common, most frequent
/// first. Ties keep first-seen order.
pub fn top_categories(
    categories: impl IntoIterator<Item = FailureCategory>,
    limit: usize,
) -> Vec<(FailureCategory, usize)> {
    let mut counts: HashMap<FailureCategory, usize> = HashMap::new();
    let mut order: Vec<FailureCategory> = Vec::new();
    for category in categories {
        let entry = counts.entry(category).or_insert(0);
        if *entry == 0 {
            order.push(category);
        }
        *entry += 1;
    }

    let mut ranked: Vec<(FailureCategory, usize)> = order
        .into_iter()
        .map(|c| (c, counts.get(&c).copied().unwrap_or(0)))
        .collect();
    // Stable sort keeps first-seen order among equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(limit);
    ranked
}

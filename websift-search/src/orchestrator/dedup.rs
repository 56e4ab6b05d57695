//! Within-list deduplication by normalised URL.
//!
//! A provider sometimes lists the same page twice (sitelinks, mobile and
//! desktop variants). The first occurrence keeps its rank; later
//! duplicates are dropped.

use std::collections::HashSet;

use crate::types::SearchResult;

use super::url_normalize::normalize_url;

/// Remove later results whose normalised URL was already seen. Rank order
/// of the survivors is preserved.
pub fn dedup_in_rank_order(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen: HashSet<String> = HashSet::with_capacity(results.len());
    let before = results.len();
    let kept: Vec<SearchResult> = results
        .into_iter()
        .filter(|r| seen.insert(normalize_url(&r.url)))
        .collect();
    if kept.len() < before {
        tracing::debug!(dropped = before - kept.len(), "duplicate results removed");
    }
    kept
}

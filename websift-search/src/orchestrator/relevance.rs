//! Result-list relevance scoring.
//!
//! Each result gets a signal in `[0, 1]`:
//!
//! ```text
//! signal = 0.6 * term_overlap + 0.2 * description_ok + 0.2 * url_ok
//! ```
//!
//! and the list score is the position-weighted mean of the signals with
//! weight `1 / (1 + 0.1 * position)`, so the top of the list matters most.
//! Scoring is a pure function of the query and the list.

use std::collections::HashSet;

use crate::config::SearchConfig;
use crate::types::SearchResult;

use super::url_normalize::host_of;

/// Descriptions shorter than this (in characters) earn no description credit.
const MIN_DESCRIPTION_CHARS: usize = 20;

/// Overlap credited when the query has no usable terms.
const NEUTRAL_OVERLAP: f64 = 0.5;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "how", "in", "is", "it", "of",
    "on", "or", "that", "the", "this", "to", "was", "what", "when", "where", "which", "who",
    "why", "with",
];

/// Outcome of scoring one list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    /// Whether the list may be returned as accepted.
    pub accepted: bool,
    /// List-level score in `[0, 1]`.
    pub score: f64,
}

/// Scores candidate lists against a query.
#[derive(Debug, Clone, Copy)]
pub struct RelevanceScorer {
    enabled: bool,
    threshold: f64,
}

impl RelevanceScorer {
    /// Create a scorer. When `enabled` is false every non-empty list is
    /// accepted, though its score is still computed.
    pub fn new(enabled: bool, threshold: f64) -> Self {
        Self { enabled, threshold }
    }

    /// Scorer configured from `relevance_checking` and `relevance_threshold`.
    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.relevance_checking, config.relevance_threshold)
    }

    /// Score `results` for `query`.
    pub fn score(&self, query: &str, results: &[SearchResult]) -> Verdict {
        if results.is_empty() {
            return Verdict {
                accepted: false,
                score: 0.0,
            };
        }

        let terms = query_terms(query);
        let (weighted, total_weight) = results.iter().enumerate().fold(
            (0.0, 0.0),
            |(sum, weights), (position, result)| {
                let weight = 1.0 / (1.0 + position as f64 * 0.1);
                (sum + weight * result_signal(&terms, result), weights + weight)
            },
        );
        let score = (weighted / total_weight).clamp(0.0, 1.0);

        Verdict {
            accepted: !self.enabled || score >= self.threshold,
            score,
        }
    }
}

/// Lowercased query terms of two or more characters, stop words removed,
/// first occurrence order.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens(query)
        .filter(|t| t.chars().count() >= 2 && !STOP_WORDS.contains(&t.as_str()))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Relevance signal of a single result.
pub fn result_signal(terms: &[String], result: &SearchResult) -> f64 {
    let overlap = if terms.is_empty() {
        NEUTRAL_OVERLAP
    } else {
        let words: HashSet<String> = tokens(&result.title)
            .chain(tokens(&result.description))
            .collect();
        let hits = terms.iter().filter(|t| words.contains(*t)).count();
        hits as f64 / terms.len() as f64
    };

    let description_ok = result.description.trim().chars().count() >= MIN_DESCRIPTION_CHARS;
    let url_ok = host_of(&result.url).is_some_and(|host| {
        !result
            .provider
            .own_hosts()
            .iter()
            .any(|own| host == *own || host.ends_with(&format!(".{own}")))
    });

    0.6 * overlap + 0.2 * f64::from(u8::from(description_ok)) + 0.2 * f64::from(u8::from(url_ok))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Provider;

    fn result(title: &str, url: &str, description: &str) -> SearchResult {
        SearchResult::new(title.into(), url.into(), description.into(), Provider::Brave)
    }

    fn relevant_list() -> Vec<SearchResult> {
        vec![
            result(
                "Rust ownership explained",
                "https://doc.rust-lang.org/book/ch04-01-what-is-ownership.html",
                "Ownership is Rust's most unique feature and has deep implications.",
            ),
            result(
                "Understanding ownership in Rust",
                "https://blog.example.com/rust-ownership",
                "A practical walkthrough of moves, borrows and lifetimes in Rust.",
            ),
        ]
    }

    #[test]
    fn query_terms_drop_stop_words_and_short_tokens() {
        assert_eq!(
            query_terms("What is the Rust ownership model? a"),
            vec!["rust", "ownership", "model"]
        );
        assert!(query_terms("a the of").is_empty());
    }

    #[test]
    fn relevant_list_is_accepted() {
        let scorer = RelevanceScorer::new(true, 0.3);
        let verdict = scorer.score("rust ownership", &relevant_list());
        assert!(verdict.accepted);
        assert!(verdict.score > 0.9, "score was {}", verdict.score);
    }

    #[test]
    fn off_topic_list_is_rejected() {
        let scorer = RelevanceScorer::new(true, 0.3);
        let list = vec![
            result("Cheap flights", "https://search.brave.com/ads", "Book now"),
            result("Hotel deals", "javascript:void(0)", ""),
        ];
        let verdict = scorer.score("rust ownership", &list);
        assert!(!verdict.accepted);
        assert!(verdict.score < 0.3);
    }

    #[test]
    fn empty_list_never_accepted() {
        let verdict = RelevanceScorer::new(false, 0.0).score("rust", &[]);
        assert!(!verdict.accepted);
        assert_eq!(verdict.score, 0.0);
    }

    #[test]
    fn disabled_scorer_accepts_any_non_empty_list() {
        let list = vec![result("Unrelated", "https://a.com", "")];
        let verdict = RelevanceScorer::new(false, 0.9).score("rust ownership", &list);
        assert!(verdict.accepted);
        assert!(verdict.score < 0.9);
    }

    #[test]
    fn stop_word_only_query_uses_neutral_overlap() {
        let list = vec![result(
            "Anything",
            "https://a.com/page",
            "A description that is long enough.",
        )];
        let verdict = RelevanceScorer::new(true, 0.3).score("the of", &list);
        assert!((verdict.score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn top_positions_weigh_more() {
        let good = result(
            "Rust ownership",
            "https://a.com/x",
            "Rust ownership in depth, with examples.",
        );
        let bad = result("Other", "https://b.com/y", "");
        let scorer = RelevanceScorer::new(true, 0.3);
        let good_first = scorer.score("rust ownership", &[good.clone(), bad.clone()]);
        let bad_first = scorer.score("rust ownership", &[bad, good]);
        assert!(good_first.score > bad_first.score);
    }

    #[test]
    fn provider_own_host_gets_no_url_credit() {
        let terms = query_terms("rust");
        let own = SearchResult::new(
            "rust".into(),
            "https://www.bing.com/images?q=rust".into(),
            String::new(),
            Provider::Bing,
        );
        assert!((result_signal(&terms, &own) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn scoring_is_deterministic() {
        let scorer = RelevanceScorer::new(true, 0.3);
        let list = relevant_list();
        assert_eq!(
            scorer.score("rust ownership", &list),
            scorer.score("rust ownership", &list)
        );
    }
}

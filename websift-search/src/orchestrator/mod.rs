//! Search orchestration: the provider fallback chain, within-list
//! deduplication, and relevance gating.
//!
//! A response always carries the results of exactly one provider. Lists
//! are never merged across providers.

pub mod dedup;
pub mod relevance;
pub mod search;
pub mod url_normalize;

pub use relevance::{RelevanceScorer, Verdict};
pub use search::SearchOrchestrator;

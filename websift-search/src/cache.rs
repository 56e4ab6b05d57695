//! In-memory cache of accepted search responses.
//!
//! Keyed by (lowercased query, requested count, provider chain). Uses
//! [`moka`] for async-friendly caching with a TTL and bounded capacity.
//! Each orchestrator owns its own cache instance.

use std::time::Duration;

use moka::future::Cache;

use crate::types::{Provider, SearchResponse};

/// Maximum number of cached responses.
const MAX_CACHE_ENTRIES: u64 = 100;

/// Composite cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    query: String,
    count: usize,
    providers: Vec<Provider>,
}

impl CacheKey {
    /// Build a key. The query is trimmed and lowercased; the provider
    /// chain keeps its order since priority changes the answer.
    pub fn new(query: &str, count: usize, providers: &[Provider]) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            count,
            providers: providers.to_vec(),
        }
    }
}

/// TTL-bounded response cache. A zero TTL disables caching entirely.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Option<Cache<CacheKey, SearchResponse>>,
}

impl ResponseCache {
    /// Create a cache whose entries live for `ttl_seconds`.
    pub fn new(ttl_seconds: u64) -> Self {
        let inner = (ttl_seconds > 0).then(|| {
            Cache::builder()
                .max_capacity(MAX_CACHE_ENTRIES)
                .time_to_live(Duration::from_secs(ttl_seconds))
                .build()
        });
        Self { inner }
    }

    /// Look up a cached response.
    pub async fn get(&self, key: &CacheKey) -> Option<SearchResponse> {
        match &self.inner {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    /// Store a response.
    pub async fn insert(&self, key: CacheKey, response: SearchResponse) {
        if let Some(cache) = &self.inner {
            cache.insert(key, response).await;
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Some(cache) = &self.inner {
            cache.invalidate_all();
        }
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("enabled", &self.inner.is_some())
            .finish()
    }
}

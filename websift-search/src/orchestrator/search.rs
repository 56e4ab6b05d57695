//! Provider fallback chain with relevance gating.
//!
//! Providers are tried in priority order. The first list the scorer
//! accepts is returned, tagged with its provider; a rejected list is
//! remembered as a fallback candidate and the next provider is tried. In
//! exhaustive mode every provider is queried concurrently and the single
//! best-scoring list wins. Lists from different providers are never mixed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::cache::{CacheKey, ResponseCache};
use crate::circuit_breaker::{BreakerPolicy, CircuitBreaker};
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::provider::{ProviderOutcome, ResultProvider};
use crate::providers::{ProviderAdapter, ProviderEnv};
use crate::render::RenderPool;
use crate::types::{FailureRecord, Provider, ResultQuality, SearchQuery, SearchResponse, SearchResult};

use super::dedup::dedup_in_rank_order;
use super::relevance::{RelevanceScorer, Verdict};

/// A scored list from one provider.
#[derive(Debug)]
struct Candidate {
    provider: Provider,
    results: Vec<SearchResult>,
    verdict: Verdict,
}

/// Drives the provider chain. Generic over the provider type so tests can
/// substitute scripted providers; production uses [`ProviderAdapter`].
pub struct SearchOrchestrator<P = ProviderAdapter> {
    providers: Vec<P>,
    scorer: RelevanceScorer,
    breaker: CircuitBreaker<Provider>,
    cache: ResponseCache,
    exhaustive: bool,
    degraded_fallback: bool,
    pool: Option<RenderPool>,
    closed: AtomicBool,
}

impl SearchOrchestrator<ProviderAdapter> {
    /// Orchestrator over the adapters named in `env.config.providers`.
    pub fn new(env: ProviderEnv) -> Self {
        let providers = ProviderAdapter::chain(&env);
        let mut orchestrator = Self::with_providers(providers, &env.config);
        orchestrator.pool = Some(env.pool);
        orchestrator
    }
}

impl<P: ResultProvider> SearchOrchestrator<P> {
    /// Orchestrator over an explicit provider list, in priority order.
    pub fn with_providers(providers: Vec<P>, config: &SearchConfig) -> Self {
        Self {
            providers,
            scorer: RelevanceScorer::from_config(config),
            breaker: CircuitBreaker::new(BreakerPolicy {
                failure_threshold: config.provider_failure_threshold,
                cooldown: Duration::from_secs(config.provider_cooldown_secs),
            }),
            cache: ResponseCache::new(config.cache_ttl_seconds),
            exhaustive: config.exhaustive,
            degraded_fallback: config.degraded_fallback,
            pool: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Providers in priority order.
    pub fn providers(&self) -> Vec<Provider> {
        self.providers.iter().map(ResultProvider::provider).collect()
    }

    /// Search for `query`, returning up to `num_results` results from
    /// exactly one provider.
    ///
    /// # Errors
    ///
    /// - [`SearchError::InvalidQuery`] for blank text or a count outside `1..=10`
    /// - [`SearchError::NoProviderResults`] when no provider produced a list,
    ///   or every list was rejected and degraded fallback is off
    /// - [`SearchError::ShutDown`] after [`close_all`](Self::close_all)
    pub async fn search(&self, query: &str, num_results: usize) -> Result<SearchResponse, SearchError> {
        let query = SearchQuery::new(query, num_results)?;
        if self.closed.load(Ordering::SeqCst) {
            return Err(SearchError::ShutDown("search orchestrator"));
        }

        let key = CacheKey::new(query.text(), query.count(), &self.providers());
        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!(provider = %hit.provider, count = hit.count, "serving cached response");
            return Ok(hit);
        }
        tracing::trace!(query = query.text(), count = query.count(), "search started");

        let mut failures = Vec::new();
        let candidates = if self.exhaustive {
            self.run_exhaustive(&query, &mut failures).await
        } else {
            self.run_sequential(&query, &mut failures).await
        };

        let response = self.choose(candidates, failures)?;
        if response.quality == ResultQuality::Accepted {
            self.cache.insert(key, response.clone()).await;
        }
        Ok(response)
    }

    /// Try providers one at a time, stopping at the first accepted list.
    async fn run_sequential(&self, query: &SearchQuery, failures: &mut Vec<FailureRecord>) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for provider in &self.providers {
            if !self.admit(provider, failures) {
                continue;
            }
            let outcome = provider.fetch_results(query).await;
            if let Some(candidate) = self.evaluate(query, outcome, failures) {
                let accepted = candidate.verdict.accepted;
                candidates.push(candidate);
                if accepted {
                    break;
                }
            }
        }
        candidates
    }

    /// Query every admitted provider concurrently.
    async fn run_exhaustive(&self, query: &SearchQuery, failures: &mut Vec<FailureRecord>) -> Vec<Candidate> {
        let admitted: Vec<&P> = self
            .providers
            .iter()
            .filter(|p| self.admit(*p, failures))
            .collect();
        let outcomes =
            futures::future::join_all(admitted.iter().map(|p| p.fetch_results(query))).await;

        outcomes
            .into_iter()
            .filter_map(|outcome| self.evaluate(query, outcome, failures))
            .collect()
    }

    /// Check the provider's circuit, recording a failure when it is open.
    fn admit(&self, provider: &P, failures: &mut Vec<FailureRecord>) -> bool {
        let name = provider.provider();
        if self.breaker.should_attempt(&name) {
            return true;
        }
        tracing::info!(provider = %name, "provider circuit open, skipping");
        failures.push(FailureRecord::new(
            provider.endpoint(),
            format!("{name} skipped: circuit open after repeated failures"),
        ));
        false
    }

    /// Record the outcome and score a non-empty list.
    fn evaluate(
        &self,
        query: &SearchQuery,
        outcome: ProviderOutcome,
        failures: &mut Vec<FailureRecord>,
    ) -> Option<Candidate> {
        let ProviderOutcome {
            provider,
            results,
            failure,
        } = outcome;

        match failure {
            Some(record) => {
                self.breaker.record_failure(&provider);
                failures.push(record);
            }
            None => self.breaker.record_success(&provider),
        }

        let mut results: Vec<SearchResult> = dedup_in_rank_order(results)
            .into_iter()
            .filter(|r| r.provider == provider)
            .collect();
        results.truncate(query.count());
        if results.is_empty() {
            return None;
        }

        let verdict = self.scorer.score(query.text(), &results);
        if verdict.accepted {
            tracing::info!(%provider, count = results.len(), score = verdict.score, "result list accepted");
        } else {
            tracing::info!(%provider, count = results.len(), score = verdict.score, "result list rejected");
        }
        Some(Candidate {
            provider,
            results,
            verdict,
        })
    }

    /// Pick the winning candidate. Candidates arrive in priority order, so
    /// keeping the first of equal scores resolves ties by priority.
    fn choose(&self, candidates: Vec<Candidate>, failures: Vec<FailureRecord>) -> Result<SearchResponse, SearchError> {
        let best_of = |accepted: bool| {
            candidates
                .iter()
                .enumerate()
                .filter(|(_, c)| c.verdict.accepted == accepted)
                .fold(None::<(usize, f64)>, |best, (i, c)| match best {
                    Some((_, score)) if score >= c.verdict.score => best,
                    _ => Some((i, c.verdict.score)),
                })
                .map(|(i, _)| i)
        };

        let (index, quality) = match (best_of(true), best_of(false)) {
            (Some(i), _) => (i, ResultQuality::Accepted),
            (None, Some(i)) if self.degraded_fallback => {
                tracing::warn!("no list passed the relevance check, returning best rejected list");
                (i, ResultQuality::Degraded)
            }
            (None, Some(_)) => {
                return Err(SearchError::NoProviderResults(
                    "every result list was rejected by the relevance check".into(),
                ))
            }
            (None, None) => {
                let reasons: Vec<String> = failures
                    .iter()
                    .map(|f| f.error.clone())
                    .collect();
                let detail = if reasons.is_empty() {
                    "no providers configured".to_string()
                } else {
                    reasons.join("; ")
                };
                return Err(SearchError::NoProviderResults(detail));
            }
        };

        let mut candidates = candidates;
        let winner = candidates.swap_remove(index);
        Ok(SearchResponse {
            count: winner.results.len(),
            results: winner.results,
            provider: winner.provider,
            relevance: winner.verdict.score,
            quality,
            failures,
        })
    }

    /// Drop cached responses, refuse further searches, and close the
    /// rendering pool used by providers. Safe to call more than once.
    pub async fn close_all(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cache.clear();
        if let Some(pool) = &self.pool {
            pool.close_all().await;
        }
        tracing::debug!("search orchestrator closed");
    }
}

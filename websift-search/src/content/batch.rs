//! Concurrent extraction over a ranked result list.
//!
//! A bounded set of tasks draws URLs from the list in rank order. Once
//! enough extractions have succeeded no new ones start, but tasks already
//! running finish or time out on their own. Shutdown aborts everything in
//! flight; aborting a task drops its rendering context, which returns the
//! slot to the pool.

use std::collections::HashMap;

use tokio::task::JoinSet;

use super::ContentExtractor;
use crate::types::{EnrichedResult, ExtractionOutcome, FetchFailure, SearchResult};

/// Everything one batch produced.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// At most `target` items in rank order, successes preferred.
    pub selected: Vec<EnrichedResult>,
    /// Every item that reached a terminal status, in rank order.
    pub finished: Vec<EnrichedResult>,
}

impl ContentExtractor {
    /// Extract content for `results` until `target_count` succeed, returning
    /// at most `target_count` items in their original rank order.
    ///
    /// Text is truncated to the configured `max_content_length`.
    pub async fn extract_content_for_results(
        &self,
        results: Vec<SearchResult>,
        target_count: usize,
    ) -> Vec<EnrichedResult> {
        let max_length = self.inner.config.max_content_length;
        self.extract_batch(results, target_count, Some(max_length))
            .await
            .selected
    }

    /// Run a batch and report both the selection and every finished item.
    pub async fn extract_batch(
        &self,
        results: Vec<SearchResult>,
        target_count: usize,
        max_content_length: Option<usize>,
    ) -> BatchReport {
        if target_count == 0 || results.is_empty() {
            return BatchReport::default();
        }

        let concurrency = self.inner.config.extraction_concurrency.max(1);
        let shutdown = self.inner.shutdown.clone();
        let mut queue = results.into_iter().enumerate();
        let mut tasks: JoinSet<(usize, EnrichedResult)> = JoinSet::new();
        let mut in_flight: HashMap<usize, SearchResult> = HashMap::new();
        let mut finished: Vec<(usize, EnrichedResult)> = Vec::new();
        let mut successes = 0usize;
        let mut cancelled = false;

        loop {
            while !cancelled && tasks.len() < concurrency && successes < target_count {
                let Some((rank, result)) = queue.next() else {
                    break;
                };
                in_flight.insert(rank, result.clone());
                let extractor = self.clone();
                tasks.spawn(async move {
                    (rank, extractor.extract_result(result, max_content_length).await)
                });
            }

            let joined = tokio::select! {
                biased;
                () = shutdown.cancelled(), if !cancelled => {
                    tracing::debug!(in_flight = tasks.len(), "batch cancelled by shutdown");
                    cancelled = true;
                    tasks.abort_all();
                    continue;
                }
                joined = tasks.join_next() => joined,
            };
            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok((rank, enriched)) => {
                    in_flight.remove(&rank);
                    if enriched.is_success() {
                        successes += 1;
                    }
                    finished.push((rank, enriched));
                }
                Err(err) if err.is_cancelled() => {}
                Err(err) => tracing::warn!(error = %err, "extraction task failed"),
            }
        }

        // Aborted or panicked tasks never reported back.
        let reason = if cancelled {
            "extraction cancelled by shutdown"
        } else {
            "extraction task failed"
        };
        finished.extend(in_flight.into_iter().map(|(rank, result)| {
            let failed = ExtractionOutcome::Failed(FetchFailure::from_message(reason));
            (rank, EnrichedResult::pending(result).finish(failed))
        }));
        finished.sort_by_key(|(rank, _)| *rank);

        tracing::debug!(
            finished = finished.len(),
            successes,
            target = target_count,
            "extraction batch complete"
        );
        BatchReport {
            selected: select(&finished, target_count),
            finished: finished.into_iter().map(|(_, enriched)| enriched).collect(),
        }
    }
}

/// Successes first, then other items in rank order, capped at `target` and
/// returned in rank order.
fn select(finished: &[(usize, EnrichedResult)], target: usize) -> Vec<EnrichedResult> {
    let successes = finished.iter().filter(|(_, e)| e.is_success());
    let others = finished.iter().filter(|(_, e)| !e.is_success());
    let mut chosen: Vec<&(usize, EnrichedResult)> = successes.chain(others).take(target).collect();
    chosen.sort_by_key(|(rank, _)| *rank);
    chosen.into_iter().map(|(_, enriched)| enriched.clone()).collect()
}

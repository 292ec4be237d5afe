// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Pooled parallel fan-out dispatch.
//!
//! Issues the same operation across an ordered set of targets concurrently
//! and aggregates the per-target outcomes into one completion. Two variants:
//! ordered (result slot `i` belongs to target `i` regardless of completion
//! order) and unordered (results land in completion order, no positional
//! correspondence). Result buffers are recycled through a bounded free-list
//! so sustained fan-out traffic does not allocate per call.
//!
//! Operations are issued in index order; completion order is unconstrained.
//! A failing target never blocks or cancels its siblings, and nothing is
//! retried at this layer.

use crate::errors;
use futures::stream::{FuturesOrdered, FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::Mutex;

/// Per-target outcome of a fan-out.
pub type TargetResult<V> = Result<V, errors::Write>;

/// Bounded free-list of reusable result buffers.
///
/// Acquiring from an empty list falls back to a fresh allocation; it never
/// fails and never blocks. Releasing clears the buffer first, dropping any
/// record references it held, and discards the buffer instead of keeping it
/// once the list is back at capacity.
pub struct FanoutPool<V> {
    free: Mutex<Vec<Vec<TargetResult<V>>>>,
    max_idle: usize,
}

impl<V> FanoutPool<V> {
    /// Pool retaining up to `max_idle` idle result buffers.
    pub fn new(max_idle: usize) -> Self {
        FanoutPool {
            free: Mutex::new(Vec::with_capacity(max_idle)),
            max_idle,
        }
    }

    fn acquire(&self) -> Vec<TargetResult<V>> {
        #[allow(clippy::expect_used)]
        let mut buffer = self
            .free
            .lock()
            .expect("lock poisoned")
            .pop()
            .unwrap_or_default();
        buffer.clear();
        buffer
    }

    fn release(&self, mut buffer: Vec<TargetResult<V>>) {
        buffer.clear();
        #[allow(clippy::expect_used)]
        let mut free = self.free.lock().expect("lock poisoned");
        if free.len() < self.max_idle {
            free.push(buffer);
        }
    }

    /// Ordered fan-out: result slot `i` corresponds to target `i` no matter
    /// when each operation completes. `on_complete` runs exactly once, only
    /// after every target has reported; the result buffer goes back to the
    /// free-list only after `on_complete` returns. An empty target set still
    /// completes (with an empty result slice).
    pub async fn run_ordered<'a, T, F, Fut, C, R>(
        &self,
        targets: &'a [T],
        per_item: F,
        on_complete: C,
    ) -> R
    where
        F: FnMut(&'a T, usize) -> Fut,
        Fut: Future<Output = TargetResult<V>>,
        C: FnOnce(&[TargetResult<V>]) -> R,
    {
        let mut results = self.acquire();
        collect_ordered(targets, per_item, &mut results).await;
        let out = on_complete(&results);
        self.release(results);
        out
    }

    /// Unordered fan-out: results are appended in completion order. Callers
    /// needing to correlate results with targets must use the ordered
    /// variant.
    pub async fn run_unordered<'a, T, F, Fut, C, R>(
        &self,
        targets: &'a [T],
        per_item: F,
        on_complete: C,
    ) -> R
    where
        F: FnMut(&'a T, usize) -> Fut,
        Fut: Future<Output = TargetResult<V>>,
        C: FnOnce(&[TargetResult<V>]) -> R,
    {
        let mut results = self.acquire();
        collect_unordered(targets, per_item, &mut results).await;
        let out = on_complete(&results);
        self.release(results);
        out
    }

    /// Ordered fan-out collapsed into a single composite outcome.
    pub async fn run<'a, T, F, Fut>(
        &self,
        targets: &'a [T],
        per_item: F,
    ) -> Result<(), errors::Write>
    where
        F: FnMut(&'a T, usize) -> Fut,
        Fut: Future<Output = TargetResult<V>>,
    {
        self.run_ordered(targets, per_item, |results| aggregate(results))
            .await
    }

    #[cfg(test)]
    fn idle(&self) -> usize {
        self.free.lock().expect("lock poisoned").len()
    }
}

/// One-shot ordered dispatch for callers that do not hold a pool.
pub async fn dispatch_ordered<'a, T, V, F, Fut>(
    targets: &'a [T],
    per_item: F,
) -> Vec<TargetResult<V>>
where
    F: FnMut(&'a T, usize) -> Fut,
    Fut: Future<Output = TargetResult<V>>,
{
    let mut results = Vec::with_capacity(targets.len());
    collect_ordered(targets, per_item, &mut results).await;
    results
}

/// One-shot unordered dispatch for callers that do not hold a pool.
pub async fn dispatch_unordered<'a, T, V, F, Fut>(
    targets: &'a [T],
    per_item: F,
) -> Vec<TargetResult<V>>
where
    F: FnMut(&'a T, usize) -> Fut,
    Fut: Future<Output = TargetResult<V>>,
{
    let mut results = Vec::with_capacity(targets.len());
    collect_unordered(targets, per_item, &mut results).await;
    results
}

/// Collapse per-target results into one composite outcome carrying the
/// failure count. Zero failures aggregate to `Ok`.
pub fn aggregate<V>(results: &[TargetResult<V>]) -> Result<(), errors::Write> {
    let failed = results.iter().filter(|result| result.is_err()).count();
    if failed == 0 {
        Ok(())
    } else {
        Err(errors::Write::Partial {
            failed,
            total: results.len(),
        })
    }
}

async fn collect_ordered<'a, T, V, F, Fut>(
    targets: &'a [T],
    mut per_item: F,
    results: &mut Vec<TargetResult<V>>,
) where
    F: FnMut(&'a T, usize) -> Fut,
    Fut: Future<Output = TargetResult<V>>,
{
    // FuturesOrdered yields results in push order, so slot i always holds
    // target i's outcome even when completions interleave.
    let mut pending = FuturesOrdered::new();
    for (index, target) in targets.iter().enumerate() {
        pending.push_back(per_item(target, index));
    }
    while let Some(result) = pending.next().await {
        results.push(result);
    }
}

async fn collect_unordered<'a, T, V, F, Fut>(
    targets: &'a [T],
    mut per_item: F,
    results: &mut Vec<TargetResult<V>>,
) where
    F: FnMut(&'a T, usize) -> Fut,
    Fut: Future<Output = TargetResult<V>>,
{
    let mut pending = FuturesUnordered::new();
    for (index, target) in targets.iter().enumerate() {
        pending.push(per_item(target, index));
    }
    while let Some(result) = pending.next().await {
        results.push(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_empty_target_set_still_completes() {
        let pool: FanoutPool<usize> = FanoutPool::new(4);
        let targets: [u64; 0] = [];

        let mut fired = 0;
        let outcome = pool
            .run_ordered(
                &targets,
                |_, index| async move { Ok(index) },
                |results| {
                    fired += 1;
                    results.len()
                },
            )
            .await;

        assert_eq!(outcome, 0);
        assert_eq!(fired, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ordered_results_match_target_positions() {
        let pool: FanoutPool<usize> = FanoutPool::new(4);
        let delays_ms = [30u64, 20, 10];
        let completion_order = Mutex::new(Vec::new());

        let slots = pool
            .run_ordered(
                &delays_ms,
                |&delay, index| {
                    let completion_order = &completion_order;
                    async move {
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        completion_order.lock().unwrap().push(index);
                        Ok(index)
                    }
                },
                |results| {
                    results
                        .iter()
                        .map(|result| *result.as_ref().unwrap())
                        .collect::<Vec<_>>()
                },
            )
            .await;

        // Slots line up with targets even though completions ran backwards.
        assert_eq!(slots, vec![0, 1, 2]);
        assert_eq!(*completion_order.lock().unwrap(), vec![2, 1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unordered_results_follow_completion_order() {
        let pool: FanoutPool<usize> = FanoutPool::new(4);
        let delays_ms = [30u64, 20, 10];

        let slots = pool
            .run_unordered(
                &delays_ms,
                |&delay, index| async move {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    Ok(index)
                },
                |results| {
                    results
                        .iter()
                        .map(|result| *result.as_ref().unwrap())
                        .collect::<Vec<_>>()
                },
            )
            .await;

        assert_eq!(slots, vec![2, 1, 0]);
    }

    #[tokio::test]
    async fn test_failures_never_block_siblings() {
        let pool: FanoutPool<()> = FanoutPool::new(4);
        let targets = [0usize, 1, 2];
        let attempted = Mutex::new(0usize);

        let outcome = pool
            .run(&targets, |&target, _| {
                let attempted = &attempted;
                async move {
                    *attempted.lock().unwrap() += 1;
                    if target == 1 {
                        Err(errors::Write::Sink("mock failure".to_string()))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert_eq!(*attempted.lock().unwrap(), 3);
        match outcome {
            Err(errors::Write::Partial { failed, total }) => {
                assert_eq!(failed, 1);
                assert_eq!(total, 3);
            }
            other => panic!("expected partial failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pool_recycles_buffers_up_to_bound() {
        let pool: FanoutPool<()> = FanoutPool::new(1);
        let targets = [1u64, 2, 3];

        assert_eq!(pool.idle(), 0);
        pool.run(&targets, |_, _| async { Ok(()) }).await.unwrap();
        assert_eq!(pool.idle(), 1);

        // A second run reuses the idle buffer and returns it again; the
        // free-list never grows past its bound.
        pool.run(&targets, |_, _| async { Ok(()) }).await.unwrap();
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_aggregate_counts_failures() {
        let all_ok: Vec<TargetResult<()>> = vec![Ok(()), Ok(())];
        assert!(aggregate(&all_ok).is_ok());

        let mixed: Vec<TargetResult<()>> = vec![
            Ok(()),
            Err(errors::Write::Sink("a".into())),
            Err(errors::Write::Sink("b".into())),
        ];
        match aggregate(&mixed) {
            Err(errors::Write::Partial { failed, total }) => {
                assert_eq!(failed, 2);
                assert_eq!(total, 3);
            }
            other => panic!("expected partial failure, got {other:?}"),
        }

        let empty: Vec<TargetResult<()>> = Vec::new();
        assert!(aggregate(&empty).is_ok());
    }
}

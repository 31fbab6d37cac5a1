//! Bounded-concurrency worker pool for per-ticker fan-out.
//!
//! One [`WorkerPool`] instance executes the tickers of a single job. Concurrency
//! is bounded by a [`tokio::sync::Semaphore`]; cooperative cancellation is
//! carried by a [`tokio_util::sync::CancellationToken`]. Completions are
//! drained through an unbounded channel into a single dispatcher loop so the
//! progress callback is always serialized, matching the "called exactly once
//! per ticker, calls never overlap" contract.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// What happened to one dispatched unit of work.
pub enum ItemOutcome<O, E> {
    Success(O),
    Failed(E),
    TimedOut,
}

/// Summary counters after a full `run()` call settles.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub dispatched: usize,
    pub skipped_due_to_cancel: usize,
}

pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    per_item_timeout: Duration,
}

impl WorkerPool {
    pub fn new(concurrency: usize, per_item_timeout: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            per_item_timeout,
        }
    }

    /// Runs `work` over every item in `items` with bounded concurrency.
    ///
    /// `progress` is invoked exactly once per dispatched item, serialized
    /// (never concurrently), in completion order. Once `cancel` is
    /// signalled, no further items are dispatched, but items already
    /// in-flight run to completion or to their timeout.
    pub async fn run<T, O, E, F, Fut, P, PFut>(
        &self,
        items: Vec<T>,
        cancel: CancellationToken,
        work: F,
        mut progress: P,
    ) -> RunSummary
    where
        T: Clone + Send + 'static,
        O: Send + 'static,
        E: Send + 'static,
        F: Fn(usize, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
        P: FnMut(usize, T, ItemOutcome<O, E>) -> PFut,
        PFut: Future<Output = ()>,
    {
        let total = items.len();
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, T, ItemOutcome<O, E>)>();
        let work = Arc::new(work);
        let per_item_timeout = self.per_item_timeout;

        let dispatch_cancel = cancel.clone();
        let semaphore = self.semaphore.clone();
        let dispatch_tx = tx.clone();
        let dispatch_work = work.clone();
        let dispatch = tokio::spawn(async move {
            let mut dispatched = 0usize;
            for (index, item) in items.into_iter().enumerate() {
                if dispatch_cancel.is_cancelled() {
                    break;
                }
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => break,
                };
                dispatched += 1;
                let tx = dispatch_tx.clone();
                let work = dispatch_work.clone();
                let item_for_work = item.clone();
                let span = tracing::info_span!("analysis_ticker", index, ticker_index = index);
                tokio::spawn(
                    async move {
                        let _permit = permit;
                        let fut = work(index, item_for_work);
                        let outcome = match tokio::time::timeout(per_item_timeout, fut).await {
                            Ok(Ok(ok)) => ItemOutcome::Success(ok),
                            Ok(Err(err)) => ItemOutcome::Failed(err),
                            Err(_) => ItemOutcome::TimedOut,
                        };
                        let _ = tx.send((index, item, outcome));
                    }
                    .instrument(span),
                );
            }
            dispatched
        });
        drop(tx);

        while let Some((index, item, outcome)) = rx.recv().await {
            progress(index, item, outcome).await;
        }

        let dispatched = dispatch.await.unwrap_or(0);
        RunSummary {
            dispatched,
            skipped_due_to_cancel: total.saturating_sub(dispatched),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn runs_every_item_exactly_once_when_not_cancelled() {
        let pool = WorkerPool::new(2, Duration::from_secs(5));
        let items: Vec<i32> = (0..10).collect();
        let completions = Arc::new(AtomicUsize::new(0));
        let completions2 = completions.clone();

        let summary = pool
            .run(
                items,
                CancellationToken::new(),
                |_idx, item| async move { Ok::<i32, ()>(item * 2) },
                move |_idx, _item, outcome| {
                    let completions = completions2.clone();
                    async move {
                        if let ItemOutcome::Success(_) = outcome {
                            completions.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                },
            )
            .await;

        assert_eq!(summary.dispatched, 10);
        assert_eq!(completions.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn cancelling_before_dispatch_stops_new_work() {
        let pool = WorkerPool::new(1, Duration::from_secs(5));
        let token = CancellationToken::new();
        token.cancel();
        let items: Vec<i32> = (0..5).collect();

        let summary = pool
            .run(
                items,
                token,
                |_idx, item| async move { Ok::<i32, ()>(item) },
                |_idx, _item, _outcome| async move {},
            )
            .await;

        assert_eq!(summary.dispatched, 0);
        assert_eq!(summary.skipped_due_to_cancel, 5);
    }

    #[tokio::test]
    async fn timeout_produces_timed_out_outcome() {
        let pool = WorkerPool::new(1, Duration::from_millis(10));
        let items = vec![1];
        let observed = Arc::new(AtomicUsize::new(0));
        let observed2 = observed.clone();

        pool.run(
            items,
            CancellationToken::new(),
            |_idx, _item| async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<i32, ()>(1)
            },
            move |_idx, _item, outcome| {
                let observed = observed2.clone();
                async move {
                    if matches!(outcome, ItemOutcome::TimedOut) {
                        observed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            },
        )
        .await;

        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn one_item_failure_does_not_affect_others() {
        let pool = WorkerPool::new(4, Duration::from_secs(5));
        let items: Vec<i32> = (0..4).collect();
        let successes = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));
        let (s2, f2) = (successes.clone(), failures.clone());

        pool.run(
            items,
            CancellationToken::new(),
            |_idx, item| async move {
                if item == 2 {
                    Err::<i32, &'static str>("boom")
                } else {
                    Ok::<i32, &'static str>(item)
                }
            },
            move |_idx, _item, outcome| {
                let (s, f) = (s2.clone(), f2.clone());
                async move {
                    match outcome {
                        ItemOutcome::Success(_) => {
                            s.fetch_add(1, Ordering::SeqCst);
                        }
                        ItemOutcome::Failed(_) => {
                            f.fetch_add(1, Ordering::SeqCst);
                        }
                        ItemOutcome::TimedOut => {}
                    }
                }
            },
        )
        .await;

        assert_eq!(successes.load(Ordering::SeqCst), 3);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }
}

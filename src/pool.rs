use futures::future;
use std::future::Future;
use tokio::sync::Semaphore;

/// Runs `f` over every item with at most `limit` futures in flight at
/// once. Results come back in input order regardless of completion order.
///
/// Each task acquires a semaphore permit before it starts doing work, so
/// the bound holds even though all futures are polled by a single
/// `join_all`. The pool imposes no retry or error policy; items map to
/// whatever `f` returns.
pub async fn map_bounded<I, F, Fut, T>(limit: usize, items: I, f: F) -> Vec<T>
where
    I: IntoIterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = T>,
{
    let semaphore = Semaphore::new(limit);
    let tasks = items.into_iter().map(|item| {
        let semaphore = &semaphore;
        let task = f(item);
        async move {
            // Never fails: the semaphore lives for the whole call and is
            // never closed.
            let _permit = semaphore.acquire().await.expect("semaphore closed");
            task.await
        }
    });
    future::join_all(tasks).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_keep_input_order() {
        // Later items finish first; order must still follow the input.
        let results = map_bounded(4, 0..8u64, |i| async move {
            tokio::time::sleep(Duration::from_millis(40 - i * 5)).await;
            i * 2
        })
        .await;
        assert_eq!(results, vec![0, 2, 4, 6, 8, 10, 12, 14]);
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_limit() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let (in_flight, peak) = (&in_flight, &peak);

        map_bounded(3, 0..20, |_| async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 3, "peak {} exceeded limit", peak.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_output() {
        let results: Vec<u8> = map_bounded(2, Vec::<u8>::new(), |i| async move { i }).await;
        assert!(results.is_empty());
    }
}

//! Ordered and bounded-concurrency execution helpers.

use std::future::Future;

use futures::future::{join_all, BoxFuture};

/// One deferred step of a best-effort sequence.
pub type SequenceStep<'a, T, E> = Box<dyn FnOnce() -> BoxFuture<'a, Result<T, E>> + Send + 'a>;

/// Runs `steps` strictly one after another and collects their results.
///
/// This is a best-effort sequence, not a transaction: the first error stops
/// the sequence and is returned, later steps never start, and steps that
/// already completed are not undone.
pub async fn execute_sequence<'a, T, E>(steps: Vec<SequenceStep<'a, T, E>>) -> Result<Vec<T>, E> {
    let mut results = Vec::with_capacity(steps.len());
    for step in steps {
        results.push(step().await?);
    }
    Ok(results)
}

/// Applies `f` to every item with at most `chunk_size` calls in flight.
///
/// Items are processed in consecutive chunks; each chunk is awaited in full
/// before the next starts. Results keep the input order. A `chunk_size` of
/// zero is treated as one.
pub async fn run_chunked<I, T, F, Fut>(items: Vec<I>, chunk_size: usize, f: F) -> Vec<T>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = T>,
{
    let chunk_size = chunk_size.max(1);
    let mut results = Vec::with_capacity(items.len());
    let mut items = items.into_iter().peekable();

    while items.peek().is_some() {
        let chunk: Vec<Fut> = items.by_ref().take(chunk_size).map(&f).collect();
        results.extend(join_all(chunk).await);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_sequence_runs_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps: Vec<SequenceStep<'_, u32, String>> = (1..=3u32)
            .map(|n| {
                let log = log.clone();
                Box::new(move || {
                    async move {
                        log.lock().unwrap().push(n);
                        Ok(n * 10)
                    }
                    .boxed()
                }) as SequenceStep<'_, u32, String>
            })
            .collect();

        let results = execute_sequence(steps).await.unwrap();

        assert_eq!(results, vec![10, 20, 30]);
        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_sequence_stops_at_first_failure() {
        let invoked = Arc::new(Mutex::new(Vec::new()));
        let step = |n: u32, fail: bool| -> SequenceStep<'static, u32, String> {
            let invoked = invoked.clone();
            Box::new(move || {
                async move {
                    invoked.lock().unwrap().push(n);
                    if fail {
                        Err(format!("op{n} failed"))
                    } else {
                        Ok(n)
                    }
                }
                .boxed()
            })
        };

        let result = execute_sequence(vec![step(1, false), step(2, true), step(3, false)]).await;

        assert_eq!(result, Err("op2 failed".to_string()));
        assert_eq!(*invoked.lock().unwrap(), vec![1, 2], "op3 never runs");
    }

    #[tokio::test]
    async fn test_run_chunked_bounds_concurrency() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = run_chunked((0..12).collect(), 5, |n: u32| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                n * 2
            }
        })
        .await;

        assert_eq!(results, (0..12).map(|n| n * 2).collect::<Vec<_>>());
        assert!(peak.load(Ordering::SeqCst) <= 5);
        assert_eq!(peak.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_run_chunked_zero_size() {
        let results = run_chunked(vec![1, 2], 0, |n: i32| async move { n }).await;
        assert_eq!(results, vec![1, 2]);
    }
}

// components/audio_tools/src/pool.rs
//! Bounded fan-out for external tool invocations
//!
//! A fixed number of workers drain a shared queue and report over a channel.
//! The first failure stops dispatching and is returned to the caller.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Number of concurrent external processes used for loading and transcoding
pub const DEFAULT_WORKERS: usize = 5;

/// Run `task` for every item with at most `workers` running at once
///
/// Results come back in input order. On the first error the remaining
/// queue is dropped and results still in flight are discarded; processes
/// that already started are left to finish on their own.
pub async fn fan_out<I, T, E, F, Fut>(items: Vec<I>, workers: usize, task: F) -> Result<Vec<T>, E>
where
    I: Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let total = items.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let queue = Arc::new(Mutex::new(
        items.into_iter().enumerate().collect::<VecDeque<_>>(),
    ));
    let task = Arc::new(task);
    let (results_tx, mut results_rx) = mpsc::channel(workers.max(1));

    let handles: Vec<_> = (0..workers.clamp(1, total))
        .map(|_| {
            let queue = Arc::clone(&queue);
            let task = Arc::clone(&task);
            let results_tx = results_tx.clone();
            tokio::spawn(async move {
                loop {
                    let next = queue.lock().pop_front();
                    let Some((index, item)) = next else { break };
                    let result = task(item).await;
                    if results_tx.send((index, result)).await.is_err() {
                        break;
                    }
                }
            })
        })
        .collect();
    drop(results_tx);

    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(total).collect();

    while let Some((index, result)) = results_rx.recv().await {
        match result {
            Ok(value) => slots[index] = Some(value),
            Err(error) => {
                queue.lock().clear();
                return Err(error);
            }
        }
    }

    for handle in handles {
        if let Err(error) = handle.await {
            if error.is_panic() {
                std::panic::resume_unwind(error.into_panic());
            }
        }
    }

    Ok(slots.into_iter().flatten().collect())
}

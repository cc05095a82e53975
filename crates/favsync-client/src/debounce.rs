//! Debounced toggle: prevents request storms from rapid repeated
//! clicks on the same favorite control.
//!
//! Timers are keyed per product id: a re-trigger of the SAME id inside
//! the window supersedes the pending call (last call wins), while
//! toggles of different ids never starve each other. The original
//! client shared one timer across all ids; whether that was global
//! throttling or a latent bug is recorded in DESIGN.md.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use favsync_core::FavoriteError;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::metrics::PerfMonitor;

pub struct DebouncedToggle {
    delay: Duration,
    metrics: Arc<PerfMonitor>,
    // product_id -> generation of the newest trigger. A sleeping task
    // whose generation has been overtaken simply gives up; in-flight
    // mutations are never aborted mid-call. An entry is pruned once its
    // winning task finishes, so the map tracks only active windows.
    generations: Arc<Mutex<HashMap<u64, u64>>>,
}

impl DebouncedToggle {
    pub fn new(delay: Duration, metrics: Arc<PerfMonitor>) -> Self {
        Self {
            delay,
            metrics,
            generations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Schedule `fire` after the debounce delay. If the same product is
    /// triggered again before the delay elapses, this invocation is
    /// superseded and `fire` never runs; after an uncontested delay the
    /// mutation fires exactly once.
    ///
    /// Success records latency since this invocation (including the
    /// delay itself) and a success counter; failure records an error
    /// counter. Retries live in the executor layer, not here.
    pub fn trigger<F, Fut>(&self, product_id: u64, fire: F) -> JoinHandle<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), FavoriteError>> + Send + 'static,
    {
        let generation = {
            let mut generations = self.generations.lock();
            let slot = generations.entry(product_id).or_insert(0);
            *slot += 1;
            *slot
        };

        let delay = self.delay;
        let generations = Arc::clone(&self.generations);
        let metrics = Arc::clone(&self.metrics);
        let started = Instant::now();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let superseded =
                generations.lock().get(&product_id).copied() != Some(generation);
            if superseded {
                tracing::trace!(product_id, "debounced toggle superseded");
                return;
            }

            match fire().await {
                Ok(()) => metrics.record_success(started.elapsed()),
                Err(error) => {
                    metrics.record_error();
                    tracing::debug!(product_id, code = error.code(), "debounced toggle failed");
                }
            }

            // The window is over; drop the entry unless a newer trigger
            // claimed it while the mutation was in flight.
            let mut generations = generations.lock();
            if generations.get(&product_id) == Some(&generation) {
                generations.remove(&product_id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn toggle(delay_ms: u64) -> (DebouncedToggle, Arc<PerfMonitor>) {
        let metrics = Arc::new(PerfMonitor::new());
        (
            DebouncedToggle::new(Duration::from_millis(delay_ms), metrics.clone()),
            metrics,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_triggers_fire_once() {
        let (debounce, _) = toggle(300);
        let fired = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let fired = fired.clone();
            handles.push(debounce.trigger(7, move || async move {
                fired.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_ids_do_not_starve_each_other() {
        let (debounce, _) = toggle(300);
        let fired = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::new();
        for product_id in [1, 2, 3] {
            let fired = fired.clone();
            handles.push(debounce.trigger(product_id, move || async move {
                fired.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_triggers_in_separate_windows_both_fire() {
        let (debounce, metrics) = toggle(300);
        let fired = Arc::new(AtomicU64::new(0));

        for _ in 0..2 {
            let fired = fired.clone();
            debounce
                .trigger(7, move || async move {
                    fired.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
                .unwrap();
            tokio::time::advance(Duration::from_millis(400)).await;
        }

        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert_eq!(metrics.snapshot().successes, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_map_pruned_after_fire() {
        let (debounce, _) = toggle(300);

        debounce.trigger(7, || async { Ok(()) }).await.unwrap();
        assert!(debounce.generations.lock().is_empty());

        // A failed mutation prunes its window too.
        debounce
            .trigger(8, || async { Err(FavoriteError::Network) })
            .await
            .unwrap();
        assert!(debounce.generations.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_records_error_counter() {
        let (debounce, metrics) = toggle(300);

        debounce
            .trigger(7, || async { Err(FavoriteError::Timeout) })
            .await
            .unwrap();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.successes, 0);
        assert_eq!(snapshot.errors, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_includes_debounce_delay() {
        let (debounce, metrics) = toggle(300);

        debounce.trigger(7, || async { Ok(()) }).await.unwrap();

        assert!(metrics.snapshot().avg_latency_ms >= 300);
    }
}

// favsync - client-side favorite-state synchronization
//
// Facade over the two member crates:
// - favsync-core: pure policy (classification, retry math, persisted
//   cache records, configuration)
// - favsync-client: async orchestration (cache manager, debounce,
//   batching, retry execution)
//
// Data flow: UI toggle -> debounce coalesces repeats -> retry executor
// drives the mutation -> cache manager reconciles with server truth ->
// UI re-renders from cache. The batch processor is the alternate entry
// path for bulk operations.

use std::sync::Arc;

use favsync_client::{
    BatchProcessor, CacheManager, DebouncedToggle, PerfMonitor, RetryExecutor,
};
use tokio::task::JoinHandle;

pub use favsync_client::{ErrorSink, FavoriteApi, PerfSnapshot};
pub use favsync_core::{
    ApiFailure, AttemptState, FavoriteError, FavoriteOp, FavoriteStatus, FavoriteStore,
    MemoryStore, PendingOperation, PersistedCache, RetryPolicy, SyncConfig,
};

/// The favorite synchronization layer, wired together.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct FavoriteSync {
    api: Arc<dyn FavoriteApi>,
    cache: Arc<CacheManager>,
    debounce: DebouncedToggle,
    batch: BatchProcessor,
    executor: Arc<RetryExecutor>,
    metrics: Arc<PerfMonitor>,
}

impl FavoriteSync {
    pub fn new(
        api: Arc<dyn FavoriteApi>,
        store: Arc<dyn FavoriteStore>,
        config: SyncConfig,
    ) -> anyhow::Result<Self> {
        Self::build(api, store, config, None)
    }

    /// Like [`new`](Self::new) with an external error-tracking sink
    /// attached to the terminal-failure path.
    pub fn with_error_sink(
        api: Arc<dyn FavoriteApi>,
        store: Arc<dyn FavoriteStore>,
        config: SyncConfig,
        sink: Arc<dyn ErrorSink>,
    ) -> anyhow::Result<Self> {
        Self::build(api, store, config, Some(sink))
    }

    fn build(
        api: Arc<dyn FavoriteApi>,
        store: Arc<dyn FavoriteStore>,
        config: SyncConfig,
        sink: Option<Arc<dyn ErrorSink>>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let ttl_ms = config.cache.ttl_ms();
        let metrics = Arc::new(PerfMonitor::new());
        let policy = config.retry.policy();
        let executor = Arc::new(match sink {
            Some(sink) => RetryExecutor::with_sink(policy, sink),
            None => RetryExecutor::new(policy),
        });

        Ok(Self {
            cache: Arc::new(CacheManager::new(
                Arc::clone(&api),
                PersistedCache::new(store, ttl_ms),
                ttl_ms,
            )),
            debounce: DebouncedToggle::new(config.debounce.delay(), Arc::clone(&metrics)),
            batch: BatchProcessor::new(),
            executor,
            metrics,
            api,
        })
    }

    /// Best known favorite state of one product, for the UI to render.
    pub fn is_favorited(&self, product_id: u64) -> Option<bool> {
        self.cache.status(product_id)
    }

    /// Toggle a favorite. Applies an optimistic flip immediately, then
    /// fires the mutation after the debounce window (coalescing rapid
    /// repeated toggles of the same product into one call). On terminal
    /// failure the optimistic flip is rolled back; the executor has
    /// already logged and surfaced the error by then.
    ///
    /// Returns the spawned task handle; callers that tear down early
    /// may drop it, a late completion is a no-op.
    pub fn toggle(&self, product_id: u64) -> JoinHandle<()> {
        let current = self.cache.status(product_id).unwrap_or(false);
        self.cache.apply_optimistic(product_id, !current);

        let api = Arc::clone(&self.api);
        let cache = Arc::clone(&self.cache);
        let executor = Arc::clone(&self.executor);

        self.debounce.trigger(product_id, move || async move {
            let result = executor
                .run("favorites.toggle", || {
                    let api = Arc::clone(&api);
                    async move { api.toggle_favorite(product_id).await }
                })
                .await;

            match result {
                Ok(favorited) => {
                    cache.confirm(product_id, favorited);
                    Ok(())
                }
                Err(error) => {
                    cache.rollback(product_id);
                    Err(error)
                }
            }
        })
    }

    /// Queue an operation for the bulk path ("select all -> favorite
    /// all"). Nothing is sent until [`flush_queued`](Self::flush_queued)
    /// runs; a second queue for the same product replaces the first.
    pub fn queue(&self, product_id: u64, op: FavoriteOp) {
        self.batch.add(product_id, op);
    }

    /// Flush the queued operations, one sequential mutation per
    /// product. Operations that would be no-ops against known cache
    /// state are skipped. Safe to call with nothing queued.
    pub async fn flush_queued(&self) {
        let drained = self.batch.drain();
        if drained.is_empty() {
            return;
        }
        tracing::info!(operations = drained.len(), "flushing queued favorite operations");

        for (product_id, pending) in drained {
            let desired = match pending.op {
                FavoriteOp::Add => Some(true),
                FavoriteOp::Remove => Some(false),
                FavoriteOp::Toggle => None,
            };

            if let Some(desired) = desired {
                // Add/Remove need a baseline the toggle endpoint can
                // flip against; fetch one if the cache has none.
                if self.cache.status(product_id).is_none() {
                    self.cache.prefetch_statuses(&[product_id]).await;
                }
                if self.cache.status(product_id) == Some(desired) {
                    continue;
                }
            }

            let api = Arc::clone(&self.api);
            let started = tokio::time::Instant::now();
            let result = self
                .executor
                .run("favorites.batch", || {
                    let api = Arc::clone(&api);
                    async move { api.toggle_favorite(product_id).await }
                })
                .await;

            match result {
                Ok(favorited) => {
                    self.cache.confirm(product_id, favorited);
                    self.metrics.record_success(started.elapsed());
                }
                // Already logged and reported once by the executor;
                // the cache keeps its last confirmed state.
                Err(_) => self.metrics.record_error(),
            }
        }
    }

    /// Look up statuses for ids not already fresh in cache, with
    /// in-flight de-duplication. Best-effort; failures never propagate.
    pub async fn prefetch(&self, product_ids: &[u64]) {
        self.cache.prefetch_statuses(product_ids).await;
    }

    /// Seed the cache from a bulk payload without network calls.
    pub fn warm_up(&self, statuses: &[FavoriteStatus]) {
        self.cache.warm_up(statuses);
    }

    /// Teardown path: flush queued operations and sweep stale cache
    /// entries. Does not cancel in-flight work; late completions are
    /// tolerated.
    pub async fn shutdown(&self) {
        self.flush_queued().await;
        self.cache.cleanup_stale();
    }

    pub fn metrics(&self) -> PerfSnapshot {
        self.metrics.snapshot()
    }
}

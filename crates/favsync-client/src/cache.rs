//! Cache manager: keeps the local view of "is product P favorited"
//! close to server truth while minimizing redundant network calls.
//!
//! Two layers back the view: an in-memory map (authoritative once a
//! round-trip succeeds) and the persisted advisory cache from
//! favsync-core. Optimistic updates are tagged explicitly so a rejected
//! mutation has a real rollback path instead of waiting for a re-fetch.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use favsync_core::{now_ms, FavoriteStatus, PersistedCache};
use parking_lot::Mutex;

use crate::api::FavoriteApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    /// Reflects a completed server round-trip or a warm-up payload.
    Confirmed,
    /// Applied locally ahead of the server; `previous` is the value to
    /// restore on rollback (None when nothing was known before).
    Optimistic { previous: Option<bool> },
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    status: FavoriteStatus,
    kind: EntryKind,
}

pub struct CacheManager {
    api: Arc<dyn FavoriteApi>,
    persisted: PersistedCache,
    ttl_ms: i64,
    entries: Mutex<HashMap<u64, CacheEntry>>,
    in_flight: Mutex<HashSet<u64>>,
}

/// Ids claimed in the shared in-flight set for the duration of one
/// prefetch. Release happens in `Drop`, so a caller cancelling the
/// prefetch future mid-await cannot leave ids claimed forever.
struct InFlightClaim<'a> {
    set: &'a Mutex<HashSet<u64>>,
    ids: Vec<u64>,
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        let mut set = self.set.lock();
        for id in &self.ids {
            set.remove(id);
        }
    }
}

impl CacheManager {
    pub fn new(api: Arc<dyn FavoriteApi>, persisted: PersistedCache, ttl_ms: i64) -> Self {
        Self {
            api,
            persisted,
            ttl_ms,
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Best known favorite state. Fresh in-memory entries win; the
    /// persisted copy is consulted only as an advisory fallback.
    pub fn status(&self, product_id: u64) -> Option<bool> {
        {
            let entries = self.entries.lock();
            if let Some(entry) = entries.get(&product_id) {
                if !entry.status.is_stale(now_ms(), self.ttl_ms) {
                    return Some(entry.status.favorited);
                }
            }
        }
        self.persisted.get_favorite(product_id)
    }

    /// Seed the cache from a bulk payload (a page's product list already
    /// carrying favorite flags). No network calls.
    pub fn warm_up(&self, statuses: &[FavoriteStatus]) {
        {
            let mut entries = self.entries.lock();
            for status in statuses {
                entries.insert(
                    status.product_id,
                    CacheEntry {
                        status: *status,
                        kind: EntryKind::Confirmed,
                    },
                );
            }
        }

        // One storage write for the whole payload.
        let items: Vec<(u64, bool)> = statuses
            .iter()
            .map(|s| (s.product_id, s.favorited))
            .collect();
        self.persisted.save_favorites(&items);

        tracing::debug!(count = statuses.len(), "warmed favorite cache");
    }

    /// Look up statuses for every id not already fresh in cache.
    ///
    /// De-duplication by in-flight id is required, not an optimization:
    /// repeated intersection-observer triggers fire the same ids many
    /// times. Best-effort: a failed lookup leaves the cache unchanged
    /// for that id and is never propagated.
    pub async fn prefetch_statuses(&self, product_ids: &[u64]) {
        let claim = {
            let entries = self.entries.lock();
            let mut in_flight = self.in_flight.lock();
            let now = now_ms();

            let ids: Vec<u64> = product_ids
                .iter()
                .copied()
                .filter(|id| {
                    let fresh = entries
                        .get(id)
                        .map(|e| !e.status.is_stale(now, self.ttl_ms))
                        .unwrap_or(false);
                    !fresh && in_flight.insert(*id)
                })
                .collect();

            InFlightClaim {
                set: &self.in_flight,
                ids,
            }
        };

        for &product_id in &claim.ids {
            match self.api.get_favorite_status(product_id).await {
                Ok(status) => self.confirm(product_id, status.favorited),
                Err(failure) => {
                    // No negative caching of errors.
                    tracing::debug!(
                        product_id,
                        status = ?failure.status,
                        code = ?failure.code,
                        "favorite prefetch failed"
                    );
                }
            }
        }
    }

    /// Apply a local flip ahead of the server, remembering what to
    /// restore if the mutation is ultimately rejected.
    pub fn apply_optimistic(&self, product_id: u64, favorited: bool) {
        let mut entries = self.entries.lock();
        let previous = match entries.get(&product_id) {
            Some(CacheEntry {
                kind: EntryKind::Confirmed,
                status,
            }) => Some(status.favorited),
            // A chained optimistic update keeps the original baseline.
            Some(CacheEntry {
                kind: EntryKind::Optimistic { previous },
                ..
            }) => *previous,
            None => self.persisted.get_favorite(product_id),
        };

        entries.insert(
            product_id,
            CacheEntry {
                status: FavoriteStatus::new(product_id, favorited),
                kind: EntryKind::Optimistic { previous },
            },
        );
    }

    /// Record server truth. Also writes through to the persisted copy.
    pub fn confirm(&self, product_id: u64, favorited: bool) {
        self.entries.lock().insert(
            product_id,
            CacheEntry {
                status: FavoriteStatus::new(product_id, favorited),
                kind: EntryKind::Confirmed,
            },
        );
        self.persisted.save_favorite(product_id, favorited);
    }

    /// Undo an optimistic update after a terminal failure. Confirmed
    /// entries and unknown ids are left alone.
    pub fn rollback(&self, product_id: u64) {
        let mut entries = self.entries.lock();
        let Some(CacheEntry {
            kind: EntryKind::Optimistic { previous },
            ..
        }) = entries.get(&product_id).copied()
        else {
            return;
        };

        match previous {
            Some(favorited) => {
                entries.insert(
                    product_id,
                    CacheEntry {
                        status: FavoriteStatus::new(product_id, favorited),
                        kind: EntryKind::Confirmed,
                    },
                );
            }
            None => {
                entries.remove(&product_id);
            }
        }
    }

    /// Teardown sweep: drop in-memory and persisted entries older than
    /// the expiry window.
    pub fn cleanup_stale(&self) {
        let now = now_ms();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.status.is_stale(now, self.ttl_ms));
        let removed = before - entries.len();
        drop(entries);

        if removed > 0 {
            tracing::debug!(removed, "dropped stale in-memory favorite entries");
        }
        self.persisted.sweep_stale();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use favsync_core::{ApiFailure, MemoryStore};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::sync::Notify;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    #[derive(Default)]
    struct MockApi {
        status_calls: AtomicU64,
        statuses: Mutex<HashMap<u64, bool>>,
        failures: Mutex<VecDeque<ApiFailure>>,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl FavoriteApi for MockApi {
        async fn toggle_favorite(&self, product_id: u64) -> Result<bool, ApiFailure> {
            let mut statuses = self.statuses.lock();
            let state = statuses.entry(product_id).or_insert(false);
            *state = !*state;
            Ok(*state)
        }

        async fn get_favorite_status(&self, product_id: u64) -> Result<FavoriteStatus, ApiFailure> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if let Some(failure) = self.failures.lock().pop_front() {
                return Err(failure);
            }
            let favorited = self.statuses.lock().get(&product_id).copied().unwrap_or(false);
            Ok(FavoriteStatus::new(product_id, favorited))
        }
    }

    fn manager_with(api: Arc<MockApi>, ttl_ms: i64) -> CacheManager {
        let store = Arc::new(MemoryStore::new());
        CacheManager::new(api, PersistedCache::new(store, ttl_ms), ttl_ms)
    }

    #[tokio::test]
    async fn test_warm_up_seeds_without_network() {
        let api = Arc::new(MockApi::default());
        let manager = manager_with(api.clone(), DAY_MS);

        manager.warm_up(&[
            FavoriteStatus::new(1, true),
            FavoriteStatus::new(2, false),
        ]);

        assert_eq!(manager.status(1), Some(true));
        assert_eq!(manager.status(2), Some(false));
        assert_eq!(api.status_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prefetch_skips_fresh_entries() {
        let api = Arc::new(MockApi::default());
        let manager = manager_with(api.clone(), DAY_MS);

        manager.warm_up(&[FavoriteStatus::new(1, true)]);
        manager.prefetch_statuses(&[1, 2]).await;

        // Only the unknown id hits the network.
        assert_eq!(api.status_calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.status(2), Some(false));
    }

    #[tokio::test]
    async fn test_prefetch_deduplicates_in_flight_ids() {
        let gate = Arc::new(Notify::new());
        let api = Arc::new(MockApi {
            gate: Some(gate.clone()),
            ..MockApi::default()
        });
        let manager = Arc::new(manager_with(api.clone(), DAY_MS));

        let first = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.prefetch_statuses(&[5]).await })
        };
        tokio::task::yield_now().await;

        // Second prefetch for the same id while the first is suspended.
        manager.prefetch_statuses(&[5]).await;

        gate.notify_waiters();
        first.await.unwrap();

        assert_eq!(api.status_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_prefetch_releases_in_flight_ids() {
        let gate = Arc::new(Notify::new());
        let api = Arc::new(MockApi {
            gate: Some(gate.clone()),
            ..MockApi::default()
        });
        let manager = Arc::new(manager_with(api.clone(), DAY_MS));

        let first = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.prefetch_statuses(&[5]).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(api.status_calls.load(Ordering::SeqCst), 1);

        // Tear the first prefetch down while it is suspended in the
        // lookup, as a timeout wrapper or component teardown would.
        first.abort();
        let _ = first.await;

        // Leave a stored permit so the retried lookup proceeds at once.
        gate.notify_one();
        manager.prefetch_statuses(&[5]).await;

        assert_eq!(api.status_calls.load(Ordering::SeqCst), 2);
        assert_eq!(manager.status(5), Some(false));
    }

    #[tokio::test]
    async fn test_prefetch_failure_leaves_cache_unchanged() {
        let api = Arc::new(MockApi::default());
        api.failures.lock().push_back(ApiFailure::status(500));
        let manager = manager_with(api.clone(), DAY_MS);

        manager.prefetch_statuses(&[9]).await;
        assert_eq!(manager.status(9), None);

        // Not negatively cached: the next prefetch tries again.
        manager.prefetch_statuses(&[9]).await;
        assert_eq!(api.status_calls.load(Ordering::SeqCst), 2);
        assert_eq!(manager.status(9), Some(false));
    }

    #[tokio::test]
    async fn test_optimistic_rollback_restores_previous() {
        let api = Arc::new(MockApi::default());
        let manager = manager_with(api, DAY_MS);

        manager.confirm(3, true);
        manager.apply_optimistic(3, false);
        assert_eq!(manager.status(3), Some(false));

        manager.rollback(3);
        assert_eq!(manager.status(3), Some(true));
    }

    #[tokio::test]
    async fn test_optimistic_rollback_without_baseline_removes_entry() {
        let api = Arc::new(MockApi::default());
        let manager = manager_with(api, DAY_MS);

        manager.apply_optimistic(4, true);
        assert_eq!(manager.status(4), Some(true));

        manager.rollback(4);
        assert_eq!(manager.status(4), None);
    }

    #[tokio::test]
    async fn test_confirm_promotes_optimistic_entry() {
        let api = Arc::new(MockApi::default());
        let manager = manager_with(api, DAY_MS);

        manager.apply_optimistic(6, true);
        manager.confirm(6, true);

        // Rollback after confirmation is a no-op.
        manager.rollback(6);
        assert_eq!(manager.status(6), Some(true));
    }

    #[tokio::test]
    async fn test_cleanup_drops_stale_entries() {
        let api = Arc::new(MockApi::default());
        // Negative ttl: every entry is immediately stale.
        let manager = manager_with(api, -1);

        manager.confirm(1, true);
        manager.cleanup_stale();
        assert_eq!(manager.status(1), None);
    }
}

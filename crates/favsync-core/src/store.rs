//! Persisted favorite cache over an injected key/value port.
//!
//! The persisted copy is advisory only: it exists to avoid UI flicker
//! before the first network round-trip, after which the in-memory cache
//! is authoritative. The whole top-level mapping is read-modified-
//! written on every update; there is no sub-key atomic primitive.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::types::now_ms;

/// Fixed storage key for the favorite mapping.
pub const FAVORITE_CACHE_KEY: &str = "favorite_status_cache";

/// Synchronous key/value port. The original deployment backs this with
/// browser local storage; tests and standalone use get [`MemoryStore`].
pub trait FavoriteStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory key/value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FavoriteStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.inner.lock().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.inner.lock().remove(key);
    }
}

/// One persisted entry: `product_id -> { is_favorited, timestamp_ms }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFavorite {
    pub is_favorited: bool,
    pub timestamp_ms: i64,
}

/// Advisory persisted mirror of favorite state with a fixed expiry
/// window. Entries older than the window are discarded on read and
/// removed from storage.
pub struct PersistedCache {
    store: Arc<dyn FavoriteStore>,
    ttl_ms: i64,
}

impl PersistedCache {
    pub fn new(store: Arc<dyn FavoriteStore>, ttl_ms: i64) -> Self {
        Self { store, ttl_ms }
    }

    /// Record the favorite state of one product.
    pub fn save_favorite(&self, product_id: u64, is_favorited: bool) {
        let mut map = self.load_map();
        map.insert(
            product_id.to_string(),
            StoredFavorite {
                is_favorited,
                timestamp_ms: now_ms(),
            },
        );
        self.save_map(&map);
    }

    /// Record favorite state for many products with a single storage
    /// write. A no-op for an empty slice.
    pub fn save_favorites(&self, items: &[(u64, bool)]) {
        if items.is_empty() {
            return;
        }

        let mut map = self.load_map();
        let now = now_ms();
        for &(product_id, is_favorited) in items {
            map.insert(
                product_id.to_string(),
                StoredFavorite {
                    is_favorited,
                    timestamp_ms: now,
                },
            );
        }
        self.save_map(&map);
    }

    /// Last persisted state for one product, or `None` when absent or
    /// stale. A stale entry is removed from storage as a side effect.
    pub fn get_favorite(&self, product_id: u64) -> Option<bool> {
        let mut map = self.load_map();
        let key = product_id.to_string();
        let entry = map.get(&key).copied()?;

        if now_ms().saturating_sub(entry.timestamp_ms) > self.ttl_ms {
            map.remove(&key);
            self.save_map(&map);
            return None;
        }

        Some(entry.is_favorited)
    }

    /// Drop every entry older than the expiry window.
    pub fn sweep_stale(&self) {
        let mut map = self.load_map();
        let now = now_ms();
        let before = map.len();
        map.retain(|_, entry| now.saturating_sub(entry.timestamp_ms) <= self.ttl_ms);

        let removed = before - map.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = map.len(), "swept stale favorite entries");
            self.save_map(&map);
        }
    }

    pub fn clear(&self) {
        self.store.remove(FAVORITE_CACHE_KEY);
    }

    fn load_map(&self) -> HashMap<String, StoredFavorite> {
        let Some(raw) = self.store.get(FAVORITE_CACHE_KEY) else {
            return HashMap::new();
        };

        match serde_json::from_str(&raw) {
            Ok(map) => map,
            Err(e) => {
                // Corrupt payloads are discarded rather than surfaced.
                tracing::warn!(error = %e, "discarding unreadable favorite cache");
                self.store.remove(FAVORITE_CACHE_KEY);
                HashMap::new()
            }
        }
    }

    fn save_map(&self, map: &HashMap<String, StoredFavorite>) {
        match serde_json::to_string(map) {
            Ok(json) => self.store.set(FAVORITE_CACHE_KEY, &json),
            Err(e) => tracing::warn!(error = %e, "failed to serialize favorite cache"),
        }
    }
}

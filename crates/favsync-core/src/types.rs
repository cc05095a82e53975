use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Last known favorite state of one product for the current user.
///
/// Lives in two places: the in-memory cache owned by the cache manager
/// (authoritative once a network round-trip succeeds) and the persisted
/// key/value store (advisory, exists only to avoid a cold start before
/// the network responds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteStatus {
    pub product_id: u64,
    pub favorited: bool,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

impl FavoriteStatus {
    pub fn new(product_id: u64, favorited: bool) -> Self {
        Self {
            product_id,
            favorited,
            timestamp_ms: now_ms(),
        }
    }

    /// True once the entry has outlived the expiry window.
    pub fn is_stale(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms.saturating_sub(self.timestamp_ms) > ttl_ms
    }
}

/// Operation queued against one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteOp {
    /// Ensure the product ends up favorited.
    Add,
    /// Ensure the product ends up not favorited.
    Remove,
    /// Flip whatever the current state is.
    Toggle,
}

/// A queued favorite operation awaiting flush.
///
/// Held transiently in the batch processor's pending map, keyed by
/// product id. A second operation for the same product before flush
/// replaces this one, it never appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOperation {
    pub product_id: u64,
    pub op: FavoriteOp,
    pub requested_at_ms: i64,
}

impl PendingOperation {
    pub fn new(product_id: u64, op: FavoriteOp) -> Self {
        Self {
            product_id,
            op,
            requested_at_ms: now_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_staleness() {
        let status = FavoriteStatus {
            product_id: 1,
            favorited: true,
            timestamp_ms: 1_000,
        };

        let ttl = 24 * 60 * 60 * 1000;
        assert!(!status.is_stale(1_000 + ttl, ttl));
        assert!(status.is_stale(1_000 + ttl + 1, ttl));
    }

    #[test]
    fn test_fresh_status_is_not_stale() {
        let status = FavoriteStatus::new(42, false);
        assert!(!status.is_stale(now_ms(), 24 * 60 * 60 * 1000));
    }
}

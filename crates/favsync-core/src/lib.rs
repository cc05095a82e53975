// favsync-core - Pure favorite-state logic
//
// Data types, error classification, retry policy, persisted cache
// records and configuration. No async, no network I/O: everything in
// this crate is deterministic and unit-testable without a runtime.
//
// Async orchestration (cache manager, debounce, batching, retry
// execution) lives in favsync-client.

pub mod config;
pub mod error;
pub mod retry;
pub mod store;
pub mod types;

pub use config::{CacheConfig, DebounceConfig, RetryConfig, SyncConfig};
pub use error::{ApiFailure, FavoriteError};
pub use retry::{AttemptState, RetryPolicy};
pub use store::{FavoriteStore, MemoryStore, PersistedCache, StoredFavorite, FAVORITE_CACHE_KEY};
pub use types::{now_ms, FavoriteOp, FavoriteStatus, PendingOperation};

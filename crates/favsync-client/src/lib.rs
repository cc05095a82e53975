// favsync-client - Async favorite-state orchestration
//
// Coordinates the pieces between a UI toggle event and server truth:
//
//   toggle -> debounce (coalesce repeats) -> retry executor -> mutation
//          -> cache manager reconciles -> UI re-renders from cache
//
// The batch processor is an alternate entry path for bulk operations.
// All policy decisions (classification, retry eligibility, backoff)
// live in favsync-core; this crate only drives them over tokio.

pub mod api;
pub mod batch;
pub mod cache;
pub mod debounce;
pub mod executor;
pub mod metrics;

pub use api::{ErrorSink, FavoriteApi};
pub use batch::BatchProcessor;
pub use cache::CacheManager;
pub use debounce::DebouncedToggle;
pub use executor::RetryExecutor;
pub use metrics::{PerfMonitor, PerfSnapshot};

// External collaborators, injected as traits.
//
// The REST backend and the error-tracking service are out of scope;
// this layer only sees their request/response shapes.

use async_trait::async_trait;
use favsync_core::{ApiFailure, FavoriteError, FavoriteStatus};

/// Favorite endpoints exposed by the surrounding data-fetching layer.
#[async_trait]
pub trait FavoriteApi: Send + Sync {
    /// Toggle the favorite relation and return the new favorited state.
    async fn toggle_favorite(&self, product_id: u64) -> Result<bool, ApiFailure>;

    /// Current favorite state of one product.
    async fn get_favorite_status(&self, product_id: u64) -> Result<FavoriteStatus, ApiFailure>;
}

/// Optional external error-tracking sink, fire-and-forget.
///
/// Implementations must swallow their own failures; a broken sink must
/// never affect the caller.
pub trait ErrorSink: Send + Sync {
    fn report(&self, error: &FavoriteError, context: &str);
}

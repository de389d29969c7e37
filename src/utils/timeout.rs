use std::future::Future;
use std::time::Duration;

use crate::store::StoreError;

/// Run a store call under a deadline; expiry becomes [`StoreError::Timeout`].
///
/// The limit is per store call. A request that makes several calls (a
/// search over three collections, each with a possible fallback scan) can
/// take a multiple of it.
pub async fn with_deadline<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}

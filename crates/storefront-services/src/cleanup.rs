//! Best-effort removal of storage objects.
//!
//! Used after a failed bundle build and after a bundle delete. Failures leave orphaned
//! objects behind; they are logged and never surfaced to the caller.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use storefront_storage::Storage;

const CLEANUP_CONCURRENCY: usize = 16;

/// Delete `keys`, returning how many deletions failed.
pub async fn delete_objects_best_effort(storage: &Arc<dyn Storage>, keys: Vec<String>) -> usize {
    if keys.is_empty() {
        return 0;
    }

    let results = stream::iter(keys)
        .map(|key| {
            let s = storage.clone();
            async move {
                let result = s.delete(&key).await;
                (key, result)
            }
        })
        .buffer_unordered(CLEANUP_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

    let mut failed = 0;
    for (key, result) in results {
        if let Err(e) = result {
            failed += 1;
            tracing::warn!(
                error = %e,
                storage_key = %key,
                "Failed to delete storage object, leaving it orphaned"
            );
        }
    }
    failed
}

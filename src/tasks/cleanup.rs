//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache entries.
//! Reads already evict lazily; the sweep bounds memory held by keys that are
//! never read again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheManager;

/// Spawns a background task that calls [`CacheManager::clear_expired`]
/// every `cleanup_interval_secs` seconds.
///
/// Returns the task handle so shutdown can abort it.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(CacheManager::new());
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), 30);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(cache: Arc<CacheManager>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "starting cache expiry sweep");

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.clear_expired();
            if removed > 0 {
                info!(removed, "expiry sweep removed entries");
            } else {
                debug!("expiry sweep found nothing to remove");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{TtlPolicy, TtlTable};

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let policies = TtlTable::default().with(TtlPolicy::EventList, Some(Duration::from_millis(1)));
        let cache = Arc::new(CacheManager::with_policies(policies));
        cache.set("events:list:~:~:~", &vec![1, 2], TtlPolicy::EventList);
        cache.set("countries", &vec!["AU"], TtlPolicy::Countries);

        let handle = spawn_cleanup_task(cache.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        // Only the never-expiring entry is left, and nobody read the other
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().keys, vec!["countries".to_string()]);

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let handle = spawn_cleanup_task(Arc::new(CacheManager::new()), 1);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}

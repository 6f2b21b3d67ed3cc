use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct CachedUrl {
    url: String,
    created_at: Instant,
}

/// Signed URLs keyed by object key, bounded by capacity and per-entry TTL.
///
/// The TTL must stay below the signing window so that a cached URL is still valid when
/// it is handed out.
pub struct SignedUrlCache {
    ttl: Duration,
    entries: Mutex<LruCache<String, CachedUrl>>,
}

impl SignedUrlCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if entry.created_at.elapsed() < self.ttl => Some(entry.url.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, url: String) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.put(
            key,
            CachedUrl {
                url,
                created_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.pop(key);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_after_insert() {
        let cache = SignedUrlCache::new(10, Duration::from_secs(60));
        cache.insert("a.jpg".to_string(), "https://x/a.jpg?sig".to_string());
        assert_eq!(cache.get("a.jpg").as_deref(), Some("https://x/a.jpg?sig"));
        assert_eq!(cache.get("b.jpg"), None);
    }

    #[test]
    fn test_entries_expire() {
        let cache = SignedUrlCache::new(10, Duration::from_millis(10));
        cache.insert("a.jpg".to_string(), "u".to_string());
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("a.jpg"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let cache = SignedUrlCache::new(2, Duration::from_secs(60));
        cache.insert("a".to_string(), "1".to_string());
        cache.insert("b".to_string(), "2".to_string());
        assert!(cache.get("a").is_some());
        cache.insert("c".to_string(), "3".to_string());

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = SignedUrlCache::new(0, Duration::from_secs(60));
        cache.insert("a".to_string(), "1".to_string());
        cache.invalidate("a");
        assert!(cache.is_empty());

        cache.insert("b".to_string(), "2".to_string());
        cache.clear();
        assert!(cache.is_empty());
    }
}

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::ports::cache::ResponseCache;

const FALLBACK_CAPACITY: NonZeroUsize = NonZeroUsize::new(64).unwrap();

struct Entry {
    body: String,
    expires_at: Instant,
}

/// In-process LRU for catalogue responses, keyed by request path.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, Entry>>,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or_else(|| {
            tracing::warn!(
                "cache.max_entries is 0, using {FALLBACK_CAPACITY} entries instead"
            );
            FALLBACK_CAPACITY
        });
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        let Ok(mut entries) = self.entries.lock() else {
            tracing::error!(key, "Cache lock poisoned, treating as miss");
            return None;
        };
        let expired = entries.peek(key)?.expires_at <= Instant::now();
        if expired {
            entries.pop(key);
            return None;
        }
        entries.get(key).map(|entry| entry.body.clone())
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) {
        let Ok(mut entries) = self.entries.lock() else {
            tracing::error!(key, "Cache lock poisoned, skipping write");
            return;
        };
        entries.put(
            key.to_owned(),
            Entry {
                body: value.to_owned(),
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_on_unknown_key() {
        let cache = MemoryCache::new(4);
        assert!(cache.get("/rooms").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn hit_after_set() {
        let cache = MemoryCache::new(4);
        cache.set("/rooms", "[]", Duration::from_secs(60));
        assert_eq!(cache.get("/rooms").as_deref(), Some("[]"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn expired_entry_is_dropped() {
        let cache = MemoryCache::new(4);
        cache.set("/rooms/1", "{}", Duration::ZERO);
        assert!(cache.get("/rooms/1").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let cache = MemoryCache::new(2);
        cache.set("/rooms/a", "a", Duration::from_secs(60));
        cache.set("/rooms/b", "b", Duration::from_secs(60));
        // touch "a" so "b" becomes the eviction candidate
        assert!(cache.get("/rooms/a").is_some());
        cache.set("/rooms/c", "c", Duration::from_secs(60));
        assert!(cache.get("/rooms/b").is_none());
        assert!(cache.get("/rooms/a").is_some());
        assert!(cache.get("/rooms/c").is_some());
    }

    #[test]
    fn zero_capacity_falls_back() {
        let cache = MemoryCache::new(0);
        cache.set("/rooms", "[]", Duration::from_secs(60));
        assert!(cache.get("/rooms").is_some());
    }

    #[test]
    fn shared_across_threads() {
        use std::sync::Arc;
        let cache = Arc::new(MemoryCache::new(32));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let c = Arc::clone(&cache);
                std::thread::spawn(move || {
                    let key = format!("/rooms/{i}");
                    c.set(&key, "{}", Duration::from_secs(60));
                    c.get(&key).is_some()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}

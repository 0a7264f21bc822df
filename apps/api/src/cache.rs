//! Bounded LRU memo with a per-entry time-to-live.
//!
//! Backs the question cache and the extraction cache. Entries expire a fixed time
//! after insertion; reads do not extend them.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use lru::LruCache;
use tokio::time::Instant;

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

pub struct TtlCache<K: Hash + Eq, V: Clone> {
    entries: Mutex<LruCache<K, Entry<V>>>,
    ttl: Duration,
}

impl<K: Hash + Eq, V: Clone> TtlCache<K, V> {
    /// A capacity of zero is treated as one.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.lock();
        let expired = entries
            .peek(key)
            .map(|e| e.inserted_at.elapsed() >= self.ttl)?;
        if expired {
            entries.pop(key);
            return None;
        }
        entries.get(key).map(|e| e.value.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        self.lock().put(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<K, Entry<V>>> {
        // A poisoned lock only means another request panicked mid-insert; the map is still usable.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_hit_then_expiry() {
        let cache = TtlCache::new(9, Duration::from_secs(3600));
        cache.insert("k", "first".to_string());

        assert_eq!(cache.get(&"k").as_deref(), Some("first"));

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(cache.get(&"k").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_do_not_extend_lifetime() {
        let cache = TtlCache::new(9, Duration::from_secs(10));
        cache.insert(1, 1);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.get(&1), Some(1));
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let cache = TtlCache::new(2, Duration::from_secs(60));
        cache.insert(0, "zero");
        cache.insert(1, "one");
        // Touch 0 so that 1 becomes the eviction target.
        assert!(cache.get(&0).is_some());
        cache.insert(2, "two");

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&1).is_none());
        assert!(cache.get(&0).is_some());
        assert!(cache.get(&2).is_some());
    }

    #[test]
    fn test_zero_capacity_holds_one_entry() {
        let cache = TtlCache::new(0, Duration::from_secs(60));
        cache.insert(0, 0);
        cache.insert(1, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&1), Some(1));
    }
}

//! TTL cache for upstream fetch results
//!
//! Read-through with insert-time expiry; entries are dropped on the
//! first get past their TTL. No explicit invalidation beyond TTL.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Thread-safe TTL cache keyed by `K`
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self { entries: Mutex::new(HashMap::new()), ttl }
    }

    /// Get a cached value. Returns None on miss or expired entry.
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().await;

        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert a value, resetting its TTL
    pub async fn put(&self, key: K, value: V) {
        let mut entries = self.entries.lock().await;
        entries.insert(key, CacheEntry { value, inserted_at: Instant::now() });
    }

    /// Number of entries currently held (including not-yet-evicted expired ones)
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop all entries
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hit_and_miss() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        assert!(cache.get(&"a".to_string()).await.is_none());

        cache.put("a".to_string(), 1).await;
        assert_eq!(cache.get(&"a".to_string()).await, Some(1));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_millis(1));
        cache.put("ephemeral".to_string(), 1).await;

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(cache.get(&"ephemeral".to_string()).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_put_resets_ttl() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_millis(50));
        cache.put("k".to_string(), 1).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        cache.put("k".to_string(), 2).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        // 60ms after the first put, but only 30ms after the refresh
        assert_eq!(cache.get(&"k".to_string()).await, Some(2));
    }
}

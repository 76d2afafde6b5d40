//! Process-local TTL cache for memoizing expensive or rate-limited lookups.
//!
//! Entries are re-derivable, never authoritative: the cache is lost on
//! restart and is not shared across instances. Callers that need a durable
//! variant back the same contract with a database row instead.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CacheEntry<T> {
    value: T,
    inserted_at: Instant,
    expires_at: Instant,
}

/// Time-boxed key→value store with a size bound.
///
/// Explicitly constructed and injected (never a module-level singleton) so
/// each client owns its own TTL and capacity, and tests can build throwaway
/// instances. Interior mutability goes through a `Mutex` because tokio tasks
/// are scheduled preemptively across worker threads.
pub struct TtlCache<T> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    ttl: Duration,
    max_entries: usize,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Fetch a live entry. Expired entries are evicted lazily here; an
    /// expired hit behaves exactly like a miss.
    pub fn get(&self, key: &str) -> Option<T> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a value with expiry `now + ttl`. When the map is at capacity
    /// the oldest ~20% of entries (by insertion time, not recency of use)
    /// are dropped first.
    pub fn insert(&self, key: String, value: T) {
        let now = Instant::now();
        let mut entries = self.lock();

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let evict_count = (self.max_entries / 5).max(1);
            let mut by_age: Vec<(String, Instant)> = entries
                .iter()
                .map(|(k, e)| (k.clone(), e.inserted_at))
                .collect();
            by_age.sort_by_key(|(_, inserted_at)| *inserted_at);
            for (old_key, _) in by_age.into_iter().take(evict_count) {
                entries.remove(&old_key);
            }
            tracing::debug!(evicted = evict_count, "Cache at capacity, evicted oldest entries");
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        // A poisoned lock only means another thread panicked mid-insert;
        // the map itself is still structurally sound.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_within_ttl_skips_the_producer() {
        let cache: TtlCache<String> = TtlCache::new(Duration::from_secs(300), 100);
        let mut producer_calls = 0;

        for _ in 0..2 {
            if cache.get("filings:320193:1:20:10-K").is_none() {
                producer_calls += 1;
                cache.insert("filings:320193:1:20:10-K".to_string(), "payload".to_string());
            }
        }

        assert_eq!(producer_calls, 1);
        assert_eq!(cache.get("filings:320193:1:20:10-K").as_deref(), Some("payload"));
    }

    #[test]
    fn expired_entry_reads_as_miss() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_millis(10), 100);
        cache.insert("k".to_string(), 7);
        assert_eq!(cache.get("k"), Some(7));

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get("k"), None);
        // Lazy eviction removed the stale entry on read.
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_past_capacity_evicts_oldest_block() {
        let cache: TtlCache<usize> = TtlCache::new(Duration::from_secs(300), 10);
        for i in 0..10 {
            cache.insert(format!("k{}", i), i);
            std::thread::sleep(Duration::from_millis(1));
        }
        let before = cache.len();
        cache.insert("overflow".to_string(), 99);

        assert!(cache.len() < before + 1);
        // The newest entry survives; the oldest block went first.
        assert_eq!(cache.get("overflow"), Some(99));
        assert_eq!(cache.get("k0"), None);
        assert_eq!(cache.get("k1"), None);
    }

    #[test]
    fn reinserting_existing_key_does_not_evict() {
        let cache: TtlCache<usize> = TtlCache::new(Duration::from_secs(300), 5);
        for i in 0..5 {
            cache.insert(format!("k{}", i), i);
        }
        cache.insert("k2".to_string(), 42);
        assert_eq!(cache.len(), 5);
        assert_eq!(cache.get("k2"), Some(42));
    }
}

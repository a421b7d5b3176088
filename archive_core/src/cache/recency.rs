//! Fixed-capacity recency set used to skip redundant user writes.

use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use crate::error::{ArchiveError, ArchiveResult};

/// Default number of user ids remembered by the bot.
pub const DEFAULT_USER_CACHE_SIZE: usize = 1000;

/// Thread-safe least-recently-used set of keys.
///
/// `add` is the only mutating operation. It reports whether the key was
/// already resident, which callers use as a "skip the backing write" signal.
pub struct RecencyCache<K: Hash + Eq> {
    inner: Mutex<LruCache<K, ()>>,
}

impl<K: Hash + Eq> RecencyCache<K> {
    pub fn new(max_size: usize) -> ArchiveResult<Self> {
        let cap = NonZeroUsize::new(max_size).ok_or_else(|| {
            ArchiveError::InvalidConfiguration(
                "recency cache size must be at least 1".to_string(),
            )
        })?;

        Ok(Self {
            inner: Mutex::new(LruCache::new(cap)),
        })
    }

    /// Mark `key` as most recently used.
    ///
    /// Returns `true` if the key was already present (cache hit). On a miss the
    /// key is inserted and, if the cache was full, the least recently used key
    /// is evicted; `false` is returned.
    pub fn add(&self, key: K) -> bool {
        let mut lru = self.inner.lock();
        if lru.get(&key).is_some() {
            return true;
        }

        if let Some((_evicted, _)) = lru.push(key, ()) {
            log::trace!("recency cache full, evicted least recently used key");
        }
        false
    }

    /// Forget `key`, so the next `add` of it is a miss again.
    ///
    /// Returns whether the key was resident.
    pub fn remove(&self, key: &K) -> bool {
        self.inner.lock().pop(key).is_some()
    }

    /// Check residency without touching recency.
    #[cfg(test)]
    pub(crate) fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.inner.lock().cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const MAX_SIZE: usize = 10;

    fn populated_cache() -> RecencyCache<i64> {
        let cache = RecencyCache::new(MAX_SIZE).unwrap();
        for i in 0..MAX_SIZE as i64 {
            assert!(!cache.add(i));
        }
        cache
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let result = RecencyCache::<i64>::new(0);
        assert!(matches!(
            result,
            Err(ArchiveError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_new_key_misses_and_resident_key_hits() {
        let cache = RecencyCache::new(3).unwrap();
        assert!(!cache.add("alice"));
        assert!(cache.add("alice"));
        assert!(!cache.add("bob"));
        assert!(cache.add("alice"));
        assert!(cache.add("bob"));
    }

    #[test]
    fn test_full_cache_evicts_oldest() {
        let cache = populated_cache();
        // Nothing was promoted, so 0 is the least recently used key.
        assert!(!cache.add(MAX_SIZE as i64 + 1));
        assert!(!cache.contains(&0));
        assert!(!cache.add(0));
    }

    #[test]
    fn test_promoted_key_survives_eviction() {
        let cache = populated_cache();
        assert!(cache.add(0));
        assert!(!cache.add(MAX_SIZE as i64));
        // 1 became the oldest once 0 was promoted.
        assert!(!cache.contains(&1));
        assert!(cache.contains(&0));
        assert!(!cache.add(1));
        assert!(cache.add(0));
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let cache = RecencyCache::new(4).unwrap();
        for i in 0..100i64 {
            cache.add(i % 7);
            cache.add(i * 31 % 11);
            assert!(cache.len() <= 4);
        }
        assert_eq!(cache.capacity(), 4);
    }

    #[test]
    fn test_single_slot_cache() {
        let cache = RecencyCache::new(1).unwrap();
        assert_eq!(cache.len(), 0);
        assert!(!cache.add(1));
        assert!(cache.add(1));
        assert!(!cache.add(2));
        assert!(!cache.add(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_adds_keep_invariants() {
        let cache = Arc::new(RecencyCache::new(16).unwrap());
        std::thread::scope(|scope| {
            for t in 0..8i64 {
                let cache = cache.clone();
                scope.spawn(move || {
                    for i in 0..1_000i64 {
                        cache.add((t * 1_000 + i) % 40);
                    }
                });
            }
        });
        assert_eq!(cache.len(), 16);
    }

    #[test]
    fn test_concurrent_first_add_has_single_miss() {
        let cache = Arc::new(RecencyCache::new(8).unwrap());
        let barrier = Arc::new(std::sync::Barrier::new(8));
        let misses: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let cache = cache.clone();
                    let barrier = barrier.clone();
                    scope.spawn(move || {
                        barrier.wait();
                        usize::from(!cache.add(42i64))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });
        assert_eq!(misses, 1);
    }

    #[test]
    fn test_removed_key_misses_again() {
        let cache = populated_cache();
        assert!(cache.remove(&3));
        assert!(!cache.contains(&3));
        assert_eq!(cache.len(), MAX_SIZE - 1);

        assert!(!cache.add(3));
        assert!(cache.add(3));
        assert!(!cache.remove(&99));
    }
}

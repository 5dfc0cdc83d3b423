use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};

use super::Envelope;

/// Process-local cache layer: TTL-bounded, LRU-capped on overflow, safe for
/// concurrent reads. Eviction of the oldest-used entry on overflow is a
/// linear scan — fine at the capacities this runs at (a few thousand hot
/// keys), not meant to scale past that.
pub(crate) struct L1Cache {
    entries: DashMap<String, StoredEntry>,
    capacity: usize,
}

struct StoredEntry {
    payload: Vec<u8>,
    expires_at: Instant,
    last_used: Instant,
}

impl L1Cache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
        }
    }

    pub(crate) fn get<T: DeserializeOwned>(&self, key: &str) -> Option<(T, bool)> {
        let mut entry = self.entries.get_mut(key)?;
        let is_stale = Instant::now() >= entry.expires_at;
        entry.last_used = Instant::now();
        let envelope: Envelope<T> = serde_json::from_slice(&entry.payload).ok()?;
        Some((envelope.data, is_stale))
    }

    pub(crate) fn set<T: Serialize>(&self, key: String, value: &T, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let Ok(payload) = serde_json::to_vec(&Envelope::wrap(value)) else {
            return;
        };
        let now = Instant::now();
        self.entries.insert(
            key,
            StoredEntry {
                payload,
                expires_at: now + ttl,
                last_used: now,
            },
        );
        self.evict_if_over_capacity();
    }

    pub(crate) fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    pub(crate) fn invalidate_prefix(&self, prefix: &str) {
        self.entries.retain(|k, _| !k.starts_with(prefix));
    }

    fn evict_if_over_capacity(&self) {
        if self.entries.len() <= self.capacity {
            return;
        }
        if let Some(oldest_key) = self
            .entries
            .iter()
            .min_by_key(|e| e.last_used)
            .map(|e| e.key().clone())
        {
            self.entries.remove(&oldest_key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_and_reports_staleness() {
        let cache = L1Cache::new(10);
        cache.set("rate:AAPL".to_string(), &42u32, Duration::from_secs(60));
        let (value, stale) = cache.get::<u32>("rate:AAPL").unwrap();
        assert_eq!(value, 42);
        assert!(!stale);
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let cache = L1Cache::new(10);
        cache.set("rate:AAPL".to_string(), &42u32, Duration::ZERO);
        assert!(cache.get::<u32>("rate:AAPL").is_none());
    }

    #[test]
    fn evicts_least_recently_used_on_overflow() {
        let cache = L1Cache::new(2);
        cache.set("a".to_string(), &1u32, Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(5));
        cache.set("b".to_string(), &2u32, Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(5));
        cache.set("c".to_string(), &3u32, Duration::from_secs(60));
        assert!(cache.get::<u32>("a").is_none());
        assert!(cache.get::<u32>("b").is_some());
        assert!(cache.get::<u32>("c").is_some());
    }
}

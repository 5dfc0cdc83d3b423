use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};

use crate::config::CacheTtls;
use crate::singleflight::SingleFlight;

use super::{l1::L1Cache, l2::L2Cache, CacheCategory, CacheError};

/// The one logical cache interface sitting in front of L1 (process-local)
/// and L2 (shared remote), per §4.2. Read path: L1 -> L2 -> loader ->
/// write-back to both. L1 misses are single-flighted so a thundering herd
/// against the same key runs the loader once.
pub(crate) struct CacheTier {
    l1: L1Cache,
    l2: L2Cache,
    ttls: CacheTtls,
    loader_gate: SingleFlight<String, Vec<u8>, String>,
}

impl CacheTier {
    pub(crate) fn new(l1_capacity: usize, l2: L2Cache, ttls: CacheTtls) -> Self {
        Self {
            l1: L1Cache::new(l1_capacity),
            l2,
            ttls,
            loader_gate: SingleFlight::new(),
        }
    }

    /// Read-through: L1, then L2, then `loader`. Returns the value plus
    /// whether it came from a cache layer (as opposed to the loader).
    pub(crate) async fn get_or_load<T, F, Fut>(
        &self,
        category: CacheCategory,
        identity: &str,
        loader: F,
    ) -> Result<(T, bool), CacheError>
    where
        T: Serialize + DeserializeOwned + Clone + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CacheError>>,
    {
        let key = category.key(identity);
        let ttl = category.ttl(&self.ttls);

        if let Some((value, stale)) = self.l1.get::<T>(&key) {
            if !stale {
                return Ok((value, true));
            }
        }

        if let Some(value) = self.l2.get::<T>(&key).await? {
            self.l1.set(key.clone(), &value, ttl);
            return Ok((value, true));
        }

        let value = self.single_flight_load(&key, loader).await?;
        self.l1.set(key.clone(), &value, ttl);
        self.l2.set(&key, &value, ttl).await?;
        Ok((value, false))
    }

    /// Bypasses the read path and always invokes `loader`, writing the
    /// fresh result back to both layers — the cache-refresh write path.
    pub(crate) async fn refresh<T, F, Fut>(
        &self,
        category: CacheCategory,
        identity: &str,
        loader: F,
    ) -> Result<T, CacheError>
    where
        T: Serialize + DeserializeOwned + Clone + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CacheError>>,
    {
        let key = category.key(identity);
        let ttl = category.ttl(&self.ttls);
        let value = loader().await?;
        self.l1.set(key.clone(), &value, ttl);
        self.l2.set(&key, &value, ttl).await?;
        Ok(value)
    }

    /// Most recent cached success for a key, ignoring expiry — the first
    /// rung of the feed clients' fallback ladder (§4.3).
    pub(crate) async fn get_stale<T>(&self, category: CacheCategory, identity: &str) -> Option<T>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        let key = category.key(identity);
        if let Some((value, _)) = self.l1.get::<T>(&key) {
            return Some(value);
        }
        self.l2.get::<T>(&key).await.ok().flatten()
    }

    pub(crate) async fn invalidate(&self, category: CacheCategory, identity: &str) -> Result<(), CacheError> {
        let key = category.key(identity);
        self.l1.invalidate(&key);
        self.l2.invalidate(&key).await
    }

    /// Administrative category-wide purge. Never called from the hot path.
    pub(crate) async fn invalidate_category(&self, category: CacheCategory) -> Result<(), CacheError> {
        let prefix = category.key("");
        self.l1.invalidate_prefix(&prefix);
        self.l2.invalidate_prefix(&prefix).await
    }

    async fn single_flight_load<T, F, Fut>(&self, key: &str, loader: F) -> Result<T, CacheError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CacheError>>,
    {
        let bytes = self
            .loader_gate
            .run(key.to_string(), async move {
                loader()
                    .await
                    .and_then(|v| serde_json::to_vec(&v).map_err(|e| CacheError::Backend(e.to_string())))
                    .map_err(|e| e.to_string())
            })
            .await
            .map_err(CacheError::Backend)?;
        serde_json::from_slice(&bytes).map_err(|e| CacheError::Backend(e.to_string()))
    }
}

/// Convenience wrapper used by call sites that want an `Arc<CacheTier>`.
pub(crate) type SharedCacheTier = Arc<CacheTier>;

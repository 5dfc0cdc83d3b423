use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};

use super::{CacheError, Envelope};

/// Shared remote cache layer: same keys as L1, longer TTLs, authoritative
/// across replicas. Also backs the rate limiter's token-bucket state
/// (§4.6), which needs a single shared counter regardless of which
/// replica an admission check lands on.
#[derive(Clone)]
pub(crate) struct L2Cache {
    conn: ConnectionManager,
}

impl L2Cache {
    pub(crate) async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        match raw {
            None => Ok(None),
            Some(bytes) => {
                let envelope: Envelope<T> = match serde_json::from_slice(&bytes) {
                    Ok(e) => e,
                    Err(_) => return Ok(None),
                };
                Ok(Some(envelope.data))
            }
        }
    }

    pub(crate) async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        if ttl.is_zero() {
            return Ok(());
        }
        let payload = serde_json::to_vec(&Envelope::wrap(value))
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(key, payload, ttl.as_secs().max(1))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(())
    }

    pub(crate) async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(())
    }

    pub(crate) async fn invalidate_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{prefix}*");
        let keys: Vec<String> = conn
            .keys(&pattern)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        if !keys.is_empty() {
            let _: () = conn
                .del(keys)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
        }
        Ok(())
    }

    /// Atomic increment used by the token-bucket admission check: returns
    /// the post-increment count. Refreshes the key's expiry on every call,
    /// which makes the window a rolling one rather than a fixed clock
    /// window — fine for admission control, not a precise leaky bucket.
    pub(crate) async fn incr_with_expiry(
        &self,
        key: &str,
        expiry: Duration,
    ) -> Result<i64, CacheError> {
        let mut conn = self.conn.clone();
        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, expiry.as_secs().max(1) as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(count)
    }
}

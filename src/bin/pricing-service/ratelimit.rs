use std::time::{SystemTime, UNIX_EPOCH};

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use crate::config::{RateLimitTier, RateLimitTiers};

/// Client admission tier (§4.6). Resolution of a client id to a tier isn't
/// pinned by the persisted data model, so we key off a naming convention
/// on the principal (`internal:*`, `premium:*`) with `Default` as the
/// fallback — see DESIGN.md for the rationale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ClientTier {
    Default,
    Premium,
    Internal,
}

pub(crate) fn tier_for_principal(principal: &str) -> ClientTier {
    if principal.starts_with("internal:") {
        ClientTier::Internal
    } else if principal.starts_with("premium:") {
        ClientTier::Premium
    } else {
        ClientTier::Default
    }
}

impl RateLimitTiers {
    fn params(&self, tier: ClientTier) -> RateLimitTier {
        match tier {
            ClientTier::Default => self.default,
            ClientTier::Premium => self.premium,
            ClientTier::Internal => self.internal,
        }
    }
}

/// Atomic token-bucket script: refills at `rate` tokens/ms up to
/// `capacity`, and consumes one token if available. Running this as a
/// single Lua script is what makes the check-and-decrement atomic across
/// replicas sharing the same Redis (§4.6's "atomic compare-and-increment").
const TOKEN_BUCKET_SCRIPT: &str = r#"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local rate = tonumber(ARGV[2])
local capacity = tonumber(ARGV[3])

local data = redis.call('HMGET', key, 'tokens', 'ts')
local tokens = tonumber(data[1])
local ts = tonumber(data[2])
if tokens == nil then
  tokens = capacity
  ts = now
end

local delta = now - ts
if delta < 0 then delta = 0 end
tokens = math.min(capacity, tokens + delta * rate)

local allowed = 0
if tokens >= 1 then
  allowed = 1
  tokens = tokens - 1
end

redis.call('HMSET', key, 'tokens', tokens, 'ts', now)
redis.call('EXPIRE', key, 120)

return {allowed, tokens}
"#;

pub(crate) struct RateLimiter {
    conn: ConnectionManager,
    script: Script,
    tiers: RateLimitTiers,
}

pub(crate) struct Admission {
    pub(crate) allowed: bool,
    pub(crate) retry_after_secs: u64,
}

impl RateLimiter {
    pub(crate) fn new(conn: ConnectionManager, tiers: RateLimitTiers) -> Self {
        Self {
            conn,
            script: Script::new(TOKEN_BUCKET_SCRIPT),
            tiers,
        }
    }

    pub(crate) async fn admit(&self, principal: &str) -> Result<Admission, redis::RedisError> {
        let tier = tier_for_principal(principal);
        let params = self.tiers.params(tier);
        let capacity = params.burst_capacity as f64;
        let rate_per_ms = params.requests_per_minute as f64 / 60_000.0;
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as f64;

        let key = format!("ratelimit:{principal}");
        let mut conn = self.conn.clone();
        let (allowed, _tokens): (i64, f64) = self
            .script
            .key(key)
            .arg(now_ms)
            .arg(rate_per_ms)
            .arg(capacity)
            .invoke_async(&mut conn)
            .await?;

        let retry_after_secs = if allowed == 1 {
            0
        } else {
            // Time until one more token refills.
            (1.0 / rate_per_ms / 1000.0).ceil().max(1.0) as u64
        };

        Ok(Admission {
            allowed: allowed == 1,
            retry_after_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_and_premium_prefixes_resolve_tiers() {
        assert_eq!(tier_for_principal("internal:ops-console"), ClientTier::Internal);
        assert_eq!(tier_for_principal("premium:acme-capital"), ClientTier::Premium);
        assert_eq!(tier_for_principal("acme-capital"), ClientTier::Default);
    }
}

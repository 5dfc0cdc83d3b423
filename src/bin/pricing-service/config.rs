use std::str::FromStr;
use std::time::Duration;

use bigdecimal::BigDecimal;

use crate::cli::Opt;

/// Per-category cache TTLs (§4.2). A TTL of zero disables caching for that
/// category.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CacheTtls {
    pub(crate) borrow_rate: Duration,
    pub(crate) volatility: Duration,
    pub(crate) event_risk: Duration,
    pub(crate) broker_config: Duration,
    pub(crate) calc_result: Duration,
    pub(crate) fallback_min_rate: Duration,
}

/// Kernel-level defaults resolved once from the environment (§6).
#[derive(Clone, Debug)]
pub(crate) struct KernelDefaults {
    pub(crate) global_minimum_borrow_rate: BigDecimal,
    pub(crate) volatility_factor: BigDecimal,
    pub(crate) event_risk_factor: BigDecimal,
    pub(crate) days_in_year: i64,
    pub(crate) markup_percentage: BigDecimal,
    pub(crate) transaction_fee_flat: BigDecimal,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct ResilienceConfig {
    pub(crate) per_call_timeout: Duration,
    pub(crate) max_attempts: u32,
    pub(crate) request_deadline: Duration,
    pub(crate) breaker_cooldown: Duration,
    pub(crate) breaker_failure_threshold: u32,
    pub(crate) breaker_window_size: u32,
    pub(crate) breaker_half_open_successes: u32,
}

#[derive(Clone, Debug)]
pub(crate) struct FeedEndpoint {
    pub(crate) base_url: reqwest::Url,
    pub(crate) api_key: String,
}

#[derive(Clone, Debug)]
pub(crate) struct FeedsConfig {
    pub(crate) seclend: FeedEndpoint,
    pub(crate) volatility: FeedEndpoint,
    pub(crate) events: FeedEndpoint,
}

/// Client tiers for the rate limiter (§4.6). The "default" tier is applied
/// when a client has no explicit tier recorded.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RateLimitTier {
    pub(crate) requests_per_minute: u32,
    pub(crate) burst_capacity: u32,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct RateLimitTiers {
    pub(crate) default: RateLimitTier,
    pub(crate) premium: RateLimitTier,
    pub(crate) internal: RateLimitTier,
}

#[derive(Clone, Debug)]
pub(crate) struct Config {
    pub(crate) bind: std::net::SocketAddr,
    pub(crate) database_url: String,
    pub(crate) cache_url: String,
    pub(crate) cache_ttls: CacheTtls,
    pub(crate) kernel_defaults: KernelDefaults,
    pub(crate) feeds: FeedsConfig,
    pub(crate) resilience: ResilienceConfig,
    pub(crate) rate_limits: RateLimitTiers,
    pub(crate) audit_queue_capacity: usize,
}

fn parse_decimal(s: &str, field: &str) -> anyhow::Result<BigDecimal> {
    BigDecimal::from_str(s).map_err(|e| anyhow::anyhow!("invalid {field} {s:?}: {e}"))
}

impl Config {
    pub(crate) fn from_opt(opt: &Opt) -> anyhow::Result<Self> {
        Ok(Self {
            bind: opt.bind,
            database_url: opt.database_url.clone(),
            cache_url: opt.cache_url.clone(),
            cache_ttls: CacheTtls {
                borrow_rate: Duration::from_secs(opt.cache_ttl_borrow_rate),
                volatility: Duration::from_secs(opt.cache_ttl_volatility),
                event_risk: Duration::from_secs(opt.cache_ttl_event_risk),
                broker_config: Duration::from_secs(opt.cache_ttl_broker_config),
                calc_result: Duration::from_secs(opt.cache_ttl_calculation),
                fallback_min_rate: Duration::from_secs(opt.cache_ttl_fallback_min_rate),
            },
            kernel_defaults: KernelDefaults {
                global_minimum_borrow_rate: parse_decimal(
                    &opt.default_minimum_borrow_rate,
                    "DEFAULT_MINIMUM_BORROW_RATE",
                )?,
                volatility_factor: parse_decimal(
                    &opt.default_volatility_factor,
                    "DEFAULT_VOLATILITY_FACTOR",
                )?,
                event_risk_factor: parse_decimal(
                    &opt.default_event_risk_factor,
                    "DEFAULT_EVENT_RISK_FACTOR",
                )?,
                days_in_year: opt.days_in_year,
                markup_percentage: parse_decimal(
                    &opt.default_markup_percentage,
                    "DEFAULT_MARKUP_PERCENTAGE",
                )?,
                transaction_fee_flat: parse_decimal(
                    &opt.default_transaction_fee_flat,
                    "DEFAULT_TRANSACTION_FEE_FLAT",
                )?,
            },
            feeds: FeedsConfig {
                seclend: FeedEndpoint {
                    base_url: opt.seclend_api_base_url.clone(),
                    api_key: opt.seclend_api_key.clone(),
                },
                volatility: FeedEndpoint {
                    base_url: opt.volatility_api_base_url.clone(),
                    api_key: opt.volatility_api_key.clone(),
                },
                events: FeedEndpoint {
                    base_url: opt.event_api_base_url.clone(),
                    api_key: opt.event_api_key.clone(),
                },
            },
            resilience: ResilienceConfig {
                per_call_timeout: Duration::from_millis(opt.feed_timeout_ms),
                max_attempts: opt.feed_max_attempts,
                request_deadline: Duration::from_millis(opt.request_deadline_ms),
                breaker_cooldown: Duration::from_secs(opt.breaker_cooldown_secs),
                breaker_failure_threshold: opt.breaker_failure_threshold,
                breaker_window_size: opt.breaker_window_size,
                breaker_half_open_successes: opt.breaker_half_open_successes,
            },
            rate_limits: RateLimitTiers {
                default: RateLimitTier {
                    requests_per_minute: opt.default_rate_limit,
                    burst_capacity: 100,
                },
                premium: RateLimitTier {
                    requests_per_minute: 300,
                    burst_capacity: 100,
                },
                internal: RateLimitTier {
                    requests_per_minute: 1000,
                    burst_capacity: 100,
                },
            },
            audit_queue_capacity: opt.audit_queue_capacity,
        })
    }
}

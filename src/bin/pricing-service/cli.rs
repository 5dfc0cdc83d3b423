use std::net::SocketAddr;

use clap::Parser;
use locate_fee_pricing::build_version;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(clap::Parser, Clone)]
#[clap(version = build_version())]
pub(crate) struct Opt {
    #[clap(long, short)]
    pub(crate) verbose: bool,

    #[clap(long, default_value = "[::]:3000", env = "PRICING_BIND")]
    pub(crate) bind: SocketAddr,

    #[clap(long, env = "DATABASE_URL")]
    pub(crate) database_url: String,

    #[clap(long, env = "CACHE_URL")]
    pub(crate) cache_url: String,

    #[clap(long, env = "SECLEND_API_BASE_URL")]
    pub(crate) seclend_api_base_url: reqwest::Url,
    #[clap(long, env = "SECLEND_API_KEY")]
    pub(crate) seclend_api_key: String,

    #[clap(long, env = "VOLATILITY_API_BASE_URL")]
    pub(crate) volatility_api_base_url: reqwest::Url,
    #[clap(long, env = "VOLATILITY_API_KEY")]
    pub(crate) volatility_api_key: String,

    #[clap(long, env = "EVENT_API_BASE_URL")]
    pub(crate) event_api_base_url: reqwest::Url,
    #[clap(long, env = "EVENT_API_KEY")]
    pub(crate) event_api_key: String,

    #[clap(long, env = "CACHE_TTL_BORROW_RATE", default_value_t = 300)]
    pub(crate) cache_ttl_borrow_rate: u64,
    #[clap(long, env = "CACHE_TTL_VOLATILITY", default_value_t = 900)]
    pub(crate) cache_ttl_volatility: u64,
    #[clap(long, env = "CACHE_TTL_EVENT_RISK", default_value_t = 3600)]
    pub(crate) cache_ttl_event_risk: u64,
    #[clap(long, env = "CACHE_TTL_BROKER_CONFIG", default_value_t = 1800)]
    pub(crate) cache_ttl_broker_config: u64,
    #[clap(long, env = "CACHE_TTL_CALCULATION", default_value_t = 60)]
    pub(crate) cache_ttl_calculation: u64,
    #[clap(long, env = "CACHE_TTL_FALLBACK_MIN_RATE", default_value_t = 86400)]
    pub(crate) cache_ttl_fallback_min_rate: u64,

    #[clap(long, env = "DEFAULT_MINIMUM_BORROW_RATE", default_value = "0.0001")]
    pub(crate) default_minimum_borrow_rate: String,
    #[clap(long, env = "DEFAULT_VOLATILITY_FACTOR", default_value = "0.01")]
    pub(crate) default_volatility_factor: String,
    #[clap(long, env = "DEFAULT_EVENT_RISK_FACTOR", default_value = "0.05")]
    pub(crate) default_event_risk_factor: String,
    #[clap(long, env = "DAYS_IN_YEAR", default_value_t = 365)]
    pub(crate) days_in_year: i64,
    #[clap(long, env = "DEFAULT_MARKUP_PERCENTAGE", default_value = "5.0")]
    pub(crate) default_markup_percentage: String,
    #[clap(long, env = "DEFAULT_TRANSACTION_FEE_FLAT", default_value = "25.0")]
    pub(crate) default_transaction_fee_flat: String,
    #[clap(long, env = "DEFAULT_RATE_LIMIT", default_value_t = 60)]
    pub(crate) default_rate_limit: u32,

    /// Per-feed call timeout, in milliseconds.
    #[clap(long, env = "FEED_TIMEOUT_MS", default_value_t = 5000)]
    pub(crate) feed_timeout_ms: u64,
    /// Max attempts per feed call including the first.
    #[clap(long, env = "FEED_MAX_ATTEMPTS", default_value_t = 3)]
    pub(crate) feed_max_attempts: u32,
    /// End-to-end request deadline, in milliseconds.
    #[clap(long, env = "REQUEST_DEADLINE_MS", default_value_t = 100)]
    pub(crate) request_deadline_ms: u64,

    /// Circuit breaker cooldown before probing again, in seconds.
    #[clap(long, env = "BREAKER_COOLDOWN_SECS", default_value_t = 60)]
    pub(crate) breaker_cooldown_secs: u64,
    /// Failures within the rolling window that trip the breaker.
    #[clap(long, env = "BREAKER_FAILURE_THRESHOLD", default_value_t = 5)]
    pub(crate) breaker_failure_threshold: u32,
    /// Rolling window size (in calls) the failure threshold is measured over.
    #[clap(long, env = "BREAKER_WINDOW_SIZE", default_value_t = 10)]
    pub(crate) breaker_window_size: u32,
    /// Consecutive successes in HALF_OPEN required to close the breaker.
    #[clap(long, env = "BREAKER_HALF_OPEN_SUCCESSES", default_value_t = 3)]
    pub(crate) breaker_half_open_successes: u32,

    /// Bound on the audit emission queue.
    #[clap(long, env = "AUDIT_QUEUE_CAPACITY", default_value_t = 4096)]
    pub(crate) audit_queue_capacity: usize,
}

impl Opt {
    pub(crate) fn init_logger(&self) -> anyhow::Result<()> {
        let level = if self.verbose { "debug" } else { "info" };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
        Ok(())
    }
}

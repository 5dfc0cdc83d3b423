use std::time::Duration;

use crate::config::CacheTtls;

/// Cache categories and their default TTLs (§4.2). The key prefix doubles
/// as the category discriminant so admin purges can target a whole
/// category with a prefix scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CacheCategory {
    BorrowRate,
    Volatility,
    EventRisk,
    BrokerConfig,
    CalcResult,
    FallbackMinRate,
}

impl CacheCategory {
    fn prefix(self) -> &'static str {
        match self {
            CacheCategory::BorrowRate => "rate",
            CacheCategory::Volatility => "vol",
            CacheCategory::EventRisk => "event",
            CacheCategory::BrokerConfig => "broker",
            CacheCategory::CalcResult => "calc",
            CacheCategory::FallbackMinRate => "fbrate",
        }
    }

    pub(crate) fn key(self, identity: &str) -> String {
        format!("{}:{}", self.prefix(), identity)
    }

    pub(crate) fn ttl(self, ttls: &CacheTtls) -> Duration {
        match self {
            CacheCategory::BorrowRate => ttls.borrow_rate,
            CacheCategory::Volatility => ttls.volatility,
            CacheCategory::EventRisk => ttls.event_risk,
            CacheCategory::BrokerConfig => ttls.broker_config,
            CacheCategory::CalcResult => ttls.calc_result,
            CacheCategory::FallbackMinRate => ttls.fallback_min_rate,
        }
    }
}

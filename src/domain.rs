//! Shared data model: the entities of §3 plus the small enums they're built
//! from. Types here are pure data — no I/O, no caching concerns attached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::number::{Money, Rate};

/// Borrow difficulty tier for a security, per SecLend / the reference store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BorrowStatus {
    Easy,
    Medium,
    Hard,
}

/// How a broker charges its flat-or-percentage transaction fee.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TxnFeeType {
    Flat,
    Percentage,
}

/// Where a resolved input actually came from. Attached to every value the
/// orchestrator assembles so the audit trail and (for rates) the response
/// can say whether a number is live, cached, or a fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Live,
    FreshCache,
    StaleCache,
    PersistedFallback,
    GlobalDefault,
}

impl Provenance {
    pub fn is_fallback(self) -> bool {
        !matches!(self, Provenance::Live | Provenance::FreshCache)
    }

    /// Wire label for the `source` field of the rates response (§6):
    /// fallback tiers are prefixed so a client can tell at a glance that a
    /// number didn't come from the live feed, matching scenario 5's
    /// `FALLBACK_STALE_CACHE`.
    pub fn source_label(self) -> &'static str {
        match self {
            Provenance::Live => "LIVE",
            Provenance::FreshCache => "FRESH_CACHE",
            Provenance::StaleCache => "FALLBACK_STALE_CACHE",
            Provenance::PersistedFallback => "FALLBACK_PERSISTED",
            Provenance::GlobalDefault => "FALLBACK_GLOBAL_DEFAULT",
        }
    }
}

/// A tagged value plus where it came from. Every fan-out branch in the
/// orchestrator resolves to one of these instead of a bare value, so
/// fallback can never silently masquerade as a live read.
#[derive(Clone, Debug, PartialEq)]
pub struct Sourced<T> {
    pub value: T,
    pub provenance: Provenance,
}

impl<T> Sourced<T> {
    pub fn live(value: T) -> Self {
        Self {
            value,
            provenance: Provenance::Live,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sourced<U> {
        Sourced {
            value: f(self.value),
            provenance: self.provenance,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Security {
    pub ticker: String,
    pub borrow_status: BorrowStatus,
    pub min_borrow_rate: Rate,
    pub last_updated: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub client_id: String,
    pub markup_pct: bigdecimal::BigDecimal,
    pub txn_fee_type: TxnFeeType,
    pub txn_fee_amount: bigdecimal::BigDecimal,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolatilitySample {
    pub ticker: String,
    /// Raw index value, e.g. 20.0 — not a fraction.
    pub vix_like_index: bigdecimal::BigDecimal,
    /// Clamped to 0..=10.
    pub event_risk_factor: u8,
    pub observed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BorrowRateQuote {
    pub ticker: String,
    pub annualized_rate: Rate,
    pub status: BorrowStatus,
    pub as_of: DateTime<Utc>,
    pub source: Provenance,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FallbackMinRate {
    pub ticker: String,
    pub rate: Rate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub borrow_cost: Money,
    pub markup: Money,
    pub transaction_fees: Money,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub fingerprint: String,
    pub total_fee: Money,
    pub breakdown: FeeBreakdown,
    pub borrow_rate_used: Rate,
    pub timestamp: DateTime<Utc>,
}

/// Per-input provenance recorded alongside an audit record, keyed by the
/// name of the input ("rate", "volatility", "event_risk", "broker_config",
/// "security").
pub type ProvenanceMap = std::collections::BTreeMap<String, Provenance>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditRecord {
    pub fingerprint: String,
    pub correlation_id: String,
    pub client_id: String,
    pub ticker: String,
    pub position_value: bigdecimal::BigDecimal,
    pub loan_days: i64,
    pub result: CalculationResult,
    pub provenance: ProvenanceMap,
    pub timestamp: DateTime<Utc>,
}

use std::sync::Arc;
use std::time::Duration;

use bigdecimal::BigDecimal;
use chrono::Utc;

use locate_fee_pricing::domain::{AuditRecord, BorrowRateQuote, CalculationResult, Provenance, ProvenanceMap};
use locate_fee_pricing::fingerprint::{canonical_client_id, canonical_ticker, fee_request_fingerprint, rate_request_fingerprint};
use locate_fee_pricing::kernel::{self, BorrowRateInputs, FeeInputs};
use locate_fee_pricing::number::Rate;

use crate::audit::AuditQueue;
use crate::cache::{CacheCategory, CacheError, CacheTier};
use crate::config::{Config, KernelDefaults};
use crate::context::RequestContext;
use crate::error::Error;
use crate::feeds::Feeds;
use crate::result_cache::ResultCache;
use crate::singleflight::SingleFlight;
use crate::store::ReferenceStore;

/// Lightweight, `Clone`-able error used to share a compute outcome across
/// all waiters of the orchestrator's own single-flight gate — `Error`
/// itself isn't `Clone` (it wraps `anyhow::Error` for internal failures).
#[derive(Clone, Debug)]
enum ComputeFailure {
    Validation(String),
    TickerNotFound(String),
    ClientNotFound(String),
    Timeout,
    Internal(String),
}

impl From<Error> for ComputeFailure {
    fn from(e: Error) -> Self {
        match e {
            Error::Validation(m) => ComputeFailure::Validation(m),
            Error::TickerNotFound(t) => ComputeFailure::TickerNotFound(t),
            Error::ClientNotFound(c) => ComputeFailure::ClientNotFound(c),
            Error::Timeout => ComputeFailure::Timeout,
            Error::UpstreamUnavailable => ComputeFailure::Internal("upstream unavailable".to_string()),
            Error::RateLimited { .. } => ComputeFailure::Internal("rate limited".to_string()),
            Error::Internal(e) => ComputeFailure::Internal(e.to_string()),
        }
    }
}

impl From<ComputeFailure> for Error {
    fn from(f: ComputeFailure) -> Self {
        match f {
            ComputeFailure::Validation(m) => Error::Validation(m),
            ComputeFailure::TickerNotFound(t) => Error::TickerNotFound(t),
            ComputeFailure::ClientNotFound(c) => Error::ClientNotFound(c),
            ComputeFailure::Timeout => Error::Timeout,
            ComputeFailure::Internal(m) => Error::Internal(anyhow::anyhow!(m)),
        }
    }
}

pub(crate) struct Orchestrator {
    store: Arc<ReferenceStore>,
    cache: Arc<CacheTier>,
    feeds: Arc<Feeds>,
    kernel_defaults: KernelDefaults,
    request_deadline: Duration,
    audit: Arc<AuditQueue>,
    compute_gate: SingleFlight<String, CalculationResult, ComputeFailure>,
}

fn validate_ticker_charset(ticker: &str) -> Result<(), Error> {
    if ticker.is_empty() || ticker.len() > 10 || !ticker.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(Error::Validation(format!("invalid ticker {ticker:?}")));
    }
    Ok(())
}

impl Orchestrator {
    pub(crate) fn new(
        config: &Config,
        store: Arc<ReferenceStore>,
        cache: Arc<CacheTier>,
        feeds: Arc<Feeds>,
        audit: Arc<AuditQueue>,
    ) -> Self {
        Self {
            store,
            cache,
            feeds,
            kernel_defaults: config.kernel_defaults.clone(),
            request_deadline: config.resilience.request_deadline,
            audit,
            compute_gate: SingleFlight::new(),
        }
    }

    /// `compute_fee` (§4.5): the full pipeline from raw request to a priced,
    /// audited result.
    pub(crate) async fn compute_fee(
        &self,
        ctx: &RequestContext,
        client_id: &str,
        ticker: &str,
        position_value: BigDecimal,
        loan_days: i64,
    ) -> Result<CalculationResult, Error> {
        let ticker = canonical_ticker(ticker);
        let client_id = canonical_client_id(client_id);
        validate_ticker_charset(&ticker)?;

        let fingerprint = fee_request_fingerprint(&client_id, &ticker, &position_value, loan_days);

        let result_cache = ResultCache::new(&self.cache);
        if let Some(cached) = result_cache.get_fresh(&fingerprint).await {
            return Ok(cached);
        }

        let result = self
            .compute_gate
            .run(fingerprint.clone(), self.compute_uncached(
                ctx,
                &client_id,
                &ticker,
                position_value,
                loan_days,
                fingerprint.clone(),
            ))
            .await
            .map_err(Error::from)?;

        result_cache.store(&fingerprint, result.clone()).await;
        Ok(result)
    }

    async fn compute_uncached(
        &self,
        ctx: &RequestContext,
        client_id: &str,
        ticker: &str,
        position_value: BigDecimal,
        loan_days: i64,
        fingerprint: String,
    ) -> Result<CalculationResult, ComputeFailure> {
        let inner = async {
            let security_fut = self.store.get_security(ticker);
            let broker_fut = self.cache.get_or_load(CacheCategory::BrokerConfig, client_id, || async {
                self.store
                    .get_active_broker_config(client_id)
                    .await
                    .map_err(|e| CacheError::Loader(e.into()))
            });
            let rate_fut = self.feeds.seclend.get_quote(
                ticker,
                ctx,
                &self.cache,
                &self.store,
                &self.kernel_defaults.global_minimum_borrow_rate,
            );
            let vol_fut = self.feeds.volatility.get_index(ticker, ctx, &self.cache);
            let event_fut = self.feeds.events.get_event_risk(ticker, ctx, &self.cache);

            let (security, broker, rate, volatility, event_risk) =
                tokio::join!(security_fut, broker_fut, rate_fut, vol_fut, event_fut);

            let security = security
                .map_err(|e| Error::Internal(e.into()))?
                .ok_or_else(|| Error::TickerNotFound(ticker.to_string()))?;
            let (broker, broker_from_cache) = broker.map_err(|e| Error::Internal(e.into()))?;
            let broker = broker.ok_or_else(|| Error::ClientNotFound(client_id.to_string()))?;

            let rate_inputs = BorrowRateInputs {
                base_rate: rate.value.rate.clone(),
                volatility_index: volatility.value.clone(),
                event_risk_factor: event_risk.value,
                ticker_min_rate: security.min_borrow_rate.clone().into_decimal(),
                global_min_rate: self.kernel_defaults.global_minimum_borrow_rate.clone(),
                vol_factor: self.kernel_defaults.volatility_factor.clone(),
                event_factor: self.kernel_defaults.event_risk_factor.clone(),
            };
            let rate_used: Rate = kernel::borrow_rate(&rate_inputs)?;

            let fee_inputs = FeeInputs {
                annual_rate: rate_used.clone().into_decimal(),
                position_value: position_value.clone(),
                loan_days,
                days_in_year: self.kernel_defaults.days_in_year,
                markup_pct: broker.markup_pct.clone(),
                txn_fee_type: broker.txn_fee_type,
                txn_fee_amount: broker.txn_fee_amount.clone(),
            };
            let fee = kernel::calculate_fee(&fee_inputs)?;

            let result = CalculationResult {
                fingerprint: fingerprint.clone(),
                total_fee: fee.total_fee,
                breakdown: fee.breakdown,
                borrow_rate_used: rate_used,
                timestamp: Utc::now(),
            };

            let mut provenance: ProvenanceMap = ProvenanceMap::new();
            provenance.insert("rate".to_string(), rate.provenance);
            provenance.insert("volatility".to_string(), volatility.provenance);
            provenance.insert("event_risk".to_string(), event_risk.provenance);
            provenance.insert("security".to_string(), Provenance::Live);
            provenance.insert(
                "broker_config".to_string(),
                if broker_from_cache { Provenance::FreshCache } else { Provenance::Live },
            );

            self.audit.emit(AuditRecord {
                fingerprint: fingerprint.clone(),
                correlation_id: ctx.correlation_id.clone(),
                client_id: client_id.to_string(),
                ticker: ticker.to_string(),
                position_value,
                loan_days,
                result: result.clone(),
                provenance,
                timestamp: Utc::now(),
            });

            Ok(result)
        };

        match tokio::time::timeout(self.request_deadline, inner).await {
            Ok(result) => result.map_err(ComputeFailure::from),
            Err(_) => Err(ComputeFailure::Timeout),
        }
    }

    /// `get_current_rate` (§4.5): same input assembly minus broker/fee
    /// steps, no audit emission.
    pub(crate) async fn get_current_rate(
        &self,
        ctx: &RequestContext,
        ticker: &str,
    ) -> Result<BorrowRateQuote, Error> {
        let ticker = canonical_ticker(ticker);
        validate_ticker_charset(&ticker)?;
        let _fingerprint = rate_request_fingerprint(&ticker);

        let inner = async {
            let security_fut = self.store.get_security(&ticker);
            let rate_fut = self.feeds.seclend.get_quote(
                &ticker,
                ctx,
                &self.cache,
                &self.store,
                &self.kernel_defaults.global_minimum_borrow_rate,
            );
            let vol_fut = self.feeds.volatility.get_index(&ticker, ctx, &self.cache);
            let event_fut = self.feeds.events.get_event_risk(&ticker, ctx, &self.cache);

            let (security, rate, volatility, event_risk) =
                tokio::join!(security_fut, rate_fut, vol_fut, event_fut);

            let security = security
                .map_err(|e| Error::Internal(e.into()))?
                .ok_or_else(|| Error::TickerNotFound(ticker.clone()))?;

            let effective_status = if rate.provenance == Provenance::Live {
                rate.value.status
            } else {
                security.borrow_status
            };

            let rate_inputs = BorrowRateInputs {
                base_rate: rate.value.rate.clone(),
                volatility_index: volatility.value.clone(),
                event_risk_factor: event_risk.value,
                ticker_min_rate: security.min_borrow_rate.clone().into_decimal(),
                global_min_rate: self.kernel_defaults.global_minimum_borrow_rate.clone(),
                vol_factor: self.kernel_defaults.volatility_factor.clone(),
                event_factor: self.kernel_defaults.event_risk_factor.clone(),
            };
            let rate_used = kernel::borrow_rate(&rate_inputs)?;

            Ok(BorrowRateQuote {
                ticker: ticker.clone(),
                annualized_rate: rate_used,
                status: effective_status,
                as_of: Utc::now(),
                source: rate.provenance,
            })
        };

        match tokio::time::timeout(self.request_deadline, inner).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout),
        }
    }

    pub(crate) fn audit_dropped_count(&self) -> u64 {
        self.audit.dropped_count()
    }
}

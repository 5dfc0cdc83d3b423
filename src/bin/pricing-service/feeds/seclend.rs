use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use locate_fee_pricing::domain::{BorrowStatus, Provenance, Sourced};

use crate::cache::{CacheCategory, CacheError, CacheTier};
use crate::config::{FeedEndpoint, ResilienceConfig};
use crate::context::RequestContext;
use crate::store::ReferenceStore;

use super::client::{FeedError, ResilientCaller};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct SecLendQuote {
    pub(crate) rate: BigDecimal,
    pub(crate) status: BorrowStatus,
}

#[derive(Deserialize)]
struct RawSecLendResponse {
    rate: Option<BigDecimal>,
    status: Option<String>,
}

pub(crate) struct SecLendClient {
    http: reqwest::Client,
    endpoint: FeedEndpoint,
    caller: ResilientCaller,
}

impl SecLendClient {
    pub(crate) fn new(http: reqwest::Client, endpoint: FeedEndpoint, resilience: ResilienceConfig) -> Self {
        Self {
            http,
            endpoint,
            caller: ResilientCaller::new(resilience),
        }
    }

    pub(crate) fn breaker_state(&self) -> super::circuit_breaker::BreakerState {
        self.caller.breaker().state()
    }

    fn parse(body: &[u8]) -> Result<SecLendQuote, FeedError> {
        let raw: RawSecLendResponse = serde_json::from_slice(body).map_err(|_| FeedError::Parse)?;
        let rate = raw.rate.ok_or(FeedError::Parse)?;
        let status = match raw.status.as_deref() {
            Some("EASY") => BorrowStatus::Easy,
            Some("MEDIUM") => BorrowStatus::Medium,
            Some("HARD") => BorrowStatus::Hard,
            _ => return Err(FeedError::Parse),
        };
        Ok(SecLendQuote { rate, status })
    }

    async fn fetch_live(&self, ticker: &str, ctx: &RequestContext) -> Result<SecLendQuote, FeedError> {
        self.caller
            .call(ctx, || async {
                let resp = self
                    .http
                    .get(self.endpoint.base_url.join(&format!("rates/{ticker}")).unwrap())
                    .header("X-API-Key", &self.endpoint.api_key)
                    .send()
                    .await?;
                if !resp.status().is_success() {
                    return Err(FeedError::Status(resp.status().as_u16()));
                }
                let bytes = resp.bytes().await?;
                Self::parse(&bytes)
            })
            .await
    }

    /// Resolves the SecLend quote for `ticker` through the cache tier
    /// (§4.2: L1 -> L2 -> loader), falling back in order to the most
    /// recent cached success, the persisted per-ticker minimum rate, and
    /// finally a global default (§4.3) if the live call itself fails.
    pub(crate) async fn get_quote(
        &self,
        ticker: &str,
        ctx: &RequestContext,
        cache: &CacheTier,
        store: &ReferenceStore,
        global_default_rate: &BigDecimal,
    ) -> Sourced<SecLendQuote> {
        let loaded = cache
            .get_or_load(CacheCategory::BorrowRate, ticker, || async {
                self.fetch_live(ticker, ctx)
                    .await
                    .map_err(|e| CacheError::Loader(e.into()))
            })
            .await;

        match loaded {
            Ok((quote, from_cache)) => Sourced {
                value: quote,
                provenance: if from_cache { Provenance::FreshCache } else { Provenance::Live },
            },
            Err(e) => {
                tracing::warn!(ticker, error = %e, breaker = ?self.caller.breaker().state(), "seclend feed unavailable, falling back");
                self.resolve_fallback(ticker, cache, store, global_default_rate).await
            }
        }
    }

    async fn resolve_fallback(
        &self,
        ticker: &str,
        cache: &CacheTier,
        store: &ReferenceStore,
        global_default_rate: &BigDecimal,
    ) -> Sourced<SecLendQuote> {
        if let Some(cached) = cache.get_stale::<SecLendQuote>(CacheCategory::BorrowRate, ticker).await {
            return Sourced {
                value: cached,
                provenance: Provenance::StaleCache,
            };
        }
        let fallback = cache
            .get_or_load(CacheCategory::FallbackMinRate, ticker, || async {
                store
                    .get_fallback_min_rate(ticker)
                    .await
                    .map_err(|e| CacheError::Loader(e.into()))
            })
            .await
            .ok()
            .and_then(|(fallback, _)| fallback);
        if let Some(fallback) = fallback {
            return Sourced {
                value: SecLendQuote {
                    rate: fallback.rate.into_decimal(),
                    status: BorrowStatus::Medium,
                },
                provenance: Provenance::PersistedFallback,
            };
        }
        Sourced {
            value: SecLendQuote {
                rate: global_default_rate.clone(),
                status: BorrowStatus::Medium,
            },
            provenance: Provenance::GlobalDefault,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_response() {
        let body = br#"{"rate": "0.05", "status": "EASY", "unused": true}"#;
        let quote = SecLendClient::parse(body).unwrap();
        assert_eq!(quote.status, BorrowStatus::Easy);
    }

    #[test]
    fn missing_rate_is_a_parse_failure() {
        let body = br#"{"status": "EASY"}"#;
        assert!(matches!(SecLendClient::parse(body), Err(FeedError::Parse)));
    }
}

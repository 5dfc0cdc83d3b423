use bigdecimal::BigDecimal;
use serde::Deserialize;

use locate_fee_pricing::domain::{Provenance, Sourced};

use crate::cache::{CacheCategory, CacheError, CacheTier};
use crate::config::{FeedEndpoint, ResilienceConfig};
use crate::context::RequestContext;

use super::client::{FeedError, ResilientCaller};

/// Used when every rung of the fallback ladder is empty — a brand new
/// ticker with no cache history and no live feed. Treated as "unremarkable
/// volatility" rather than a hard failure.
const GLOBAL_DEFAULT_INDEX: &str = "20.0";

#[derive(Deserialize)]
struct RawVolatilityResponse {
    index: Option<BigDecimal>,
}

pub(crate) struct VolatilityClient {
    http: reqwest::Client,
    endpoint: FeedEndpoint,
    caller: ResilientCaller,
}

impl VolatilityClient {
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

    fn parse(body: &[u8]) -> Result<BigDecimal, FeedError> {
        let raw: RawVolatilityResponse = serde_json::from_slice(body).map_err(|_| FeedError::Parse)?;
        raw.index.ok_or(FeedError::Parse)
    }

    async fn fetch_live(&self, ticker: &str, ctx: &RequestContext) -> Result<BigDecimal, FeedError> {
        self.caller
            .call(ctx, || async {
                let resp = self
                    .http
                    .get(
                        self.endpoint
                            .base_url
                            .join(&format!("volatility/{ticker}"))
                            .unwrap(),
                    )
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

    pub(crate) async fn get_index(
        &self,
        ticker: &str,
        ctx: &RequestContext,
        cache: &CacheTier,
    ) -> Sourced<BigDecimal> {
        let loaded = cache
            .get_or_load(CacheCategory::Volatility, ticker, || async {
                self.fetch_live(ticker, ctx)
                    .await
                    .map_err(|e| CacheError::Loader(e.into()))
            })
            .await;

        match loaded {
            Ok((index, from_cache)) => Sourced {
                value: index,
                provenance: if from_cache { Provenance::FreshCache } else { Provenance::Live },
            },
            Err(e) => {
                tracing::warn!(ticker, error = %e, "volatility feed unavailable, falling back");
                if let Some(cached) = cache.get_stale::<BigDecimal>(CacheCategory::Volatility, ticker).await {
                    return Sourced {
                        value: cached,
                        provenance: Provenance::StaleCache,
                    };
                }
                Sourced {
                    value: GLOBAL_DEFAULT_INDEX.parse().expect("valid default literal"),
                    provenance: Provenance::GlobalDefault,
                }
            }
        }
    }
}

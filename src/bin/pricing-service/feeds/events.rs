use chrono::{DateTime, Utc};
use serde::Deserialize;

use locate_fee_pricing::domain::{Provenance, Sourced};

use crate::cache::{CacheCategory, CacheError, CacheTier};
use crate::config::{FeedEndpoint, ResilienceConfig};
use crate::context::RequestContext;

use super::client::{FeedError, ResilientCaller};

const GLOBAL_DEFAULT_EVENT_RISK: u8 = 0;

/// Event-to-risk-factor aggregation policy (Open Question, §9: the exact
/// weights aren't pinned by domain owners yet). The shipped default is the
/// spec's stated fallback: max risk over events within a 7-day horizon.
#[derive(Clone, Copy, Debug)]
pub(crate) enum EventAggregationPolicy {
    MaxWithinHorizon { horizon_days: i64 },
}

impl Default for EventAggregationPolicy {
    fn default() -> Self {
        EventAggregationPolicy::MaxWithinHorizon { horizon_days: 7 }
    }
}

impl EventAggregationPolicy {
    fn aggregate(self, events: &[UpcomingEvent], observed_at: DateTime<Utc>) -> u8 {
        match self {
            EventAggregationPolicy::MaxWithinHorizon { horizon_days } => events
                .iter()
                .filter(|e| (e.date - observed_at).num_days() <= horizon_days && e.date >= observed_at)
                .map(|e| e.risk_score)
                .max()
                .unwrap_or(0)
                .min(10),
        }
    }
}

#[derive(Clone, Debug)]
struct UpcomingEvent {
    risk_score: u8,
    date: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawEventsResponse {
    events: Option<Vec<RawEvent>>,
}

#[derive(Deserialize)]
struct RawEvent {
    risk_score: Option<u8>,
    date: Option<DateTime<Utc>>,
}

pub(crate) struct EventsClient {
    http: reqwest::Client,
    endpoint: FeedEndpoint,
    caller: ResilientCaller,
    policy: EventAggregationPolicy,
}

impl EventsClient {
    pub(crate) fn new(http: reqwest::Client, endpoint: FeedEndpoint, resilience: ResilienceConfig) -> Self {
        Self {
            http,
            endpoint,
            caller: ResilientCaller::new(resilience),
            policy: EventAggregationPolicy::default(),
        }
    }

    pub(crate) fn breaker_state(&self) -> super::circuit_breaker::BreakerState {
        self.caller.breaker().state()
    }

    fn parse(body: &[u8]) -> Result<Vec<UpcomingEvent>, FeedError> {
        let raw: RawEventsResponse = serde_json::from_slice(body).map_err(|_| FeedError::Parse)?;
        let events = raw.events.ok_or(FeedError::Parse)?;
        events
            .into_iter()
            .map(|e| {
                Ok(UpcomingEvent {
                    risk_score: e.risk_score.ok_or(FeedError::Parse)?,
                    date: e.date.ok_or(FeedError::Parse)?,
                })
            })
            .collect()
    }

    async fn fetch_live(&self, ticker: &str, ctx: &RequestContext) -> Result<Vec<UpcomingEvent>, FeedError> {
        self.caller
            .call(ctx, || async {
                let resp = self
                    .http
                    .get(self.endpoint.base_url.join(&format!("events/{ticker}")).unwrap())
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

    pub(crate) async fn get_event_risk(
        &self,
        ticker: &str,
        ctx: &RequestContext,
        cache: &CacheTier,
    ) -> Sourced<u8> {
        let now = Utc::now();
        let policy = self.policy;
        let loaded = cache
            .get_or_load(CacheCategory::EventRisk, ticker, || async move {
                let events = self
                    .fetch_live(ticker, ctx)
                    .await
                    .map_err(|e| CacheError::Loader(e.into()))?;
                Ok(policy.aggregate(&events, now))
            })
            .await;

        match loaded {
            Ok((risk, from_cache)) => Sourced {
                value: risk,
                provenance: if from_cache { Provenance::FreshCache } else { Provenance::Live },
            },
            Err(e) => {
                tracing::warn!(ticker, error = %e, "event-calendar feed unavailable, falling back");
                if let Some(cached) = cache.get_stale::<u8>(CacheCategory::EventRisk, ticker).await {
                    return Sourced {
                        value: cached,
                        provenance: Provenance::StaleCache,
                    };
                }
                Sourced {
                    value: GLOBAL_DEFAULT_EVENT_RISK,
                    provenance: Provenance::GlobalDefault,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn max_within_horizon_ignores_far_future_events() {
        let now = Utc::now();
        let events = vec![
            UpcomingEvent {
                risk_score: 3,
                date: now + ChronoDuration::days(2),
            },
            UpcomingEvent {
                risk_score: 9,
                date: now + ChronoDuration::days(30),
            },
        ];
        let policy = EventAggregationPolicy::MaxWithinHorizon { horizon_days: 7 };
        assert_eq!(policy.aggregate(&events, now), 3);
    }
}

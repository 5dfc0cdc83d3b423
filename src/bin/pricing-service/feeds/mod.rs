pub(crate) mod circuit_breaker;
pub(crate) mod client;
pub(crate) mod events;
pub(crate) mod seclend;
pub(crate) mod volatility;

use std::time::Duration;

use crate::config::{Config, ResilienceConfig};

pub(crate) use events::EventsClient;
pub(crate) use seclend::SecLendClient;
pub(crate) use volatility::VolatilityClient;

/// The three external feed adapters, each independently circuit-broken.
pub(crate) struct Feeds {
    pub(crate) seclend: SecLendClient,
    pub(crate) volatility: VolatilityClient,
    pub(crate) events: EventsClient,
}

impl Feeds {
    pub(crate) fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let resilience: ResilienceConfig = config.resilience;
        Ok(Self {
            seclend: SecLendClient::new(http.clone(), config.feeds.seclend.clone(), resilience),
            volatility: VolatilityClient::new(http.clone(), config.feeds.volatility.clone(), resilience),
            events: EventsClient::new(http, config.feeds.events.clone(), resilience),
        })
    }
}

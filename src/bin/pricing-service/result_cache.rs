use locate_fee_pricing::domain::CalculationResult;

use crate::cache::{CacheCategory, CacheTier};

/// Idempotent result cache (§4.7): a thin, named view over the cache
/// tier's `CalcResult` category. The de-duplication of concurrent
/// identical requests is handled one level up, in the orchestrator, with
/// its own [`crate::singleflight::SingleFlight`] instance — a second use
/// of the same reusable primitive the cache tier uses internally for its
/// own loader de-duplication (Design Notes §9).
pub(crate) struct ResultCache<'a> {
    cache: &'a CacheTier,
}

impl<'a> ResultCache<'a> {
    pub(crate) fn new(cache: &'a CacheTier) -> Self {
        Self { cache }
    }

    pub(crate) async fn get_fresh(&self, fingerprint: &str) -> Option<CalculationResult> {
        self.cache
            .get_or_load(CacheCategory::CalcResult, fingerprint, || async {
                Err(crate::cache::CacheError::Backend("no entry".to_string()))
            })
            .await
            .ok()
            .map(|(value, _from_cache)| value)
    }

    pub(crate) async fn store(&self, fingerprint: &str, result: CalculationResult) {
        let _ = self
            .cache
            .refresh(CacheCategory::CalcResult, fingerprint, || async move { Ok(result) })
            .await;
    }

    /// Invalidates cached results for one client — called when a broker
    /// config update lands, since a stale markup/fee-type would otherwise
    /// keep being served for up to the calc-result TTL. Fingerprints don't
    /// embed `client_id` in a queryable way, so this degrades to a
    /// category-wide purge; acceptable given the short default TTL and the
    /// rarity of config updates.
    pub(crate) async fn invalidate_all(&self) {
        let _ = self.cache.invalidate_category(CacheCategory::CalcResult).await;
    }
}

//! Single-flight de-duplication (§4.2, §4.7, Design Notes §9): at most one
//! concurrent computation per key; every other caller for that key awaits
//! the same result instead of re-running the loader. Used by both the
//! cache tier's L1 miss path and the idempotent result cache.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

pub(crate) struct SingleFlight<K, V, E> {
    inflight: DashMap<K, Arc<OnceCell<Result<V, E>>>>,
}

impl<K, V, E> Default for SingleFlight<K, V, E>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            inflight: DashMap::new(),
        }
    }
}

impl<K, V, E> SingleFlight<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Runs `loader` for `key` if no call for that key is already inflight;
    /// otherwise awaits the inflight call's result. All waiters, including
    /// the caller that triggered the load, observe the identical
    /// `Result<V, E>`.
    pub(crate) async fn run<F>(&self, key: K, loader: F) -> Result<V, E>
    where
        F: Future<Output = Result<V, E>>,
    {
        let cell = self
            .inflight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let result = cell.get_or_init(|| loader).await.clone();

        // Best-effort cleanup: only the caller whose cell is still the
        // current map entry removes it, so a fresh wave of callers after
        // this one gets a new cell rather than a perpetually-cached one.
        self.inflight
            .remove_if(&key, |_, current| Arc::ptr_eq(current, &cell));

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn concurrent_callers_share_one_load() {
        let sf: Arc<SingleFlight<&'static str, u32, String>> = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let sf = sf.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                sf.run("aapl", async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                    Ok::<u32, String>(42)
                })
                .await
            }));
        }

        for h in handles {
            assert_eq!(h.await.unwrap(), Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn loader_error_fails_all_waiters() {
        let sf: Arc<SingleFlight<&'static str, u32, String>> = Arc::new(SingleFlight::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let sf = sf.clone();
            handles.push(tokio::spawn(async move {
                sf.run("aapl", async { Err::<u32, String>("boom".to_string()) })
                    .await
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), Err("boom".to_string()));
        }
    }
}

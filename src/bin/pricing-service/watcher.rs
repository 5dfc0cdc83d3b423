use anyhow::Result;
use tokio::task::JoinSet;

/// Minimal task supervisor (grounded on the bots binary's watcher, trimmed
/// down to what this service actually runs: the HTTP server and the audit
/// worker). The first task to fail aborts the rest so a half-alive process
/// doesn't keep serving traffic.
#[derive(Default)]
pub(crate) struct Watcher {
    set: JoinSet<Result<()>>,
}

impl Watcher {
    pub(crate) fn spawn<Fut>(&mut self, task: Fut)
    where
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.set.spawn(task);
    }

    pub(crate) async fn wait(mut self) -> Result<()> {
        while let Some(res) = self.set.join_next().await {
            match res {
                Ok(Ok(())) => {
                    // A supervised task returning Ok without the process
                    // shutting down indicates something that should have
                    // run forever stopped early.
                    self.set.abort_all();
                    return Ok(());
                }
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "supervised task failed, shutting down");
                    self.set.abort_all();
                    return Err(e);
                }
                Err(join_err) => {
                    self.set.abort_all();
                    return Err(join_err.into());
                }
            }
        }
        Ok(())
    }
}

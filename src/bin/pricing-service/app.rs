use std::sync::Arc;

use anyhow::{Context, Result};
use redis::Client as RedisClient;
use tokio::net::TcpListener;

use crate::audit::{AuditQueue, AuditSink, LoggingAuditSink};
use crate::cache::{CacheTier, L2Cache};
use crate::cli::Opt;
use crate::config::Config;
use crate::feeds::Feeds;
use crate::orchestrator::Orchestrator;
use crate::ratelimit::RateLimiter;
use crate::store::ReferenceStore;
use crate::watcher::Watcher;

/// Shared, `Clone`-able application state handed to every request handler
/// through `State<Arc<App>>`, plus the few collaborators the background
/// tasks need outside a request (health checks, the audit worker).
pub(crate) struct App {
    pub(crate) config: Config,
    pub(crate) store: Arc<ReferenceStore>,
    pub(crate) cache: Arc<CacheTier>,
    pub(crate) feeds: Arc<Feeds>,
    pub(crate) rate_limiter: Arc<RateLimiter>,
    pub(crate) audit: Arc<AuditQueue>,
    pub(crate) orchestrator: Orchestrator,
}

pub(crate) struct AppBuilder {
    pub(crate) app: Arc<App>,
    watcher: Watcher,
}

impl Opt {
    pub(crate) async fn into_app_builder(self) -> Result<AppBuilder> {
        let config = Config::from_opt(&self)?;

        let store = Arc::new(
            ReferenceStore::connect(&config.database_url)
                .await
                .context("connecting to the reference store")?,
        );

        let redis_client = RedisClient::open(config.cache_url.clone())
            .context("parsing CACHE_URL")?;
        let l2 = L2Cache::connect(&config.cache_url)
            .await
            .context("connecting to the cache backend")?;
        let cache = Arc::new(CacheTier::new(10_000, l2, config.cache_ttls));

        let feeds = Arc::new(Feeds::new(&config).context("building feed clients")?);

        let rate_limiter_conn = redis_client
            .get_connection_manager()
            .await
            .context("connecting the rate limiter to the cache backend")?;
        let rate_limiter = Arc::new(RateLimiter::new(rate_limiter_conn, config.rate_limits));

        let audit = AuditQueue::new(config.audit_queue_capacity);

        let orchestrator = Orchestrator::new(&config, store.clone(), cache.clone(), feeds.clone(), audit.clone());

        let app = Arc::new(App {
            config,
            store,
            cache,
            feeds,
            rate_limiter,
            audit,
            orchestrator,
        });

        Ok(AppBuilder {
            app,
            watcher: Watcher::default(),
        })
    }
}

impl AppBuilder {
    pub(crate) async fn start(mut self, listener: TcpListener) -> Result<()> {
        let audit = self.app.audit.clone();
        let sink: Arc<dyn AuditSink> = Arc::new(LoggingAuditSink);
        self.watch_background(async move {
            audit.run_worker(sink).await;
            Ok(())
        });

        let app = self.app.clone();
        self.watch_background(async move {
            let router = crate::endpoints::router(app);
            tracing::info!("pricing service listening");
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("axum server exited")
        });

        self.watcher.wait().await
    }

    pub(crate) fn watch_background<Fut>(&mut self, task: Fut)
    where
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.watcher.spawn(task);
    }
}

/// Resolves on SIGTERM or Ctrl+C, whichever comes first — lets in-flight
/// requests drain instead of axum's listener being torn down mid-response.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}

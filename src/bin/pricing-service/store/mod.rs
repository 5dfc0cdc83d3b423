mod models;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use locate_fee_pricing::domain::{BrokerConfig, FallbackMinRate, Security};

use self::models::{BrokerConfigRow, FallbackMinRateRow, SecurityRow};

#[derive(Debug, thiserror::Error)]
pub(crate) enum StoreError {
    #[error("reference store query failed")]
    Query(#[from] sqlx::Error),
    #[error("reference store row was malformed")]
    Malformed(#[from] anyhow::Error),
}

/// Persistent reference data (§4.4): `securities`, `broker_configs`,
/// `fallback_min_rates`. Reads only — writes happen outside the hot path,
/// through seed/migration/admin tooling not part of this service.
pub(crate) struct ReferenceStore {
    pool: PgPool,
}

impl ReferenceStore {
    pub(crate) async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub(crate) async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    pub(crate) async fn get_security(&self, ticker: &str) -> Result<Option<Security>, StoreError> {
        let row: Option<SecurityRow> = sqlx::query_as(
            "SELECT ticker, borrow_status, min_borrow_rate, last_updated \
             FROM securities WHERE ticker = $1",
        )
        .bind(ticker)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Security::try_from).transpose().map_err(StoreError::from)
    }

    pub(crate) async fn get_active_broker_config(
        &self,
        client_id: &str,
    ) -> Result<Option<BrokerConfig>, StoreError> {
        let row: Option<BrokerConfigRow> = sqlx::query_as(
            "SELECT client_id, markup_pct, txn_fee_type, txn_fee_amount, active \
             FROM broker_configs WHERE client_id = $1 AND active = true",
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(BrokerConfig::try_from).transpose().map_err(StoreError::from)
    }

    pub(crate) async fn get_fallback_min_rate(
        &self,
        ticker: &str,
    ) -> Result<Option<FallbackMinRate>, StoreError> {
        let row: Option<FallbackMinRateRow> =
            sqlx::query_as("SELECT ticker, rate FROM fallback_min_rates WHERE ticker = $1")
                .bind(ticker)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(FallbackMinRate::from))
    }
}

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use locate_fee_pricing::domain::{BorrowStatus, BrokerConfig, FallbackMinRate, Security, TxnFeeType};
use locate_fee_pricing::number::Rate;

#[derive(FromRow)]
pub(crate) struct SecurityRow {
    pub(crate) ticker: String,
    pub(crate) borrow_status: String,
    pub(crate) min_borrow_rate: BigDecimal,
    pub(crate) last_updated: DateTime<Utc>,
}

impl TryFrom<SecurityRow> for Security {
    type Error = anyhow::Error;

    fn try_from(row: SecurityRow) -> Result<Self, Self::Error> {
        Ok(Security {
            ticker: row.ticker,
            borrow_status: parse_borrow_status(&row.borrow_status)?,
            min_borrow_rate: Rate::new(row.min_borrow_rate),
            last_updated: row.last_updated,
        })
    }
}

fn parse_borrow_status(s: &str) -> anyhow::Result<BorrowStatus> {
    match s {
        "EASY" => Ok(BorrowStatus::Easy),
        "MEDIUM" => Ok(BorrowStatus::Medium),
        "HARD" => Ok(BorrowStatus::Hard),
        other => Err(anyhow::anyhow!("unrecognized borrow_status {other:?}")),
    }
}

#[derive(FromRow)]
pub(crate) struct BrokerConfigRow {
    pub(crate) client_id: String,
    pub(crate) markup_pct: BigDecimal,
    pub(crate) txn_fee_type: String,
    pub(crate) txn_fee_amount: BigDecimal,
    pub(crate) active: bool,
}

impl TryFrom<BrokerConfigRow> for BrokerConfig {
    type Error = anyhow::Error;

    fn try_from(row: BrokerConfigRow) -> Result<Self, Self::Error> {
        let txn_fee_type = match row.txn_fee_type.as_str() {
            "FLAT" => TxnFeeType::Flat,
            "PERCENTAGE" => TxnFeeType::Percentage,
            other => return Err(anyhow::anyhow!("unrecognized txn_fee_type {other:?}")),
        };
        Ok(BrokerConfig {
            client_id: row.client_id,
            markup_pct: row.markup_pct,
            txn_fee_type,
            txn_fee_amount: row.txn_fee_amount,
            active: row.active,
        })
    }
}

#[derive(FromRow)]
pub(crate) struct FallbackMinRateRow {
    pub(crate) ticker: String,
    pub(crate) rate: BigDecimal,
}

impl From<FallbackMinRateRow> for FallbackMinRate {
    fn from(row: FallbackMinRateRow) -> Self {
        FallbackMinRate {
            ticker: row.ticker,
            rate: Rate::new(row.rate),
        }
    }
}

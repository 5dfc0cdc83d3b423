//! Pure, side-effect-free borrow-rate and fee calculations (§4.1).
//!
//! Nothing in this module performs I/O, logs, or suspends. Every function
//! takes fully materialized inputs and returns a result or a
//! [`KernelError`]. Rounding is half-even and happens only at the
//! component boundaries named in the spec — never on an intermediate
//! value that still feeds into another computation.

use bigdecimal::BigDecimal;

use crate::domain::{FeeBreakdown, TxnFeeType};
use crate::error::KernelError;
use crate::number::{Money, Rate};

/// `vol_factor` default: volatility index contributes 1% of its raw value
/// to the rate multiplier per unit.
pub const DEFAULT_VOLATILITY_FACTOR: &str = "0.01";
/// `event_factor` default: each point of event-risk contributes 5%.
pub const DEFAULT_EVENT_RISK_FACTOR: &str = "0.05";
pub const DEFAULT_DAYS_IN_YEAR: i64 = 365;

#[derive(Clone, Debug)]
pub struct BorrowRateInputs {
    /// Raw rate from SecLend (or its fallback chain), before floors.
    pub base_rate: BigDecimal,
    /// Raw volatility index, e.g. `20.0`, not a fraction.
    pub volatility_index: BigDecimal,
    /// Clamped 0..=10.
    pub event_risk_factor: u8,
    pub ticker_min_rate: BigDecimal,
    pub global_min_rate: BigDecimal,
    pub vol_factor: BigDecimal,
    pub event_factor: BigDecimal,
}

fn require_non_negative(name: &str, value: &BigDecimal) -> Result<(), KernelError> {
    if *value < BigDecimal::from(0) {
        return Err(KernelError::InvalidInput(format!("{name} must be >= 0")));
    }
    Ok(())
}

/// `adjusted = base_rate * (1 + volatility_index*vol_factor + event_risk_factor*event_factor)`,
/// floored at `max(adjusted, ticker_min_rate, global_min_rate)`.
pub fn borrow_rate(inputs: &BorrowRateInputs) -> Result<Rate, KernelError> {
    require_non_negative("base_rate", &inputs.base_rate)?;
    require_non_negative("volatility_index", &inputs.volatility_index)?;
    require_non_negative("ticker_min_rate", &inputs.ticker_min_rate)?;
    require_non_negative("global_min_rate", &inputs.global_min_rate)?;
    require_non_negative("vol_factor", &inputs.vol_factor)?;
    require_non_negative("event_factor", &inputs.event_factor)?;
    if inputs.event_risk_factor > 10 {
        return Err(KernelError::InvalidInput(
            "event_risk_factor must be within 0..=10".to_string(),
        ));
    }

    let event_risk = BigDecimal::from(inputs.event_risk_factor as i64);
    let multiplier =
        BigDecimal::from(1) + &inputs.volatility_index * &inputs.vol_factor + event_risk * &inputs.event_factor;
    let adjusted = &inputs.base_rate * multiplier;

    let floored = adjusted
        .max(inputs.ticker_min_rate.clone())
        .max(inputs.global_min_rate.clone());

    Ok(Rate::new(floored))
}

#[derive(Clone, Debug)]
pub struct FeeInputs {
    pub annual_rate: BigDecimal,
    pub position_value: BigDecimal,
    pub loan_days: i64,
    pub days_in_year: i64,
    pub markup_pct: BigDecimal,
    pub txn_fee_type: TxnFeeType,
    pub txn_fee_amount: BigDecimal,
}

#[derive(Clone, Debug)]
pub struct FeeResult {
    pub total_fee: Money,
    pub breakdown: FeeBreakdown,
}

/// `borrow_cost = position_value * annual_rate * loan_days / days_in_year`,
/// `markup = borrow_cost * markup_pct / 100`,
/// `transaction_fees` is either the flat amount or `position_value * txn_fee_amount / 100`,
/// `total_fee` is the sum of the three (already-rounded) components.
pub fn calculate_fee(inputs: &FeeInputs) -> Result<FeeResult, KernelError> {
    require_non_negative("annual_rate", &inputs.annual_rate)?;
    require_non_negative("position_value", &inputs.position_value)?;
    require_non_negative("markup_pct", &inputs.markup_pct)?;
    require_non_negative("txn_fee_amount", &inputs.txn_fee_amount)?;

    if inputs.position_value == BigDecimal::from(0) {
        return Err(KernelError::InvalidInput(
            "position_value must be non-zero".to_string(),
        ));
    }
    if inputs.loan_days <= 0 {
        return Err(KernelError::InvalidInput(
            "loan_days must be positive".to_string(),
        ));
    }
    if inputs.days_in_year <= 0 {
        return Err(KernelError::InvalidInput(
            "days_in_year must be positive".to_string(),
        ));
    }

    let raw_borrow_cost = &inputs.position_value * &inputs.annual_rate * BigDecimal::from(inputs.loan_days)
        / BigDecimal::from(inputs.days_in_year);
    let borrow_cost = Money::new(raw_borrow_cost);

    let raw_markup = borrow_cost.as_decimal() * &inputs.markup_pct / BigDecimal::from(100);
    let markup = Money::new(raw_markup);

    let transaction_fees = match inputs.txn_fee_type {
        TxnFeeType::Flat => Money::new(inputs.txn_fee_amount.clone()),
        TxnFeeType::Percentage => {
            Money::new(&inputs.position_value * &inputs.txn_fee_amount / BigDecimal::from(100))
        }
    };

    let total_fee = borrow_cost.clone() + markup.clone() + transaction_fees.clone();

    Ok(FeeResult {
        total_fee,
        breakdown: FeeBreakdown {
            borrow_cost,
            markup,
            transaction_fees,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn bd(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn default_rate_inputs(base_rate: &str, vix: &str, event_risk: u8) -> BorrowRateInputs {
        BorrowRateInputs {
            base_rate: bd(base_rate),
            volatility_index: bd(vix),
            event_risk_factor: event_risk,
            ticker_min_rate: bd("0.0001"),
            global_min_rate: bd("0.0001"),
            vol_factor: bd(DEFAULT_VOLATILITY_FACTOR),
            event_factor: bd(DEFAULT_EVENT_RISK_FACTOR),
        }
    }

    #[test]
    fn baseline_scenario() {
        let rate = borrow_rate(&default_rate_inputs("0.05", "20.0", 0)).unwrap();
        assert_eq!(rate.to_string(), "0.0600");

        let fee = calculate_fee(&FeeInputs {
            annual_rate: rate.into_decimal(),
            position_value: bd("100000"),
            loan_days: 30,
            days_in_year: DEFAULT_DAYS_IN_YEAR,
            markup_pct: bd("5.0"),
            txn_fee_type: TxnFeeType::Flat,
            txn_fee_amount: bd("25.00"),
        })
        .unwrap();

        assert_eq!(fee.breakdown.borrow_cost.to_string(), "493.15");
        assert_eq!(fee.breakdown.markup.to_string(), "24.66");
        assert_eq!(fee.breakdown.transaction_fees.to_string(), "25.00");
        assert_eq!(fee.total_fee.to_string(), "542.81");
    }

    #[test]
    fn high_volatility_with_event() {
        let rate = borrow_rate(&default_rate_inputs("0.05", "40.0", 5)).unwrap();
        assert_eq!(rate.to_string(), "0.0825");

        let fee = calculate_fee(&FeeInputs {
            annual_rate: rate.into_decimal(),
            position_value: bd("100000"),
            loan_days: 30,
            days_in_year: DEFAULT_DAYS_IN_YEAR,
            markup_pct: bd("5.0"),
            txn_fee_type: TxnFeeType::Flat,
            txn_fee_amount: bd("25.00"),
        })
        .unwrap();

        assert_eq!(fee.breakdown.borrow_cost.to_string(), "678.08");
        assert_eq!(fee.breakdown.markup.to_string(), "33.90");
        assert_eq!(fee.total_fee.to_string(), "736.98");
    }

    #[test]
    fn percentage_transaction_fee() {
        let fee = calculate_fee(&FeeInputs {
            annual_rate: bd("0.06"),
            position_value: bd("100000"),
            loan_days: 30,
            days_in_year: DEFAULT_DAYS_IN_YEAR,
            markup_pct: bd("5.0"),
            txn_fee_type: TxnFeeType::Percentage,
            txn_fee_amount: bd("0.5"),
        })
        .unwrap();

        assert_eq!(fee.breakdown.transaction_fees.to_string(), "500.00");
    }

    #[test]
    fn min_rate_floor_wins_over_volatility() {
        let rate = borrow_rate(&BorrowRateInputs {
            base_rate: bd("0.00005"),
            volatility_index: bd("20.0"),
            event_risk_factor: 0,
            ticker_min_rate: bd("0.001"),
            global_min_rate: bd("0.0001"),
            vol_factor: bd(DEFAULT_VOLATILITY_FACTOR),
            event_factor: bd(DEFAULT_EVENT_RISK_FACTOR),
        })
        .unwrap();
        assert_eq!(rate.to_string(), "0.0010");
    }

    #[test]
    fn rejects_zero_position_value() {
        let err = calculate_fee(&FeeInputs {
            annual_rate: bd("0.06"),
            position_value: bd("0"),
            loan_days: 30,
            days_in_year: DEFAULT_DAYS_IN_YEAR,
            markup_pct: bd("5.0"),
            txn_fee_type: TxnFeeType::Flat,
            txn_fee_amount: bd("25.00"),
        })
        .unwrap_err();
        assert_eq!(err, KernelError::InvalidInput("position_value must be non-zero".to_string()));
    }

    #[test]
    fn rejects_non_positive_loan_days() {
        let err = calculate_fee(&FeeInputs {
            annual_rate: bd("0.06"),
            position_value: bd("1000"),
            loan_days: 0,
            days_in_year: DEFAULT_DAYS_IN_YEAR,
            markup_pct: bd("5.0"),
            txn_fee_type: TxnFeeType::Flat,
            txn_fee_amount: bd("25.00"),
        })
        .unwrap_err();
        assert!(matches!(err, KernelError::InvalidInput(_)));
    }

    #[test]
    fn one_day_loan_uses_one_over_days_in_year() {
        let fee = calculate_fee(&FeeInputs {
            annual_rate: bd("0.0365"),
            position_value: bd("36500"),
            loan_days: 1,
            days_in_year: 365,
            markup_pct: bd("0"),
            txn_fee_type: TxnFeeType::Flat,
            txn_fee_amount: bd("0"),
        })
        .unwrap();
        // 36500 * 0.0365 * 1/365 = 3.65
        assert_eq!(fee.breakdown.borrow_cost.to_string(), "3.65");
    }

    proptest::proptest! {
        #[test]
        fn total_fee_is_sum_of_components(
            position in 1i64..1_000_000_000,
            rate_bp in 0i64..10_000,
            loan_days in 1i64..3650,
            markup_bp in 0i64..10_000,
            txn_fee in 0i64..100_000,
        ) {
            let fee = calculate_fee(&FeeInputs {
                annual_rate: BigDecimal::from(rate_bp) / BigDecimal::from(10_000),
                position_value: BigDecimal::from(position),
                loan_days,
                days_in_year: DEFAULT_DAYS_IN_YEAR,
                markup_pct: BigDecimal::from(markup_bp) / BigDecimal::from(100),
                txn_fee_type: TxnFeeType::Flat,
                txn_fee_amount: BigDecimal::from(txn_fee),
            }).unwrap();

            let sum = fee.breakdown.borrow_cost.clone()
                + fee.breakdown.markup.clone()
                + fee.breakdown.transaction_fees.clone();
            prop_assert_eq!(sum, fee.total_fee);
        }

        #[test]
        fn borrow_rate_never_below_floors(
            base_bp in 0i64..10_000,
            vix in 0i64..10_000,
            event_risk in 0u8..=10,
            ticker_min_bp in 0i64..1_000,
            global_min_bp in 0i64..1_000,
        ) {
            let rate = borrow_rate(&BorrowRateInputs {
                base_rate: BigDecimal::from(base_bp) / BigDecimal::from(10_000),
                volatility_index: BigDecimal::from(vix) / BigDecimal::from(100),
                event_risk_factor: event_risk,
                ticker_min_rate: BigDecimal::from(ticker_min_bp) / BigDecimal::from(10_000),
                global_min_rate: BigDecimal::from(global_min_bp) / BigDecimal::from(10_000),
                vol_factor: bd(DEFAULT_VOLATILITY_FACTOR),
                event_factor: bd(DEFAULT_EVENT_RISK_FACTOR),
            }).unwrap();

            let ticker_min = Rate::new(BigDecimal::from(ticker_min_bp) / BigDecimal::from(10_000));
            let global_min = Rate::new(BigDecimal::from(global_min_bp) / BigDecimal::from(10_000));
            prop_assert!(rate >= ticker_min);
            prop_assert!(rate >= global_min);
        }
    }
}

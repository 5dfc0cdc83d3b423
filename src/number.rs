//! Decimal number types for money and rates.
//!
//! We never use binary floating point for anything that ends up in a fee
//! calculation. [`Money`] and [`Rate`] both wrap [`BigDecimal`] and apply
//! half-even rounding only at their own boundary (construction), never in
//! the middle of a computation — intermediate kernel math stays on raw
//! `BigDecimal` values and is only rounded when it becomes a component of
//! a [`crate::kernel`] result.

use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode};
use serde::{Deserialize, Serialize};

/// Rates (annualized borrow rate, volatility factors, ...) round to 4 dp.
pub const RATE_SCALE: i64 = 4;
/// Money (currency amounts) rounds to 2 dp.
pub const MONEY_SCALE: i64 = 2;

/// A currency amount, always rounded half-even to 2 decimal places.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Money(BigDecimal);

/// An annualized rate (or rate-like factor), rounded half-even to 4 decimal places.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rate(BigDecimal);

macro_rules! decimal_newtype {
    ($name:ident, $scale:expr) => {
        impl $name {
            pub fn new(value: BigDecimal) -> Self {
                Self(value.with_scale_round($scale, RoundingMode::HalfEven))
            }

            pub fn zero() -> Self {
                Self::new(BigDecimal::from(0))
            }

            pub fn is_negative(&self) -> bool {
                self.0 < BigDecimal::from(0)
            }

            pub fn as_decimal(&self) -> &BigDecimal {
                &self.0
            }

            pub fn into_decimal(self) -> BigDecimal {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = bigdecimal::ParseBigDecimalError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self::new(BigDecimal::from_str(s)?))
            }
        }

        impl TryFrom<String> for $name {
            type Error = bigdecimal::ParseBigDecimalError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> String {
                v.0.to_string()
            }
        }

        impl From<BigDecimal> for $name {
            fn from(value: BigDecimal) -> Self {
                Self::new(value)
            }
        }

        impl Add for $name {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self::new(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                Self::new(self.0 - rhs.0)
            }
        }

        impl Mul<BigDecimal> for $name {
            type Output = Self;

            fn mul(self, rhs: BigDecimal) -> Self {
                Self::new(self.0 * rhs)
            }
        }
    };
}

decimal_newtype!(Money, MONEY_SCALE);
decimal_newtype!(Rate, RATE_SCALE);

impl Money {
    pub fn is_zero(&self) -> bool {
        self.as_decimal() == &BigDecimal::from(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_rounds_half_even() {
        let m = Money::new(BigDecimal::from_str("1.005").unwrap());
        // 1.005 -> nearest even cent is 1.00
        assert_eq!(m.to_string(), "1.00");
        let m = Money::new(BigDecimal::from_str("1.015").unwrap());
        assert_eq!(m.to_string(), "1.02");
    }

    #[test]
    fn rate_rounds_to_four_places() {
        let r = Rate::new(BigDecimal::from_str("0.060000000001").unwrap());
        assert_eq!(r.to_string(), "0.0600");
    }
}

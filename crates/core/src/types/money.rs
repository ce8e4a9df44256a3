//! Exact monetary amounts using decimal arithmetic.
//!
//! Prices reach the service as GraphQL `Float` values. They are converted once,
//! at the boundary, through their shortest decimal representation and every
//! later computation (order totals) happens in [`Decimal`]. Binary floating
//! point never touches a persisted amount.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors converting or computing money values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// The upstream float was NaN or infinite.
    #[error("amount is not a finite number")]
    NotFinite,

    /// The value does not fit in a decimal.
    #[error("amount out of range: {0}")]
    OutOfRange(String),

    /// Amounts must not be negative.
    #[error("amount must not be negative: {0}")]
    Negative(Decimal),
}

/// A non-negative amount in the catalog's currency unit (e.g., dollars, not cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Negative` for amounts below zero.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Convert a price received as a binary float.
    ///
    /// Uses the float's shortest round-trip representation, so `19.99_f64`
    /// becomes exactly `19.99` rather than `19.989999999999998436805981327779591083526611328125`.
    ///
    /// # Errors
    ///
    /// Returns an error if the float is not finite, too large for a decimal, or negative.
    pub fn from_f64(value: f64) -> Result<Self, MoneyError> {
        if !value.is_finite() {
            return Err(MoneyError::NotFinite);
        }
        let repr = value.to_string();
        let amount = Decimal::from_str(&repr).map_err(|_| MoneyError::OutOfRange(repr))?;
        Self::new(amount)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply a unit price by a quantity.
    ///
    /// Returns `None` on decimal overflow.
    #[must_use]
    pub fn checked_mul_quantity(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(quantity)).map(Self)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s).map_err(|_| MoneyError::OutOfRange(s.to_owned()))?;
        Self::new(amount)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_f64_uses_shortest_representation() {
        let price = Money::from_f64(19.99).unwrap();
        assert_eq!(price.amount(), Decimal::new(1999, 2));

        let price = Money::from_f64(10.0).unwrap();
        assert_eq!(price.amount(), Decimal::new(10, 0));
    }

    #[test]
    fn test_from_f64_rejects_non_finite_and_negative() {
        assert_eq!(Money::from_f64(f64::NAN), Err(MoneyError::NotFinite));
        assert_eq!(Money::from_f64(f64::INFINITY), Err(MoneyError::NotFinite));
        assert!(matches!(
            Money::from_f64(-1.5),
            Err(MoneyError::Negative(_))
        ));
    }

    #[test]
    fn test_checked_mul_quantity_is_exact() {
        // 0.1 * 3 is 0.30000000000000004 in f64
        let price = Money::from_f64(0.1).unwrap();
        let total = price.checked_mul_quantity(3).unwrap();
        assert_eq!(total.amount(), Decimal::new(3, 1));
    }

    #[test]
    fn test_checked_mul_quantity_overflow() {
        let price = Money::new(Decimal::MAX).unwrap();
        assert!(price.checked_mul_quantity(2).is_none());
    }

    #[test]
    fn test_serializes_as_string() {
        let price: Money = "12.50".parse().unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"12.50\"");
    }
}

//! Product price with the catalog's decimal constraints.
//!
//! Prices are stored as `NUMERIC(10, 2)`: at most ten significant digits, at
//! most two of them after the decimal point, and strictly positive.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceError {
    /// The input is not a decimal number.
    #[error("Enter a number.")]
    NotANumber,
    /// Too many significant digits overall.
    #[error("Ensure that there are no more than {max} digits in total.")]
    TooManyDigits {
        /// Maximum digits allowed.
        max: u32,
    },
    /// Too many digits after the decimal point.
    #[error("Ensure that there are no more than {max} decimal places.")]
    TooManyDecimalPlaces {
        /// Maximum decimal places allowed.
        max: u32,
    },
    /// Too many digits before the decimal point.
    #[error("Ensure that there are no more than {max} digits before the decimal point.")]
    TooManyWholeDigits {
        /// Maximum whole digits allowed.
        max: u32,
    },
    /// Zero or negative amount.
    #[error("Price must be greater than zero.")]
    NotPositive,
}

/// A validated, strictly positive product price.
///
/// ```
/// use product_manager_core::{Price, PriceError};
///
/// let price = Price::parse("19.99").unwrap();
/// assert_eq!(price.to_string(), "19.99");
///
/// assert_eq!(Price::parse("0"), Err(PriceError::NotPositive));
/// assert_eq!(Price::parse("-5"), Err(PriceError::NotPositive));
/// assert!(Price::parse("1.005").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Maximum number of significant digits.
    pub const MAX_DIGITS: u32 = 10;

    /// Maximum number of digits after the decimal point.
    pub const DECIMAL_PLACES: u32 = 2;

    /// Parse a price from user input.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::NotANumber`] for non-decimal input, one of the
    /// precision variants when the value does not fit `NUMERIC(10, 2)`, and
    /// [`PriceError::NotPositive`] when the value is zero or negative.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| PriceError::NotANumber)?;
        Self::new(amount)
    }

    /// Validate an already-parsed decimal amount.
    ///
    /// # Errors
    ///
    /// Same precision and positivity rules as [`Price::parse`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        check_precision(amount)?;
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }
        Ok(Self(amount))
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price multiplied by a line quantity.
    #[must_use]
    pub fn times(&self, quantity: i32) -> Decimal {
        self.0 * Decimal::from(quantity)
    }
}

/// Enforce `NUMERIC(MAX_DIGITS, DECIMAL_PLACES)` on a decimal.
fn check_precision(amount: Decimal) -> Result<(), PriceError> {
    let decimals = amount.scale();
    let significant = count_digits(amount.mantissa().unsigned_abs());
    let digits = significant.max(decimals);
    let whole_digits = digits - decimals;

    if digits > Price::MAX_DIGITS {
        return Err(PriceError::TooManyDigits {
            max: Price::MAX_DIGITS,
        });
    }
    if decimals > Price::DECIMAL_PLACES {
        return Err(PriceError::TooManyDecimalPlaces {
            max: Price::DECIMAL_PLACES,
        });
    }
    if whole_digits > Price::MAX_DIGITS - Price::DECIMAL_PLACES {
        return Err(PriceError::TooManyWholeDigits {
            max: Price::MAX_DIGITS - Price::DECIMAL_PLACES,
        });
    }
    Ok(())
}

fn count_digits(mut n: u128) -> u32 {
    let mut count = 1;
    while n >= 10 {
        n /= 10;
        count += 1;
    }
    count
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // The CHECK constraint keeps stored prices positive
        Ok(Self(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
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
    fn test_non_positive_prices_are_rejected() {
        for raw in ["0", "0.00", "-0.01", "-1", "-99999999.99"] {
            assert_eq!(Price::parse(raw), Err(PriceError::NotPositive), "{raw}");
        }
    }

    #[test]
    fn test_positive_prices_are_accepted() {
        for raw in ["0.01", "1", "10.5", "99999999.99", " 42.00 "] {
            assert!(Price::parse(raw).is_ok(), "{raw}");
        }
    }

    #[test]
    fn test_not_a_number() {
        assert_eq!(Price::parse("abc"), Err(PriceError::NotANumber));
        assert_eq!(Price::parse(""), Err(PriceError::NotANumber));
    }

    #[test]
    fn test_precision_limits() {
        assert_eq!(
            Price::parse("1.001"),
            Err(PriceError::TooManyDecimalPlaces { max: 2 })
        );
        assert_eq!(
            Price::parse("123456789"),
            Err(PriceError::TooManyWholeDigits { max: 8 })
        );
        assert_eq!(
            Price::parse("12345678901"),
            Err(PriceError::TooManyDigits { max: 10 })
        );
    }

    #[test]
    fn test_display_pads_two_places() {
        assert_eq!(Price::parse("5").unwrap().to_string(), "5.00");
        assert_eq!(Price::parse("5.5").unwrap().to_string(), "5.50");
    }

    #[test]
    fn test_times() {
        let price = Price::parse("10.00").unwrap();
        assert_eq!(price.times(3), Decimal::new(3000, 2));
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<Price>("\"12.50\"").is_ok());
        assert!(serde_json::from_str::<Price>("\"-1\"").is_err());
    }
}

//! Cart line quantity.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Non-fatal signal raised when a requested quantity could not be used.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityWarning {
    /// The quantity was non-numeric or below one and was replaced with one.
    #[error("Invalid quantity {raw:?}; defaulted to 1.")]
    InvalidQuantity {
        /// The rejected input.
        raw: String,
    },
}

/// A positive cart quantity (minimum one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(i32);

impl Quantity {
    /// The smallest allowed quantity.
    pub const ONE: Self = Self(1);

    /// Create a quantity, returning `None` below one.
    #[must_use]
    pub const fn new(value: i32) -> Option<Self> {
        if value >= 1 { Some(Self(value)) } else { None }
    }

    /// Parse a requested quantity, falling back to one.
    ///
    /// A missing value means one with no warning. A present value that is not
    /// an integer, or is below one, also yields one together with a
    /// [`QuantityWarning::InvalidQuantity`] for the caller to surface.
    ///
    /// ```
    /// use product_manager_core::Quantity;
    ///
    /// assert_eq!(Quantity::parse_or_clamp(Some("3")), (Quantity::new(3).unwrap(), None));
    /// assert_eq!(Quantity::parse_or_clamp(None), (Quantity::ONE, None));
    ///
    /// let (qty, warning) = Quantity::parse_or_clamp(Some("abc"));
    /// assert_eq!(qty, Quantity::ONE);
    /// assert!(warning.is_some());
    /// ```
    #[must_use]
    pub fn parse_or_clamp(raw: Option<&str>) -> (Self, Option<QuantityWarning>) {
        let Some(raw) = raw else {
            return (Self::ONE, None);
        };

        match raw.trim().parse::<i32>().ok().and_then(Self::new) {
            Some(qty) => (qty, None),
            None => (
                Self::ONE,
                Some(QuantityWarning::InvalidQuantity {
                    raw: raw.to_owned(),
                }),
            ),
        }
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Add two quantities, returning `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_quantities() {
        assert_eq!(Quantity::parse_or_clamp(Some("1")).0.get(), 1);
        assert_eq!(Quantity::parse_or_clamp(Some(" 12 ")).0.get(), 12);
        assert_eq!(Quantity::parse_or_clamp(Some("+4")).0.get(), 4);
    }

    #[test]
    fn test_invalid_quantities_clamp_with_warning() {
        for raw in ["abc", "0", "-5", "", "2.5", "99999999999"] {
            let (qty, warning) = Quantity::parse_or_clamp(Some(raw));
            assert_eq!(qty, Quantity::ONE, "{raw}");
            assert_eq!(
                warning,
                Some(QuantityWarning::InvalidQuantity {
                    raw: raw.to_owned()
                }),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_missing_quantity_has_no_warning() {
        assert_eq!(Quantity::parse_or_clamp(None), (Quantity::ONE, None));
    }

    #[test]
    fn test_checked_add() {
        let three = Quantity::new(3).unwrap();
        let two = Quantity::new(2).unwrap();
        assert_eq!(three.checked_add(two).unwrap().get(), 5);
        assert!(Quantity::new(i32::MAX).unwrap().checked_add(two).is_none());
    }
}

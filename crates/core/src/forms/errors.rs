//! Field-level validation errors shared by the product form and the
//! specification formset.

use core::fmt;

use serde::Serialize;

use crate::types::PriceError;

/// What went wrong with a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldErrorKind {
    /// A required value is missing or blank.
    Required,
    /// The value exceeds its maximum length.
    TooLong {
        /// Maximum number of characters.
        max: usize,
    },
    /// The price is present but not strictly greater than zero.
    InvalidPrice,
    /// The price is not a decimal that fits `NUMERIC(10, 2)`.
    InvalidDecimal {
        /// Human-readable reason.
        reason: String,
    },
    /// The slug contains characters outside `[A-Za-z0-9_-]`.
    InvalidSlug,
    /// Another product already uses this slug.
    DuplicateSlug,
    /// The referenced row does not belong to this product.
    InvalidChoice,
    /// The uploaded file is not an accepted image.
    InvalidImage,
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => f.write_str("This field is required."),
            Self::TooLong { max } => {
                write!(f, "Ensure this value has at most {max} characters.")
            }
            Self::InvalidPrice => f.write_str("Price must be greater than zero."),
            Self::InvalidDecimal { reason } => f.write_str(reason),
            Self::InvalidSlug => f.write_str(
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
            ),
            Self::DuplicateSlug => f.write_str("Product with this Slug already exists."),
            Self::InvalidChoice => f.write_str("Select a valid choice."),
            Self::InvalidImage => f.write_str(
                "Upload a valid image. Accepted formats: jpg, jpeg, png, gif, webp.",
            ),
        }
    }
}

impl From<PriceError> for FieldErrorKind {
    fn from(err: PriceError) -> Self {
        match err {
            PriceError::NotPositive => Self::InvalidPrice,
            other => Self::InvalidDecimal {
                reason: other.to_string(),
            },
        }
    }
}

/// An error attached to a named form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Form field name, e.g. `price` or `specs-0-key_name`.
    pub field: String,
    /// What failed.
    #[serde(flatten)]
    pub kind: FieldErrorKind,
}

impl FieldError {
    /// Create a field error.
    #[must_use]
    pub fn new(field: impl Into<String>, kind: FieldErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

/// All errors found while validating a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("submission has {count} invalid field(s)", count = .errors.len())]
pub struct FormErrors {
    errors: Vec<FieldError>,
}

impl FormErrors {
    /// An empty error set.
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// A set holding one error.
    #[must_use]
    pub fn single(field: impl Into<String>, kind: FieldErrorKind) -> Self {
        Self {
            errors: vec![FieldError::new(field, kind)],
        }
    }

    /// Record an error.
    pub fn push(&mut self, field: impl Into<String>, kind: FieldErrorKind) {
        self.errors.push(FieldError::new(field, kind));
    }

    /// Append every error from `other`.
    pub fn extend(&mut self, other: Self) {
        self.errors.extend(other.errors);
    }

    /// Whether no errors were recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// All recorded errors in submission order.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Whether `field` has an error of `kind`.
    #[must_use]
    pub fn has(&self, field: &str, kind: &FieldErrorKind) -> bool {
        self.errors
            .iter()
            .any(|e| e.field == field && &e.kind == kind)
    }

    /// Messages for one field, for rendering next to its input.
    #[must_use]
    pub fn messages_for(&self, field: &str) -> Vec<String> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.kind.to_string())
            .collect()
    }

    /// `Ok(value)` when empty, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one error was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_error_mapping() {
        assert_eq!(
            FieldErrorKind::from(PriceError::NotPositive),
            FieldErrorKind::InvalidPrice
        );
        assert!(matches!(
            FieldErrorKind::from(PriceError::NotANumber),
            FieldErrorKind::InvalidDecimal { .. }
        ));
    }

    #[test]
    fn test_messages_for_field() {
        let mut errors = FormErrors::new();
        errors.push("name", FieldErrorKind::Required);
        errors.push("price", FieldErrorKind::InvalidPrice);
        assert_eq!(errors.messages_for("price"), ["Price must be greater than zero."]);
        assert!(errors.messages_for("slug").is_empty());
        assert_eq!(errors.to_string(), "submission has 2 invalid field(s)");
    }

    #[test]
    fn test_into_result() {
        assert_eq!(FormErrors::new().into_result(5), Ok(5));
        assert!(FormErrors::single("x", FieldErrorKind::Required)
            .into_result(5)
            .is_err());
    }
}

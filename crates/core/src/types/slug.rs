//! URL slug for products.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugError {
    /// The input is blank.
    #[error("This field is required.")]
    Empty,
    /// The input is longer than [`Slug::MAX_LENGTH`].
    #[error("Ensure this value has at most {max} characters.")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains characters outside `[A-Za-z0-9_-]`.
    #[error("Enter a valid \u{201c}slug\u{201d} consisting of letters, numbers, underscores or hyphens.")]
    InvalidCharacter,
}

/// A product slug: ASCII letters, digits, underscores and hyphens.
///
/// Uniqueness is a storage concern and is enforced by the database index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Maximum slug length.
    pub const MAX_LENGTH: usize = 50;

    /// Parse a slug, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`SlugError`] when the slug is blank, too long or contains a
    /// character outside `[A-Za-z0-9_-]`.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(SlugError::InvalidCharacter);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Slug {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Slug {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Slug {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_slugs() {
        assert!(Slug::parse("laptop-15").is_ok());
        assert!(Slug::parse("USB_C_cable").is_ok());
        assert_eq!(Slug::parse("  phone ").map(|s| s.0), Ok("phone".to_owned()));
    }

    #[test]
    fn test_invalid_slugs() {
        assert_eq!(Slug::parse(""), Err(SlugError::Empty));
        assert_eq!(Slug::parse("has space"), Err(SlugError::InvalidCharacter));
        assert_eq!(Slug::parse("caf\u{e9}"), Err(SlugError::InvalidCharacter));
        assert_eq!(
            Slug::parse(&"a".repeat(51)),
            Err(SlugError::TooLong { max: 50 })
        );
    }
}

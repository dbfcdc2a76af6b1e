//! Product form validation.

use serde::Deserialize;

use super::errors::{FieldErrorKind, FormErrors};
use crate::types::{Price, Slug, SlugError};

/// Maximum product name length.
pub const NAME_MAX_LENGTH: usize = 255;

/// Raw product fields as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub slug: String,
    pub description: String,
    /// `None` or blank means the field was left empty.
    pub price: Option<String>,
}

/// Product fields that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub price: Price,
}

impl ProductInput {
    /// Validate every field and collect all errors.
    ///
    /// # Errors
    ///
    /// Returns [`FormErrors`] listing each invalid field. A present price that
    /// is zero or negative is reported as [`FieldErrorKind::InvalidPrice`].
    pub fn validate(&self) -> Result<ProductDraft, FormErrors> {
        let mut errors = FormErrors::new();

        let name = required_text(&self.name, Some(NAME_MAX_LENGTH))
            .map_err(|kind| errors.push("name", kind))
            .ok();

        let slug = Slug::parse(&self.slug)
            .map_err(|e| errors.push("slug", slug_error_kind(e)))
            .ok();

        let description = required_text(&self.description, None)
            .map_err(|kind| errors.push("description", kind))
            .ok();

        let price = match self.price.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push("price", FieldErrorKind::Required);
                None
            }
            Some(raw) => Price::parse(raw)
                .map_err(|e| errors.push("price", e.into()))
                .ok(),
        };

        match (name, slug, description, price) {
            (Some(name), Some(slug), Some(description), Some(price)) if errors.is_empty() => {
                Ok(ProductDraft {
                    name,
                    slug,
                    description,
                    price,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Trim a text field and enforce presence and an optional length cap.
pub(crate) fn required_text(raw: &str, max: Option<usize>) -> Result<String, FieldErrorKind> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldErrorKind::Required);
    }
    if let Some(max) = max
        && trimmed.chars().count() > max
    {
        return Err(FieldErrorKind::TooLong { max });
    }
    Ok(trimmed.to_owned())
}

const fn slug_error_kind(err: SlugError) -> FieldErrorKind {
    match err {
        SlugError::Empty => FieldErrorKind::Required,
        SlugError::TooLong { max } => FieldErrorKind::TooLong { max },
        SlugError::InvalidCharacter => FieldErrorKind::InvalidSlug,
    }
}

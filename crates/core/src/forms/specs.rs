//! Specification formset: the batch of key/value rows edited together with a
//! product.
//!
//! Rows arrive as [`SpecRowInput`] in submission order. [`validate_spec_rows`]
//! checks the whole batch before anything is written and turns it into a
//! [`SpecPlan`], an ordered list of [`SpecEdit`] commands the store applies
//! inside the product's transaction.

use std::collections::HashSet;

use super::errors::{FieldErrorKind, FormErrors};
use super::product::required_text;
use crate::types::SpecificationId;

/// Formset field prefix (`specs-0-key_name`, `specs-TOTAL_FORMS`, ...).
pub const SPEC_PREFIX: &str = "specs";

/// Maximum length of a key name or value.
pub const SPEC_FIELD_MAX_LENGTH: usize = 100;

/// One submitted specification row, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecRowInput {
    /// Existing row id, blank for a new row.
    pub id: Option<String>,
    pub key_name: String,
    pub value: String,
    /// The delete checkbox.
    pub delete: bool,
}

impl SpecRowInput {
    /// A new row with the given key and value.
    #[must_use]
    pub fn new(key_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: None,
            key_name: key_name.into(),
            value: value.into(),
            delete: false,
        }
    }

    /// An edit of an existing row.
    #[must_use]
    pub fn existing(
        id: SpecificationId,
        key_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Self::new(key_name, value)
        }
    }

    /// A deletion of an existing row.
    #[must_use]
    pub fn delete(id: SpecificationId) -> Self {
        Self {
            id: Some(id.to_string()),
            delete: true,
            ..Self::default()
        }
    }

    fn is_blank(&self) -> bool {
        self.key_name.trim().is_empty() && self.value.trim().is_empty()
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Validated key/value data for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDraft {
    pub key_name: String,
    pub value: String,
}

/// A single validated change to a product's specifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecEdit {
    /// Insert a new row.
    Create(SpecDraft),
    /// Overwrite an existing row.
    Update(SpecificationId, SpecDraft),
    /// Remove an existing row.
    Delete(SpecificationId),
}

/// The ordered commands produced from a valid formset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecPlan {
    edits: Vec<SpecEdit>,
}

impl SpecPlan {
    /// Commands in submission order.
    #[must_use]
    pub fn edits(&self) -> &[SpecEdit] {
        &self.edits
    }

    /// Whether the plan changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Number of rows the plan inserts.
    #[must_use]
    pub fn creates(&self) -> usize {
        self.edits
            .iter()
            .filter(|e| matches!(e, SpecEdit::Create(_)))
            .count()
    }
}

impl FromIterator<SpecEdit> for SpecPlan {
    fn from_iter<I: IntoIterator<Item = SpecEdit>>(iter: I) -> Self {
        Self {
            edits: iter.into_iter().collect(),
        }
    }
}

/// Form field name for a row's field, e.g. `specs-3-value`.
#[must_use]
pub fn spec_field_name(index: usize, field: &str) -> String {
    format!("{SPEC_PREFIX}-{index}-{field}")
}

/// Validate a batch of specification rows.
///
/// `existing` lists the ids currently attached to the product (empty when
/// creating). Blank new rows and deletions of rows that were never saved are
/// dropped. Duplicate key names are allowed. Each existing id may appear on
/// one row; a repeated delete is ignored and any other repeat is an invalid
/// choice.
///
/// # Errors
///
/// Returns [`FormErrors`] naming each invalid row field; nothing in the batch
/// should be persisted in that case.
pub fn validate_spec_rows(
    rows: &[SpecRowInput],
    existing: &[SpecificationId],
) -> Result<SpecPlan, FormErrors> {
    let known: HashSet<SpecificationId> = existing.iter().copied().collect();
    let mut errors = FormErrors::new();
    let mut edits = Vec::with_capacity(rows.len());
    let mut claimed: HashSet<SpecificationId> = HashSet::new();
    let mut deleted: HashSet<SpecificationId> = HashSet::new();

    for (index, row) in rows.iter().enumerate() {
        let id = match row.id() {
            None => None,
            Some(raw) => match raw.parse::<SpecificationId>() {
                Ok(id) if known.contains(&id) => Some(id),
                _ => {
                    errors.push(spec_field_name(index, "id"), FieldErrorKind::InvalidChoice);
                    continue;
                }
            },
        };

        if let Some(id) = id
            && !claimed.insert(id)
        {
            // A second delete of the same row changes nothing.
            if !(row.delete && deleted.contains(&id)) {
                errors.push(spec_field_name(index, "id"), FieldErrorKind::InvalidChoice);
            }
            continue;
        }

        match (id, row.delete) {
            (Some(id), true) => {
                deleted.insert(id);
                edits.push(SpecEdit::Delete(id));
            }
            (None, true) => {}
            (None, false) if row.is_blank() => {}
            (id, false) => {
                let key_name = required_text(&row.key_name, Some(SPEC_FIELD_MAX_LENGTH))
                    .map_err(|kind| errors.push(spec_field_name(index, "key_name"), kind))
                    .ok();
                let value = required_text(&row.value, Some(SPEC_FIELD_MAX_LENGTH))
                    .map_err(|kind| errors.push(spec_field_name(index, "value"), kind))
                    .ok();

                if let (Some(key_name), Some(value)) = (key_name, value) {
                    let draft = SpecDraft { key_name, value };
                    edits.push(match id {
                        Some(id) => SpecEdit::Update(id, draft),
                        None => SpecEdit::Create(draft),
                    });
                }
            }
        }
    }

    errors.into_result(SpecPlan { edits })
}

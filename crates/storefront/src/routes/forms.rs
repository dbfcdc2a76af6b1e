//! Product form parsing and re-rendering.
//!
//! The product form posts `multipart/form-data`: the product fields, an
//! optional `image` file and the specification formset
//! (`specs-TOTAL_FORMS`, `specs-N-id`, `specs-N-key_name`, `specs-N-value`,
//! `specs-N-DELETE`).

use std::collections::HashMap;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;

use product_manager_core::forms::{FormErrors, ProductInput, SPEC_PREFIX, SpecRowInput, spec_field_name};

use crate::error::AppError;
use crate::models::ProductWithSpecs;
use crate::services::ImageUpload;

/// Name of the file input.
pub const IMAGE_FIELD: &str = "image";

/// Upper bound on formset rows read from one submission.
pub const MAX_SPEC_ROWS: usize = 1000;

fn total_forms_field() -> String {
    format!("{SPEC_PREFIX}-TOTAL_FORMS")
}

/// A parsed product form submission.
#[derive(Debug, Clone, Default)]
pub struct ProductSubmission {
    pub input: ProductInput,
    pub rows: Vec<SpecRowInput>,
    pub image: Option<ImageUpload>,
}

impl ProductSubmission {
    /// Read every part of a multipart body.
    ///
    /// A file part with an empty file name means no file was chosen.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the body is not valid multipart.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut fields = HashMap::new();
        let mut image = None;

        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            if name == IMAGE_FIELD {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                if !file_name.is_empty() {
                    image = Some(ImageUpload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            } else {
                let value = field.text().await.map_err(bad_multipart)?;
                fields.insert(name, value);
            }
        }

        Ok(Self::from_fields(&fields, image))
    }

    /// Build a submission from already-decoded text fields.
    ///
    /// The row count comes from `specs-TOTAL_FORMS`; without it, the highest
    /// row index present decides.
    #[must_use]
    pub fn from_fields(fields: &HashMap<String, String>, image: Option<ImageUpload>) -> Self {
        let text = |key: &str| fields.get(key).cloned().unwrap_or_default();

        let input = ProductInput {
            name: text("name"),
            slug: text("slug"),
            description: text("description"),
            price: fields.get("price").cloned(),
        };

        let rows = (0..spec_row_count(fields))
            .map(|index| SpecRowInput {
                id: fields.get(&spec_field_name(index, "id")).cloned(),
                key_name: text(&spec_field_name(index, "key_name")),
                value: text(&spec_field_name(index, "value")),
                delete: fields
                    .get(&spec_field_name(index, "DELETE"))
                    .is_some_and(|v| is_checked(v)),
            })
            .collect();

        Self { input, rows, image }
    }
}

fn bad_multipart(err: MultipartError) -> AppError {
    AppError::BadRequest(err.body_text())
}

fn is_checked(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "on" | "true" | "1")
}

fn spec_row_count(fields: &HashMap<String, String>) -> usize {
    let declared = fields
        .get(&total_forms_field())
        .and_then(|v| v.trim().parse::<usize>().ok());

    declared
        .unwrap_or_else(|| {
            fields
                .keys()
                .filter_map(|key| row_index(key))
                .max()
                .map_or(0, |max| max + 1)
        })
        .min(MAX_SPEC_ROWS)
}

/// Row index of a formset field name such as `specs-4-value`.
fn row_index(key: &str) -> Option<usize> {
    let rest = key.strip_prefix(SPEC_PREFIX)?.strip_prefix('-')?;
    let (index, _field) = rest.split_once('-')?;
    index.parse().ok()
}

// =============================================================================
// Form view models
// =============================================================================

/// One formset row as rendered.
#[derive(Debug, Clone, Default)]
pub struct SpecRowView {
    pub index: usize,
    /// Existing row id, empty for a new row.
    pub id: String,
    pub key_name: String,
    pub value: String,
    pub delete: bool,
    pub errors: Vec<String>,
}

impl SpecRowView {
    fn blank(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Field name for this row, e.g. `specs-0-value`.
    #[must_use]
    pub fn field(&self, name: &str) -> String {
        spec_field_name(self.index, name)
    }

    /// Whether the row refers to a saved specification.
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        !self.id.is_empty()
    }
}

/// Values and errors for the product form.
#[derive(Debug, Clone, Default)]
pub struct ProductFormView {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: String,
    pub current_image: Option<String>,
    pub rows: Vec<SpecRowView>,
    errors: FormErrors,
}

impl ProductFormView {
    /// An empty form with one blank row.
    #[must_use]
    pub fn blank() -> Self {
        Self {
            rows: vec![SpecRowView::blank(0)],
            ..Self::default()
        }
    }

    /// A form filled from a saved product: one row per specification plus
    /// one blank row.
    #[must_use]
    pub fn from_product(saved: &ProductWithSpecs) -> Self {
        let mut rows: Vec<SpecRowView> = saved
            .specs
            .iter()
            .enumerate()
            .map(|(index, spec)| SpecRowView {
                index,
                id: spec.id.to_string(),
                key_name: spec.key_name.clone(),
                value: spec.value.clone(),
                ..SpecRowView::default()
            })
            .collect();
        rows.push(SpecRowView::blank(rows.len()));

        let product = &saved.product;
        Self {
            name: product.name.clone(),
            slug: product.slug.to_string(),
            description: product.description.clone(),
            price: product.price.to_string(),
            current_image: product.image.clone(),
            rows,
            errors: FormErrors::new(),
        }
    }

    /// The submitted values with their errors, for re-rendering.
    #[must_use]
    pub fn from_submission(
        submission: &ProductSubmission,
        errors: FormErrors,
        current_image: Option<String>,
    ) -> Self {
        let rows = submission
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let errors = ["id", "key_name", "value"]
                    .iter()
                    .flat_map(|field| errors.messages_for(&spec_field_name(index, field)))
                    .collect();
                SpecRowView {
                    index,
                    id: row.id.clone().unwrap_or_default(),
                    key_name: row.key_name.clone(),
                    value: row.value.clone(),
                    delete: row.delete,
                    errors,
                }
            })
            .collect();

        let input = &submission.input;
        Self {
            name: input.name.clone(),
            slug: input.slug.clone(),
            description: input.description.clone(),
            price: input.price.clone().unwrap_or_default(),
            current_image,
            rows,
            errors,
        }
    }

    /// Messages for a product field.
    #[must_use]
    pub fn errors_for(&self, field: &str) -> Vec<String> {
        self.errors.messages_for(field)
    }

    /// Whether any field has an error.
    #[must_use]
    pub const fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Value for the `specs-TOTAL_FORMS` hidden input.
    #[must_use]
    pub fn total_forms(&self) -> usize {
        self.rows.len()
    }

    /// Name of the `specs-TOTAL_FORMS` hidden input.
    #[must_use]
    pub fn total_forms_field(&self) -> String {
        total_forms_field()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use product_manager_core::forms::FieldErrorKind;

    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_product_fields_and_rows() {
        let submission = ProductSubmission::from_fields(
            &fields(&[
                ("name", "Laptop"),
                ("slug", "laptop"),
                ("description", "Portable"),
                ("price", "999.99"),
                ("specs-TOTAL_FORMS", "2"),
                ("specs-0-key_name", "RAM"),
                ("specs-0-value", "16GB"),
                ("specs-1-id", "7"),
                ("specs-1-key_name", "CPU"),
                ("specs-1-value", "M3"),
                ("specs-1-DELETE", "on"),
            ]),
            None,
        );

        assert_eq!(submission.input.name, "Laptop");
        assert_eq!(submission.input.price.as_deref(), Some("999.99"));
        assert_eq!(submission.rows.len(), 2);
        assert_eq!(submission.rows[0], SpecRowInput::new("RAM", "16GB"));
        assert_eq!(submission.rows[1].id.as_deref(), Some("7"));
        assert!(submission.rows[1].delete);
    }

    #[test]
    fn test_missing_price_stays_none() {
        let submission = ProductSubmission::from_fields(&fields(&[("name", "Mouse")]), None);
        assert!(submission.input.price.is_none());
        assert!(submission.rows.is_empty());
    }

    #[test]
    fn test_row_count_inferred_without_total() {
        let submission = ProductSubmission::from_fields(
            &fields(&[("specs-2-key_name", "Color"), ("specs-2-value", "Red")]),
            None,
        );

        assert_eq!(submission.rows.len(), 3);
        assert_eq!(submission.rows[0], SpecRowInput::default());
        assert_eq!(submission.rows[2].key_name, "Color");
    }

    #[test]
    fn test_row_count_is_capped() {
        let submission =
            ProductSubmission::from_fields(&fields(&[("specs-TOTAL_FORMS", "1000000")]), None);
        assert_eq!(submission.rows.len(), MAX_SPEC_ROWS);
    }

    #[test]
    fn test_delete_checkbox_values() {
        assert!(is_checked("on"));
        assert!(is_checked("True"));
        assert!(is_checked("1"));
        assert!(!is_checked(""));
        assert!(!is_checked("off"));
    }

    #[test]
    fn test_row_index() {
        assert_eq!(row_index("specs-12-value"), Some(12));
        assert_eq!(row_index("specs-TOTAL_FORMS"), None);
        assert_eq!(row_index("name"), None);
    }

    #[test]
    fn test_blank_form_has_one_row() {
        let view = ProductFormView::blank();
        assert_eq!(view.total_forms(), 1);
        assert!(!view.rows[0].is_saved());
        assert_eq!(view.rows[0].field("key_name"), "specs-0-key_name");
    }

    #[test]
    fn test_resubmission_keeps_values_and_row_errors() {
        let submission = ProductSubmission::from_fields(
            &fields(&[
                ("name", "Phone"),
                ("price", "-5"),
                ("specs-TOTAL_FORMS", "1"),
                ("specs-0-key_name", "RAM"),
            ]),
            None,
        );
        let mut errors = FormErrors::single("price", FieldErrorKind::InvalidPrice);
        errors.push("specs-0-value", FieldErrorKind::Required);

        let view = ProductFormView::from_submission(&submission, errors, None);

        assert_eq!(view.price, "-5");
        assert_eq!(view.errors_for("price"), vec!["Price must be greater than zero."]);
        assert_eq!(view.rows[0].key_name, "RAM");
        assert_eq!(view.rows[0].errors, vec!["This field is required."]);
        assert!(view.has_errors());
    }
}

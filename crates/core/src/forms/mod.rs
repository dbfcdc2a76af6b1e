//! Validation of submitted product data.
//!
//! - [`product`] - the product's own fields
//! - [`specs`] - the specification formset submitted alongside it
//! - [`errors`] - field errors shared by both

pub mod errors;
pub mod product;
pub mod specs;

pub use errors::{FieldError, FieldErrorKind, FormErrors};
pub use product::{NAME_MAX_LENGTH, ProductDraft, ProductInput};
pub use specs::{
    SPEC_FIELD_MAX_LENGTH, SPEC_PREFIX, SpecDraft, SpecEdit, SpecPlan, SpecRowInput,
    spec_field_name, validate_spec_rows,
};

//! Product and specification domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use product_manager_core::forms::ProductDraft;
use product_manager_core::{Price, ProductId, Slug, SpecificationId};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub price: Price,
    /// Path of the uploaded image relative to the media root.
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A key/value specification row owned by a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Specification {
    pub id: SpecificationId,
    pub product_id: ProductId,
    pub key_name: String,
    pub value: String,
}

/// A product together with its specifications, ordered by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductWithSpecs {
    pub product: Product,
    pub specs: Vec<Specification>,
}

impl ProductWithSpecs {
    /// Ids of the attached specification rows.
    #[must_use]
    pub fn spec_ids(&self) -> Vec<SpecificationId> {
        self.specs.iter().map(|s| s.id).collect()
    }
}

/// Fields written to the product row on create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub draft: ProductDraft,
    /// New image path. `None` leaves the stored image unchanged on update.
    pub image: Option<String>,
}

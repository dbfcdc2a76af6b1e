//! Product catalog operations.
//!
//! Create and update validate the product fields, every specification row and
//! the optional image upload before touching the store, so an invalid
//! submission is reported in full and writes nothing. A valid submission goes
//! to the store's atomic product primitive in one call.

use tracing::instrument;

use product_manager_core::forms::{
    FieldErrorKind, FormErrors, ProductDraft, ProductInput, SpecPlan, SpecRowInput,
    validate_spec_rows,
};
use product_manager_core::{ProductId, SpecificationId};

use super::ServiceError;
use super::media::{ImageUpload, MediaStorage};
use crate::db::{ProductStore, RepositoryError};
use crate::models::{CurrentUser, Product, ProductRecord, ProductWithSpecs};

/// A validated submission ready for the store.
struct Submission {
    draft: ProductDraft,
    specs: SpecPlan,
}

/// Catalog service over any [`ProductStore`].
pub struct CatalogService<'a, S: ?Sized> {
    store: &'a S,
    media: &'a MediaStorage,
}

impl<'a, S: ProductStore + ?Sized> CatalogService<'a, S> {
    /// Create a catalog service.
    #[must_use]
    pub const fn new(store: &'a S, media: &'a MediaStorage) -> Self {
        Self { store, media }
    }

    /// All products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::System` if the store fails.
    pub async fn list(&self) -> Result<Vec<Product>, ServiceError> {
        Ok(self.store.list_products().await?)
    }

    /// One product with its specifications.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product doesn't exist.
    pub async fn get(&self, id: ProductId) -> Result<ProductWithSpecs, ServiceError> {
        self.store
            .get_product(id)
            .await?
            .ok_or(ServiceError::NotFound("product"))
    }

    /// Create a product with its specification rows.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::ValidationFailed` for invalid fields, rows, image
    /// or a duplicate slug; `ServiceError::System` if the transaction fails.
    #[instrument(skip_all, fields(user_id = %user.id, slug = %input.slug))]
    pub async fn create(
        &self,
        user: &CurrentUser,
        input: &ProductInput,
        rows: &[SpecRowInput],
        image: Option<&ImageUpload>,
    ) -> Result<ProductWithSpecs, ServiceError> {
        let submission = validate_submission(input, rows, &[], image)?;
        let image = self.store_image(image).await?;
        let record = ProductRecord {
            draft: submission.draft,
            image,
        };

        let result = self.store.create_product(&record, &submission.specs).await;
        let created = self.finish(result, record.image.as_deref()).await?;

        tracing::info!(
            product_id = %created.product.id,
            specs = created.specs.len(),
            "product created"
        );
        Ok(created)
    }

    /// Update a product and apply specification edits.
    ///
    /// Without a new image the current one is kept.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product doesn't exist,
    /// `ServiceError::ValidationFailed` for invalid input, and
    /// `ServiceError::System` if the transaction fails.
    #[instrument(skip_all, fields(user_id = %user.id, product_id = %id))]
    pub async fn update(
        &self,
        user: &CurrentUser,
        id: ProductId,
        input: &ProductInput,
        rows: &[SpecRowInput],
        image: Option<&ImageUpload>,
    ) -> Result<ProductWithSpecs, ServiceError> {
        let current = self.get(id).await?;
        let submission = validate_submission(input, rows, &current.spec_ids(), image)?;
        let image = self.store_image(image).await?;
        let record = ProductRecord {
            draft: submission.draft,
            image,
        };

        let result = self
            .store
            .update_product(id, &record, &submission.specs)
            .await;
        let updated = self.finish(result, record.image.as_deref()).await?;

        tracing::info!(
            product_id = %id,
            edits = submission.specs.edits().len(),
            "product updated"
        );
        Ok(updated)
    }

    /// Delete a product; its specifications and cart lines go with it.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product doesn't exist.
    #[instrument(skip_all, fields(user_id = %user.id, product_id = %id))]
    pub async fn delete(&self, user: &CurrentUser, id: ProductId) -> Result<(), ServiceError> {
        if !self.store.delete_product(id).await? {
            return Err(ServiceError::NotFound("product"));
        }
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }

    async fn store_image(&self, image: Option<&ImageUpload>) -> Result<Option<String>, ServiceError> {
        match image {
            Some(upload) => Ok(Some(self.media.save_product_image(upload).await?)),
            None => Ok(None),
        }
    }

    /// Map store errors and remove an orphaned upload when the write failed.
    async fn finish(
        &self,
        result: Result<ProductWithSpecs, RepositoryError>,
        saved_image: Option<&str>,
    ) -> Result<ProductWithSpecs, ServiceError> {
        let err = match result {
            Ok(product) => return Ok(product),
            Err(err) => err,
        };

        if let Some(path) = saved_image
            && let Err(e) = self.media.remove(path).await
        {
            tracing::warn!(error = %e, path, "failed to remove orphaned upload");
        }

        Err(match err {
            RepositoryError::Conflict(field) if field == "slug" => {
                ServiceError::ValidationFailed(FormErrors::single(
                    "slug",
                    FieldErrorKind::DuplicateSlug,
                ))
            }
            RepositoryError::NotFound => ServiceError::NotFound("product"),
            other => ServiceError::System(other),
        })
    }
}

fn validate_submission(
    input: &ProductInput,
    rows: &[SpecRowInput],
    existing: &[SpecificationId],
    image: Option<&ImageUpload>,
) -> Result<Submission, ServiceError> {
    let mut errors = FormErrors::new();

    let draft = input.validate().map_err(|e| errors.extend(e)).ok();
    let specs = validate_spec_rows(rows, existing)
        .map_err(|e| errors.extend(e))
        .ok();
    if let Some(upload) = image
        && upload.accepted_extension().is_none()
    {
        errors.push("image", FieldErrorKind::InvalidImage);
    }

    match (draft, specs) {
        (Some(draft), Some(specs)) if errors.is_empty() => Ok(Submission { draft, specs }),
        _ => Err(ServiceError::ValidationFailed(errors)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use product_manager_core::{Email, UserId};

    use super::*;
    use crate::db::MemoryStore;

    fn user() -> CurrentUser {
        CurrentUser {
            id: UserId::new(1),
            email: Email::parse("admin@example.com").unwrap(),
        }
    }

    fn input(slug: &str, price: &str) -> ProductInput {
        ProductInput {
            name: "Laptop".to_owned(),
            slug: slug.to_owned(),
            description: "A portable computer".to_owned(),
            price: Some(price.to_owned()),
        }
    }

    fn media() -> MediaStorage {
        MediaStorage::new(std::env::temp_dir().join("pm-catalog-tests"))
    }

    #[tokio::test]
    async fn test_create_with_specs() {
        let store = MemoryStore::new();
        let media = media();
        let catalog = CatalogService::new(&store, &media);
        let rows = [
            SpecRowInput::new("RAM", "16GB"),
            SpecRowInput::new("Storage", "512GB"),
            SpecRowInput::default(),
        ];

        let created = catalog
            .create(&user(), &input("laptop", "999.99"), &rows, None)
            .await
            .unwrap();

        assert_eq!(created.specs.len(), 2);
        assert_eq!(catalog.get(created.product.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_invalid_price_writes_nothing() {
        let store = MemoryStore::new();
        let media = media();
        let catalog = CatalogService::new(&store, &media);

        for price in ["0", "-5"] {
            let err = catalog
                .create(&user(), &input("laptop", price), &[SpecRowInput::new("RAM", "8GB")], None)
                .await
                .unwrap_err();
            let ServiceError::ValidationFailed(errors) = err else {
                panic!("expected validation failure");
            };
            assert!(errors.has("price", &FieldErrorKind::InvalidPrice));
        }

        assert!(catalog.list().await.unwrap().is_empty());
        assert_eq!(store.spec_count().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_spec_row_blocks_product() {
        let store = MemoryStore::new();
        let media = media();
        let catalog = CatalogService::new(&store, &media);
        let rows = [SpecRowInput::new("RAM", "8GB"), SpecRowInput::new("", "orphan")];

        let err = catalog
            .create(&user(), &input("laptop", "10"), &rows, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::ValidationFailed(e) if e.has("specs-1-key_name", &FieldErrorKind::Required)));
        assert!(catalog.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_mid_formset_rolls_back() {
        let store = MemoryStore::new();
        let media = media();
        let catalog = CatalogService::new(&store, &media);
        store.fail_spec_writes_after(2).await;
        let rows = [
            SpecRowInput::new("A", "1"),
            SpecRowInput::new("B", "2"),
            SpecRowInput::new("C", "3"),
        ];

        let err = catalog
            .create(&user(), &input("laptop", "10"), &rows, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::System(_)));
        assert!(catalog.list().await.unwrap().is_empty());
        assert_eq!(store.spec_count().await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_field_error() {
        let store = MemoryStore::new();
        let media = media();
        let catalog = CatalogService::new(&store, &media);
        catalog
            .create(&user(), &input("laptop", "10"), &[], None)
            .await
            .unwrap();

        let err = catalog
            .create(&user(), &input("laptop", "20"), &[], None)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::ValidationFailed(e) if e.has("slug", &FieldErrorKind::DuplicateSlug)));
        assert_eq!(catalog.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_edits_specs() {
        let store = MemoryStore::new();
        let media = media();
        let catalog = CatalogService::new(&store, &media);
        let created = catalog
            .create(
                &user(),
                &input("laptop", "10"),
                &[SpecRowInput::new("RAM", "8GB"), SpecRowInput::new("GPU", "none")],
                None,
            )
            .await
            .unwrap();
        let ram = created.specs[0].id;
        let gpu = created.specs[1].id;

        let rows = [
            SpecRowInput::existing(ram, "RAM", "32GB"),
            SpecRowInput::delete(gpu),
            SpecRowInput::new("Color", "Silver"),
        ];
        let updated = catalog
            .update(&user(), created.product.id, &input("laptop", "12.50"), &rows, None)
            .await
            .unwrap();

        let pairs: Vec<_> = updated
            .specs
            .iter()
            .map(|s| (s.key_name.as_str(), s.value.as_str()))
            .collect();
        assert_eq!(pairs, [("RAM", "32GB"), ("Color", "Silver")]);
        assert_eq!(updated.product.price.to_string(), "12.50");
    }

    #[tokio::test]
    async fn test_update_rejects_foreign_spec_id() {
        let store = MemoryStore::new();
        let media = media();
        let catalog = CatalogService::new(&store, &media);
        let a = catalog
            .create(&user(), &input("a", "10"), &[SpecRowInput::new("K", "V")], None)
            .await
            .unwrap();
        let b = catalog
            .create(&user(), &input("b", "10"), &[], None)
            .await
            .unwrap();

        let rows = [SpecRowInput::delete(a.specs[0].id)];
        let err = catalog
            .update(&user(), b.product.id, &input("b", "10"), &rows, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::ValidationFailed(e) if e.has("specs-0-id", &FieldErrorKind::InvalidChoice)));
        assert_eq!(store.spec_count().await, 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_product() {
        let store = MemoryStore::new();
        let media = media();
        let catalog = CatalogService::new(&store, &media);
        let missing = ProductId::new(42);

        assert!(matches!(
            catalog.update(&user(), missing, &input("x", "1"), &[], None).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            catalog.delete(&user(), missing).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(catalog.get(missing).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rejected_image_type() {
        let store = MemoryStore::new();
        let media = media();
        let catalog = CatalogService::new(&store, &media);
        let upload = ImageUpload {
            file_name: "virus.exe".to_owned(),
            bytes: vec![1, 2, 3],
        };

        let err = catalog
            .create(&user(), &input("x", "1"), &[], Some(&upload))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::ValidationFailed(e) if e.has("image", &FieldErrorKind::InvalidImage)));
    }
}

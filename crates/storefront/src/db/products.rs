//! Product and specification repository.
//!
//! Product writes and their specification edits share one transaction: the
//! product row is written first, then every [`SpecEdit`] in order, then the
//! transaction commits. Any error returns early and the uncommitted
//! transaction rolls back on drop.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use product_manager_core::forms::{SpecEdit, SpecPlan};
use product_manager_core::{Price, ProductId, Slug, SpecificationId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Product, ProductRecord, ProductWithSpecs, Specification};

const PRODUCT_COLUMNS: &str = "id, name, slug, description, price, image, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    slug: String,
    description: String,
    price: Decimal,
    image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let slug = Slug::parse(&row.slug).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid slug for product {}: {e}", row.id))
        })?;
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for product {}: {e}", row.id))
        })?;

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            slug,
            description: row.description,
            price,
            image: row.image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SpecificationRow {
    id: i32,
    product_id: i32,
    key_name: String,
    value: String,
}

impl From<SpecificationRow> for Specification {
    fn from(row: SpecificationRow) -> Self {
        Self {
            id: SpecificationId::new(row.id),
            product_id: ProductId::new(row.product_id),
            key_name: row.key_name,
            value: row.value,
        }
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// A product with its specifications.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_with_specs(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductWithSpecs>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let Some(product) = fetch_product(&mut conn, id).await? else {
            return Ok(None);
        };
        let specs = fetch_specs(&mut conn, id).await?;
        Ok(Some(ProductWithSpecs { product, specs }))
    }

    /// Insert a product and its specification rows in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict("slug")` if the slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        record: &ProductRecord,
        specs: &SpecPlan,
    ) -> Result<ProductWithSpecs, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO storefront.product (name, slug, description, price, image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&record.draft.name)
        .bind(&record.draft.slug)
        .bind(&record.draft.description)
        .bind(record.draft.price)
        .bind(record.image.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(conflict_on_unique("slug"))?;

        let product = Product::try_from(row)?;
        apply_spec_plan(&mut tx, product.id, specs).await?;
        let specs = fetch_specs(&mut tx, product.id).await?;

        tx.commit().await?;

        Ok(ProductWithSpecs { product, specs })
    }

    /// Update a product and apply specification edits in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::StaleRow` if an edited spec row is gone.
    /// Returns `RepositoryError::Conflict("slug")` if the slug is taken.
    pub async fn update(
        &self,
        id: ProductId,
        record: &ProductRecord,
        specs: &SpecPlan,
    ) -> Result<ProductWithSpecs, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE storefront.product
            SET name = $2, slug = $3, description = $4, price = $5,
                image = COALESCE($6, image), updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&record.draft.name)
        .bind(&record.draft.slug)
        .bind(&record.draft.description)
        .bind(record.draft.price)
        .bind(record.image.as_deref())
        .fetch_optional(&mut *tx)
        .await
        .map_err(conflict_on_unique("slug"))?
        .ok_or(RepositoryError::NotFound)?;

        let product = Product::try_from(row)?;
        apply_spec_plan(&mut tx, id, specs).await?;
        let specs = fetch_specs(&mut tx, id).await?;

        tx.commit().await?;

        Ok(ProductWithSpecs { product, specs })
    }

    /// Delete a product. Specifications and cart items go with it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

async fn fetch_product(
    conn: &mut sqlx::PgConnection,
    id: ProductId,
) -> Result<Option<Product>, RepositoryError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Product::try_from).transpose()
}

async fn fetch_specs(
    conn: &mut sqlx::PgConnection,
    product_id: ProductId,
) -> Result<Vec<Specification>, RepositoryError> {
    let rows = sqlx::query_as::<_, SpecificationRow>(
        r"
        SELECT id, product_id, key_name, value
        FROM storefront.specification
        WHERE product_id = $1
        ORDER BY id
        ",
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(Specification::from).collect())
}

async fn apply_spec_plan(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    plan: &SpecPlan,
) -> Result<(), RepositoryError> {
    for edit in plan.edits() {
        match edit {
            SpecEdit::Create(draft) => {
                sqlx::query(
                    r"
                    INSERT INTO storefront.specification (product_id, key_name, value)
                    VALUES ($1, $2, $3)
                    ",
                )
                .bind(product_id)
                .bind(&draft.key_name)
                .bind(&draft.value)
                .execute(&mut **tx)
                .await?;
            }
            SpecEdit::Update(spec_id, draft) => {
                let result = sqlx::query(
                    r"
                    UPDATE storefront.specification
                    SET key_name = $3, value = $4
                    WHERE id = $1 AND product_id = $2
                    ",
                )
                .bind(spec_id)
                .bind(product_id)
                .bind(&draft.key_name)
                .bind(&draft.value)
                .execute(&mut **tx)
                .await?;
                ensure_applied(result.rows_affected(), *spec_id)?;
            }
            SpecEdit::Delete(spec_id) => {
                let result = sqlx::query(
                    "DELETE FROM storefront.specification WHERE id = $1 AND product_id = $2",
                )
                .bind(spec_id)
                .bind(product_id)
                .execute(&mut **tx)
                .await?;
                ensure_applied(result.rows_affected(), *spec_id)?;
            }
        }
    }
    Ok(())
}

fn ensure_applied(rows: u64, id: SpecificationId) -> Result<(), RepositoryError> {
    if rows == 0 {
        return Err(RepositoryError::StaleRow {
            table: "specification",
            id: id.as_i32(),
        });
    }
    Ok(())
}

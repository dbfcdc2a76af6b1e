//! In-process [`Store`] used by tests and local demos.
//!
//! All tables live behind one `tokio::sync::RwLock`. Multi-row writes run
//! against a staged clone of the tables which replaces the live copy only
//! when every step succeeded, so a failed batch leaves nothing behind.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use product_manager_core::forms::{SpecEdit, SpecPlan};
use product_manager_core::{
    CartItemId, CartLine, Email, ProductId, Quantity, SpecificationId, UserId,
};

use super::{CartStore, ProductStore, RepositoryError, Store, UserStore};
use crate::models::{
    CartItem, CartUpsert, Product, ProductRecord, ProductWithSpecs, Specification, User,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    last_id: i32,
    users: BTreeMap<UserId, (User, String)>,
    products: BTreeMap<ProductId, Product>,
    specs: BTreeMap<SpecificationId, Specification>,
    cart: BTreeMap<CartItemId, CartItem>,
    /// Remaining spec writes before an injected failure.
    spec_writes_left: Option<usize>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn specs_for(&self, product_id: ProductId) -> Vec<Specification> {
        self.specs
            .values()
            .filter(|s| s.product_id == product_id)
            .cloned()
            .collect()
    }

    fn with_specs(&self, product: Product) -> ProductWithSpecs {
        let specs = self.specs_for(product.id);
        ProductWithSpecs { product, specs }
    }

    fn slug_taken(&self, record: &ProductRecord, except: Option<ProductId>) -> bool {
        self.products
            .values()
            .any(|p| p.slug == record.draft.slug && Some(p.id) != except)
    }

    fn charge_spec_write(&mut self) -> Result<(), RepositoryError> {
        match self.spec_writes_left {
            Some(0) => Err(RepositoryError::Database(sqlx::Error::Protocol(
                "injected specification write failure".to_owned(),
            ))),
            Some(ref mut n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn apply_spec_plan(
        &mut self,
        product_id: ProductId,
        plan: &SpecPlan,
    ) -> Result<(), RepositoryError> {
        for edit in plan.edits() {
            self.charge_spec_write()?;
            match edit {
                SpecEdit::Create(draft) => {
                    let id = SpecificationId::new(self.next_id());
                    self.specs.insert(
                        id,
                        Specification {
                            id,
                            product_id,
                            key_name: draft.key_name.clone(),
                            value: draft.value.clone(),
                        },
                    );
                }
                SpecEdit::Update(id, draft) => {
                    let spec = self
                        .specs
                        .get_mut(id)
                        .filter(|s| s.product_id == product_id)
                        .ok_or_else(|| stale(*id))?;
                    spec.key_name.clone_from(&draft.key_name);
                    spec.value.clone_from(&draft.value);
                }
                SpecEdit::Delete(id) => {
                    if self.specs.get(id).is_none_or(|s| s.product_id != product_id) {
                        return Err(stale(*id));
                    }
                    self.specs.remove(id);
                }
            }
        }
        Ok(())
    }
}

fn stale(id: SpecificationId) -> RepositoryError {
    RepositoryError::StaleRow {
        table: "specification",
        id: id.as_i32(),
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` on a staged copy and publish it only if `f` succeeds.
    async fn transaction<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, RepositoryError> + Send,
    ) -> Result<T, RepositoryError> {
        let mut live = self.tables.write().await;
        let mut staged = live.clone();
        let value = f(&mut staged)?;
        *live = staged;
        Ok(value)
    }
}

/// Inspection and fault-injection hooks for tests.
#[cfg(any(test, feature = "test-support"))]
impl MemoryStore {
    /// Make the write after the next `writes` specification writes fail,
    /// aborting whichever batch it belongs to.
    pub async fn fail_spec_writes_after(&self, writes: usize) {
        self.tables.write().await.spec_writes_left = Some(writes);
    }

    /// Number of stored specification rows across all products.
    pub async fn spec_count(&self) -> usize {
        self.tables.read().await.specs.len()
    }

    /// Number of stored cart rows across all users.
    pub async fn cart_item_count(&self) -> usize {
        self.tables.read().await.cart.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        self.transaction(|t| {
            if t.users.values().any(|(u, _)| &u.email == email) {
                return Err(RepositoryError::Conflict("email".to_owned()));
            }
            let user = User {
                id: UserId::new(t.next_id()),
                email: email.clone(),
                created_at: Utc::now(),
            };
            t.users
                .insert(user.id, (user.clone(), password_hash.to_owned()));
            Ok(user)
        })
        .await
    }

    async fn get_user_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|(u, _)| &u.email == email)
            .cloned())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|(u, _)| u.clone()))
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.products.values().rev().cloned().collect())
    }

    async fn get_product(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductWithSpecs>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .get(&id)
            .cloned()
            .map(|p| tables.with_specs(p)))
    }

    async fn create_product(
        &self,
        record: &ProductRecord,
        specs: &SpecPlan,
    ) -> Result<ProductWithSpecs, RepositoryError> {
        self.transaction(|t| {
            if t.slug_taken(record, None) {
                return Err(RepositoryError::Conflict("slug".to_owned()));
            }
            let now = Utc::now();
            let product = Product {
                id: ProductId::new(t.next_id()),
                name: record.draft.name.clone(),
                slug: record.draft.slug.clone(),
                description: record.draft.description.clone(),
                price: record.draft.price,
                image: record.image.clone(),
                created_at: now,
                updated_at: now,
            };
            t.products.insert(product.id, product.clone());
            t.apply_spec_plan(product.id, specs)?;
            Ok(t.with_specs(product))
        })
        .await
    }

    async fn update_product(
        &self,
        id: ProductId,
        record: &ProductRecord,
        specs: &SpecPlan,
    ) -> Result<ProductWithSpecs, RepositoryError> {
        self.transaction(|t| {
            if t.slug_taken(record, Some(id)) {
                return Err(RepositoryError::Conflict("slug".to_owned()));
            }
            let product = t.products.get_mut(&id).ok_or(RepositoryError::NotFound)?;
            product.name.clone_from(&record.draft.name);
            product.slug = record.draft.slug.clone();
            product.description.clone_from(&record.draft.description);
            product.price = record.draft.price;
            if let Some(image) = &record.image {
                product.image = Some(image.clone());
            }
            product.updated_at = Utc::now();
            let product = product.clone();

            t.apply_spec_plan(id, specs)?;
            Ok(t.with_specs(product))
        })
        .await
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        self.transaction(|t| {
            if t.products.remove(&id).is_none() {
                return Ok(false);
            }
            t.specs.retain(|_, s| s.product_id != id);
            t.cart.retain(|_, c| c.product_id != id);
            Ok(true)
        })
        .await
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn add_or_increment(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartUpsert, RepositoryError> {
        self.transaction(|t| {
            if !t.products.contains_key(&product_id) || !t.users.contains_key(&user_id) {
                return Err(RepositoryError::NotFound);
            }

            if let Some(item) = t
                .cart
                .values_mut()
                .find(|c| c.user_id == user_id && c.product_id == product_id)
            {
                item.quantity = item
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| RepositoryError::Conflict("quantity".to_owned()))?;
                return Ok(CartUpsert {
                    item: item.clone(),
                    created: false,
                });
            }

            let item = CartItem {
                id: CartItemId::new(t.next_id()),
                user_id,
                product_id,
                quantity,
            };
            t.cart.insert(item.id, item.clone());
            Ok(CartUpsert {
                item,
                created: true,
            })
        })
        .await
    }

    async fn list_cart(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let tables = self.tables.read().await;
        tables
            .cart
            .values()
            .filter(|c| c.user_id == user_id)
            .map(|c| {
                let product = tables.products.get(&c.product_id).ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "cart item {} references missing product {}",
                        c.id, c.product_id
                    ))
                })?;
                Ok(CartLine {
                    item_id: c.id,
                    product_id: product.id,
                    product_name: product.name.clone(),
                    unit_price: product.price,
                    quantity: c.quantity,
                })
            })
            .collect()
    }

    async fn remove_cart_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        self.transaction(|t| {
            let owned = t.cart.get(&item_id).is_some_and(|c| c.user_id == user_id);
            if owned {
                t.cart.remove(&item_id);
            }
            Ok(owned)
        })
        .await
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

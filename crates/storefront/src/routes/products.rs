//! Product route handlers.
//!
//! Validation errors re-render the form with the submitted values; store
//! failures are logged and reported to the user without losing their input.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use product_manager_core::ProductId;
use product_manager_core::forms::FormErrors;

use super::PageContext;
use super::forms::{ProductFormView, ProductSubmission};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{RequireAuth, push_flash};
use crate::models::{FlashLevel, Product, Specification};
use crate::services::{CatalogService, ServiceError};
use crate::state::AppState;

const INVALID_SUBMISSION: &str = "Please correct the errors below.";

// =============================================================================
// Templates
// =============================================================================

/// Product list template.
#[derive(Template, WebTemplate)]
#[template(path = "products/list.html")]
pub struct ProductListTemplate {
    pub page: PageContext,
    pub products: Vec<Product>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "products/detail.html")]
pub struct ProductDetailTemplate {
    pub page: PageContext,
    pub product: Product,
    pub specs: Vec<Specification>,
}

/// Create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub page: PageContext,
    pub form: ProductFormView,
    /// "Create" or "Edit".
    pub action: &'static str,
    pub action_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Copy)]
enum FormMode {
    Create,
    Edit(ProductId),
}

impl ProductFormTemplate {
    fn new(page: PageContext, form: ProductFormView, mode: FormMode) -> Self {
        match mode {
            FormMode::Create => Self {
                page,
                form,
                action: "Create",
                action_url: "/products/new".to_owned(),
                cancel_url: "/".to_owned(),
            },
            FormMode::Edit(id) => Self {
                page,
                form,
                action: "Edit",
                action_url: format!("/products/{id}/edit"),
                cancel_url: format!("/products/{id}"),
            },
        }
    }
}

// =============================================================================
// Read Routes
// =============================================================================

/// Display all products, newest first.
///
/// A store failure renders an empty list with an error message.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let catalog = CatalogService::new(state.store(), state.media());
    let page = PageContext::load(&session, Some(user)).await?;

    let (products, page) = match catalog.list().await {
        Ok(products) => (products, page),
        Err(e) => {
            tracing::error!(error = %e, "failed to list products");
            (
                Vec::new(),
                page.with_message(FlashLevel::Error, "Could not load products. Please try again."),
            )
        }
    };

    Ok(ProductListTemplate { page, products }.into_response())
}

/// Display one product with its specifications.
///
/// A missing product redirects to the list with an error message.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let catalog = CatalogService::new(state.store(), state.media());

    match catalog.get(id).await {
        Ok(found) => {
            let page = PageContext::load(&session, Some(user)).await?;
            Ok(ProductDetailTemplate {
                page,
                product: found.product,
                specs: found.specs,
            }
            .into_response())
        }
        Err(e) => {
            if !matches!(e, ServiceError::NotFound(_)) {
                tracing::error!(error = %e, "failed to load product");
            }
            push_flash(&session, FlashLevel::Error, "Product not found or error occurred.").await?;
            Ok(Redirect::to("/").into_response())
        }
    }
}

// =============================================================================
// Create Routes
// =============================================================================

/// Display the create form with one blank specification row.
pub async fn new_form(session: Session, RequireAuth(user): RequireAuth) -> Result<Response> {
    let page = PageContext::load(&session, Some(user)).await?;
    Ok(ProductFormTemplate::new(page, ProductFormView::blank(), FormMode::Create).into_response())
}

/// Handle the create form.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Response> {
    let submission = ProductSubmission::from_multipart(multipart).await?;
    let catalog = CatalogService::new(state.store(), state.media());

    let result = catalog
        .create(
            &user,
            &submission.input,
            &submission.rows,
            submission.image.as_ref(),
        )
        .await;

    match result {
        Ok(created) => {
            add_breadcrumb(
                "catalog",
                "Product created",
                &[("product_id", created.product.id.to_string())],
            );
            push_flash(&session, FlashLevel::Success, "Product created successfully!").await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(err) => {
            let (errors, message) = rejected(err, "Could not save the product. Please try again.");
            let page = PageContext::load(&session, Some(user))
                .await?
                .with_message(FlashLevel::Error, message);
            let form = ProductFormView::from_submission(&submission, errors, None);
            Ok(ProductFormTemplate::new(page, form, FormMode::Create).into_response())
        }
    }
}

// =============================================================================
// Update Routes
// =============================================================================

/// Display the edit form: one row per specification plus one blank row.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn edit_form(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let catalog = CatalogService::new(state.store(), state.media());
    let found = catalog.get(id).await?;

    let page = PageContext::load(&session, Some(user)).await?;
    let form = ProductFormView::from_product(&found);
    Ok(ProductFormTemplate::new(page, form, FormMode::Edit(id)).into_response())
}

/// Handle the edit form.
#[instrument(skip(state, session, user, multipart), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Response> {
    let submission = ProductSubmission::from_multipart(multipart).await?;
    let catalog = CatalogService::new(state.store(), state.media());

    let result = catalog
        .update(
            &user,
            id,
            &submission.input,
            &submission.rows,
            submission.image.as_ref(),
        )
        .await;

    match result {
        Ok(updated) => {
            add_breadcrumb(
                "catalog",
                "Product updated",
                &[("product_id", updated.product.id.to_string())],
            );
            push_flash(&session, FlashLevel::Success, "Product updated!").await?;
            Ok(Redirect::to(&format!("/products/{id}")).into_response())
        }
        Err(ServiceError::NotFound(what)) => Err(AppError::NotFound(what.to_owned())),
        Err(err) => {
            let (errors, message) = rejected(err, "Update failed. Please try again.");
            let current_image = catalog.get(id).await.ok().and_then(|p| p.product.image);
            let page = PageContext::load(&session, Some(user))
                .await?
                .with_message(FlashLevel::Error, message);
            let form = ProductFormView::from_submission(&submission, errors, current_image);
            Ok(ProductFormTemplate::new(page, form, FormMode::Edit(id)).into_response())
        }
    }
}

// =============================================================================
// Delete Route
// =============================================================================

/// Delete a product with its specifications and cart lines.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let catalog = CatalogService::new(state.store(), state.media());

    match catalog.delete(&user, id).await {
        Ok(()) => {
            add_breadcrumb("catalog", "Product deleted", &[("product_id", id.to_string())]);
            push_flash(&session, FlashLevel::Success, "Product deleted!").await?;
        }
        Err(ServiceError::NotFound(what)) => return Err(AppError::NotFound(what.to_owned())),
        Err(e) => {
            tracing::error!(error = %e, "failed to delete product");
            push_flash(&session, FlashLevel::Error, "Could not delete product.").await?;
        }
    }

    Ok(Redirect::to("/").into_response())
}

/// Field errors and the page message for a failed create or update.
///
/// Anything other than a validation failure is logged and shown as
/// `system_message` with no field errors.
fn rejected(err: ServiceError, system_message: &'static str) -> (FormErrors, &'static str) {
    match err {
        ServiceError::ValidationFailed(errors) => (errors, INVALID_SUBMISSION),
        other => {
            tracing::error!(error = %other, "product write failed");
            (FormErrors::new(), system_message)
        }
    }
}

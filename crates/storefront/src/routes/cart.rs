//! Cart route handlers.
//!
//! Every handler acts on the logged-in user's cart only.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use product_manager_core::{CartItemId, ProductId};

use super::PageContext;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{RequireAuth, push_flash};
use crate::models::FlashLevel;
use crate::services::{CartService, CartSummary};
use crate::state::AppState;

/// Query parameters for add-to-cart.
#[derive(Debug, Deserialize)]
pub struct AddQuery {
    /// Raw quantity; parsed leniently by the cart service.
    pub qty: Option<String>,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub page: PageContext,
    pub cart: CartSummary,
}

/// Add a product to the cart and return to the product list.
///
/// An unusable `qty` adds one and shows a warning.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
    Query(query): Query<AddQuery>,
) -> Result<Response> {
    let outcome = CartService::new(state.store())
        .add(&user, product_id, query.qty.as_deref())
        .await?;

    if outcome.warning.is_some() {
        push_flash(&session, FlashLevel::Warning, "Invalid quantity! Defaulted to 1.").await?;
    }

    add_breadcrumb(
        "cart",
        "Added to cart",
        &[
            ("product_id", product_id.to_string()),
            ("quantity", outcome.item.quantity.to_string()),
        ],
    );
    push_flash(&session, FlashLevel::Success, outcome.message()).await?;

    Ok(Redirect::to("/").into_response())
}

/// Display the cart with its total.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let cart = CartService::new(state.store()).view(&user).await?;
    let page = PageContext::load(&session, Some(user)).await?;

    Ok(CartTemplate { page, cart }.into_response())
}

/// Remove a line from the cart.
///
/// A line that is missing or belongs to someone else is a 404.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(item_id): Path<CartItemId>,
) -> Result<Response> {
    CartService::new(state.store()).remove(&user, item_id).await?;

    push_flash(&session, FlashLevel::Success, "Item removed from cart.").await?;
    Ok(Redirect::to("/cart").into_response())
}

//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Store connectivity check
//!
//! # Products (requires auth)
//! GET  /                       - Product list
//! GET  /products/new           - Create form
//! POST /products/new           - Create (multipart)
//! GET  /products/{id}          - Product detail
//! GET  /products/{id}/edit     - Update form
//! POST /products/{id}/edit     - Update (multipart)
//! POST /products/{id}/delete   - Delete
//!
//! # Cart (requires auth)
//! GET  /cart                   - Cart page
//! GET  /cart/add/{id}?qty=N    - Add to cart
//! POST /cart/remove/{id}       - Remove line
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action
//! POST /auth/logout            - Logout action
//!
//! # Files
//! GET  /static/*               - Stylesheets
//! GET  /media/*                - Uploaded product images
//! ```

pub mod auth;
pub mod cart;
pub mod forms;
pub mod products;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::{Session, SessionManagerLayer, SessionStore};

use crate::error::Result;
use crate::middleware::{
    make_request_span, request_id_middleware, security_headers_middleware, take_flashes,
};
use crate::models::{CurrentUser, FlashLevel, FlashMessage};
use crate::state::AppState;

/// Largest accepted product form body, image included.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Data every page layout needs.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub flashes: Vec<FlashMessage>,
    pub user: Option<CurrentUser>,
}

impl PageContext {
    /// Drain queued flash messages for this render.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn load(session: &Session, user: Option<CurrentUser>) -> Result<Self> {
        Ok(Self {
            flashes: take_flashes(session).await?,
            user,
        })
    }

    /// Add a message shown on this render only.
    #[must_use]
    pub fn with_message(mut self, level: FlashLevel, text: impl Into<String>) -> Self {
        self.flashes.push(FlashMessage::new(level, text));
        self
    }
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/new", get(products::new_form).post(products::create))
        .route("/{id}", get(products::show))
        .route("/{id}/edit", get(products::edit_form).post(products::update))
        .route("/{id}/delete", post(products::delete))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add/{id}", get(cart::add))
        .route("/remove/{id}", post(cart::remove))
}

/// Create all page routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/auth", auth_routes())
}

/// Assemble the full application: pages, health checks, files and the
/// session, request-id, tracing and security-header layers.
///
/// Sentry layers are added by the binary.
pub fn app<SS>(state: AppState, session_layer: SessionManagerLayer<SS>) -> Router
where
    SS: SessionStore + Clone,
{
    let static_dir = ServeDir::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static"));
    let media_dir = ServeDir::new(state.media().root());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .nest_service("/static", static_dir)
        .nest_service("/media", media_dir)
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors)
//! 2. `TraceLayer` (request span, see [`make_request_span`])
//! 3. Request ID (record on span, echo in response)
//! 4. Security headers (CSP, frame and sniffing protection)
//! 5. Session layer (tower-sessions)
//!
//! Authentication is enforced per handler through the [`RequireAuth`]
//! extractor rather than a layer.

pub mod auth;
pub mod flash;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_user, login_url, safe_next, set_current_user};
pub use flash::{push_flash, take_flashes};
pub use request_id::{RequestId, make_request_span, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, session_layer};

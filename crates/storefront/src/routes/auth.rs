//! Authentication route handlers.
//!
//! Email and password login and registration. A successful login stores a
//! [`CurrentUser`] in the session and returns to the page that asked for it.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::PageContext;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, safe_next, set_current_user};
use crate::models::{CurrentUser, FlashLevel};
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub email: String,
    pub next: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub email: String,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<NextQuery>,
) -> Result<Response> {
    let next = safe_next(query.next.as_deref()).to_owned();
    if user.is_some() {
        return Ok(Redirect::to(&next).into_response());
    }

    let page = PageContext::load(&session, None).await?;
    Ok(LoginTemplate {
        page,
        email: String::new(),
        next,
    }
    .into_response())
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = safe_next(form.next.as_deref()).to_owned();

    match AuthService::new(state.store())
        .login_with_password(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            let current = CurrentUser::from(user);
            set_current_user(&session, &current).await?;
            set_sentry_user(&current.id, Some(current.email.as_str()));
            tracing::info!(user_id = %current.id, "user logged in");
            Ok(Redirect::to(&next).into_response())
        }
        Err(AuthError::InvalidCredentials | AuthError::InvalidEmail(_)) => {
            tracing::warn!("login failed");
            let page = PageContext::load(&session, None)
                .await?
                .with_message(FlashLevel::Error, "Invalid email or password.");
            let template = LoginTemplate {
                page,
                email: form.email,
                next,
            };
            Ok((StatusCode::UNAUTHORIZED, template).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(session: Session) -> Result<Response> {
    let page = PageContext::load(&session, None).await?;
    Ok(RegisterTemplate {
        page,
        email: String::new(),
    }
    .into_response())
}

/// Handle registration form submission.
///
/// A new account is logged in straight away.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let problem = if form.password == form.password_confirm {
        match AuthService::new(state.store())
            .register_with_password(&form.email, &form.password)
            .await
        {
            Ok(user) => {
                let current = CurrentUser::from(user);
                set_current_user(&session, &current).await?;
                set_sentry_user(&current.id, Some(current.email.as_str()));
                return Ok(Redirect::to("/").into_response());
            }
            Err(AuthError::InvalidEmail(_)) => "Enter a valid email address.".to_owned(),
            Err(AuthError::WeakPassword(reason)) => capitalize(&reason),
            Err(AuthError::UserAlreadyExists) => {
                "An account with this email already exists.".to_owned()
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        "Passwords do not match.".to_owned()
    };

    let page = PageContext::load(&session, None)
        .await?
        .with_message(FlashLevel::Error, problem);
    Ok((
        StatusCode::BAD_REQUEST,
        RegisterTemplate {
            page,
            email: form.email,
        },
    )
        .into_response())
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
pub async fn logout(session: Session) -> Result<Response> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/auth/login").into_response())
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        format!("{}{}.", first.to_uppercase(), chars.as_str())
    })
}

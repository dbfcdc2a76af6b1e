//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! pm-cli user create -e admin@example.com -p 'a long password'
//! ```

use product_manager_storefront::db::{self, PgStore};
use product_manager_storefront::services::{AuthError, AuthService};

use super::{CommandError, database_url};

/// Errors from user commands.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create a user with a password.
///
/// # Errors
///
/// Returns an error if the email is invalid or taken, the password is too
/// short, or the database fails.
pub async fn create(email: &str, password: &str) -> Result<(), UserError> {
    let database_url = database_url()?;
    let pool = db::create_pool(&database_url)
        .await
        .map_err(CommandError::from)?;
    let store = PgStore::new(pool);

    let user = AuthService::new(&store)
        .register_with_password(email, password)
        .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "User created");
    Ok(())
}

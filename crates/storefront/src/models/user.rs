//! User domain types.

use chrono::{DateTime, Utc};

use product_manager_core::{Email, UserId};

use super::CurrentUser;

/// A registered user (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login email address.
    pub email: Email,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

//! Session-backed flash messages.
//!
//! Handlers queue messages before redirecting; the next page render drains
//! the queue and shows them once.

use tower_sessions::Session;

use crate::models::{FlashLevel, FlashMessage, session_keys};

/// Queue a message for the next rendered page.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn push_flash(
    session: &Session,
    level: FlashLevel,
    text: impl Into<String>,
) -> Result<(), tower_sessions::session::Error> {
    let mut queue: Vec<FlashMessage> = session
        .get(session_keys::FLASH)
        .await?
        .unwrap_or_default();
    queue.push(FlashMessage::new(level, text));
    session.insert(session_keys::FLASH, queue).await
}

/// Remove and return every queued message, oldest first.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn take_flashes(
    session: &Session,
) -> Result<Vec<FlashMessage>, tower_sessions::session::Error> {
    Ok(session
        .remove::<Vec<FlashMessage>>(session_keys::FLASH)
        .await?
        .unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_flash_queue_drains_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        push_flash(&session, FlashLevel::Success, "Product created successfully!")
            .await
            .unwrap();
        push_flash(&session, FlashLevel::Warning, "Invalid quantity! Defaulted to 1.")
            .await
            .unwrap();

        let messages = take_flashes(&session).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].level, FlashLevel::Success);
        assert_eq!(messages[1].text, "Invalid quantity! Defaulted to 1.");

        assert!(take_flashes(&session).await.unwrap().is_empty());
    }
}

//! Flash notifications.
//!
//! Handlers queue a [`Flash`] before redirecting; the next page drains the
//! queue while building its `PageContext`.

use axum::response::{IntoResponse, Redirect, Response};
use tower_sessions::Session;

use crate::models::{Flash, session_keys};

/// Queue a notification for the next rendered page.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn push(session: &Session, flash: Flash) -> Result<(), tower_sessions::session::Error> {
    let mut queued: Vec<Flash> = session.get(session_keys::FLASH).await?.unwrap_or_default();
    queued.push(flash);
    session.insert(session_keys::FLASH, queued).await
}

/// Take every queued notification, leaving the queue empty.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn take(session: &Session) -> Result<Vec<Flash>, tower_sessions::session::Error> {
    Ok(session
        .remove::<Vec<Flash>>(session_keys::FLASH)
        .await?
        .unwrap_or_default())
}

/// Queue `flash` and redirect to `to`.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn redirect(
    session: &Session,
    flash: Flash,
    to: &str,
) -> Result<Response, tower_sessions::session::Error> {
    push(session, flash).await?;
    Ok(Redirect::to(to).into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_flashes_are_shown_once_in_order() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        push(&session, Flash::success("Added to cart")).await.unwrap();
        push(&session, Flash::error("Out of stock")).await.unwrap();

        let shown = take(&session).await.unwrap();
        assert_eq!(shown, vec![Flash::success("Added to cart"), Flash::error("Out of stock")]);
        assert!(take(&session).await.unwrap().is_empty());
    }
}

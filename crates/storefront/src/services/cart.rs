//! Cart summary synchronization.
//!
//! The summary in the session is only a mirror. Every mutating handler ends
//! with [`settle`], which refetches `GET /api/cart/all`; when that fails the
//! summary is left unconfirmed and [`summary`] retries on the next page.

use secrecy::SecretString;
use tower_sessions::Session;

use shopeasy_core::Price;
use shopeasy_core::cart::CartState;

use crate::api::ApiClient;
use crate::error::AppError;
use crate::models::session_keys;

/// The stored summary (unconfirmed default when none is stored).
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load(session: &Session) -> Result<CartState, tower_sessions::session::Error> {
    Ok(session.get(session_keys::CART).await?.unwrap_or_default())
}

async fn store(session: &Session, state: &CartState) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, state).await
}

/// Refetch the cart and reconcile the summary.
///
/// # Errors
///
/// Returns the backend error after marking the summary stale, or a session
/// error.
pub async fn refresh(
    api: &ApiClient,
    session: &Session,
    token: &SecretString,
) -> Result<CartState, AppError> {
    let mut state = load(session).await?;
    match api.cart(token).await {
        Ok(snapshot) => {
            state.reconcile(snapshot);
            store(session, &state).await?;
            Ok(state)
        }
        Err(e) => {
            state.mark_stale();
            store(session, &state).await?;
            Err(e.into())
        }
    }
}

/// Refresh after a mutation, tolerating a failed refetch.
///
/// # Errors
///
/// Returns an error only if the session store fails.
pub async fn settle(
    api: &ApiClient,
    session: &Session,
    token: &SecretString,
) -> Result<CartState, AppError> {
    match refresh(api, session, token).await {
        Ok(state) => Ok(state),
        Err(AppError::Api(e)) => {
            tracing::warn!(error = %e, "Cart refetch failed, summary left unconfirmed");
            Ok(load(session).await?)
        }
        Err(e) => Err(e),
    }
}

/// The summary for rendering, refetched first if unconfirmed.
///
/// # Errors
///
/// Returns an error only if the session store fails.
pub async fn summary(
    api: &ApiClient,
    session: &Session,
    token: &SecretString,
) -> Result<CartState, AppError> {
    let state = load(session).await?;
    if state.is_confirmed() {
        return Ok(state);
    }
    settle(api, session, token).await
}

/// Record an add the backend acknowledged.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn record_add(
    session: &Session,
    unit_price: Option<Price>,
) -> Result<(), tower_sessions::session::Error> {
    let mut state = load(session).await?;
    state.apply_optimistic_add(unit_price);
    store(session, &state).await
}

/// Forget the summary (logout).
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn forget(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove_value(session_keys::CART).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rust_decimal::Decimal;
    use tower_sessions::MemoryStore;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::ApiConfig;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn api(server: &MockServer) -> ApiClient {
        let config = ApiConfig::new(&server.uri(), Duration::from_secs(5)).unwrap();
        ApiClient::new(&config, Duration::from_secs(60)).unwrap()
    }

    fn token() -> SecretString {
        SecretString::from("tok")
    }

    async fn mount_cart(server: &MockServer, quantity: u32, sub_total: u32) {
        Mock::given(method("GET"))
            .and(path("/api/cart/all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "cart": [],
                "sumOfQuantities": quantity,
                "subTotal": sub_total
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_settle_reconciles_with_server() {
        let server = MockServer::start().await;
        mount_cart(&server, 3, 900).await;
        let session = session();

        record_add(&session, Some(Price::new(Decimal::from(100)))).await.unwrap();
        assert!(!load(&session).await.unwrap().is_confirmed());

        let state = settle(&api(&server), &session, &token()).await.unwrap();
        assert_eq!(state.total_quantity(), 3);
        assert!(state.is_confirmed());
        assert_eq!(load(&session).await.unwrap(), state);
    }

    #[tokio::test]
    async fn test_failed_refetch_leaves_summary_stale() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cart/all"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let session = session();
        record_add(&session, None).await.unwrap();

        let state = settle(&api(&server), &session, &token()).await.unwrap();
        assert_eq!(state.total_quantity(), 1);
        assert!(!state.is_confirmed());
    }

    #[tokio::test]
    async fn test_summary_only_refetches_when_unconfirmed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cart/all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "cart": [], "sumOfQuantities": 2, "subTotal": 40
            })))
            .expect(1)
            .mount(&server)
            .await;
        let session = session();
        let client = api(&server);

        assert_eq!(summary(&client, &session, &token()).await.unwrap().total_quantity(), 2);
        assert_eq!(summary(&client, &session, &token()).await.unwrap().total_quantity(), 2);
    }

    #[tokio::test]
    async fn test_forget_resets_summary() {
        let server = MockServer::start().await;
        mount_cart(&server, 5, 50).await;
        let session = session();
        refresh(&api(&server), &session, &token()).await.unwrap();

        forget(&session).await.unwrap();
        assert_eq!(load(&session).await.unwrap(), CartState::default());
    }
}

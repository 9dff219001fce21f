//! Authentication extractors and session helpers.
//!
//! A signed-in session holds the backend token plus the [`CurrentUser`] it
//! belongs to. When only the token survived (the user record was evicted or
//! never stored), extraction restores the user from `GET /api/user/my`; if
//! the backend rejects the token it is dropped and the visitor is a guest.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use tower_sessions::Session;

use crate::api::ApiClient;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{CurrentUser, Flash, session_keys};
use crate::services::{cart, flash};
use crate::state::AppState;

/// A signed-in user together with the token to act on their behalf.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: CurrentUser,
    pub token: SecretString,
}

/// Extractor that requires a signed-in user.
///
/// If nobody is signed in, redirects to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn orders(RequireAuth(auth): RequireAuth) -> impl IntoResponse {
///     format!("Orders for {}", auth.user.email)
/// }
/// ```
pub struct RequireAuth(pub Authenticated);

/// Extractor that requires a signed-in admin.
///
/// Guests are sent to the login page, other users to the home page.
pub struct RequireAdmin(pub Authenticated);

/// Extractor that optionally gets the signed-in user.
pub struct OptionalAuth(pub Option<Authenticated>);

/// Error returned when authentication is required but missing.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page.
    RedirectToLogin,
    /// Signed in, but not allowed here.
    RedirectHome,
    /// No session layer or the session store failed.
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::RedirectHome => Redirect::to("/").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

/// Resolve the signed-in user for a session, restoring it if needed.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn resolve(
    session: &Session,
    api: &ApiClient,
) -> Result<Option<Authenticated>, tower_sessions::session::Error> {
    let Some(token) = session.get::<String>(session_keys::TOKEN).await? else {
        return Ok(None);
    };
    let token = SecretString::from(token);

    if let Some(user) = session.get::<CurrentUser>(session_keys::CURRENT_USER).await? {
        return Ok(Some(Authenticated { user, token }));
    }

    match api.current_user(&token).await {
        Ok(user) => {
            let user = CurrentUser::from(user);
            session.insert(session_keys::CURRENT_USER, &user).await?;
            set_sentry_user(&user.id, Some(user.email.as_str()));
            tracing::debug!(user_id = %user.id, "Session restored from token");
            Ok(Some(Authenticated { user, token }))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Session restore failed, dropping token");
            clear_login(session).await?;
            Ok(None)
        }
    }
}

async fn session_from(parts: &Parts) -> Result<Session, AuthRejection> {
    parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or(AuthRejection::Unauthorized)
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = session_from(parts).await?;
        match resolve(&session, state.api()).await {
            Ok(Some(auth)) => Ok(Self(auth)),
            Ok(None) => {
                if let Err(e) = flash::push(&session, Flash::info("Please login to continue")).await
                {
                    tracing::warn!(error = %e, "Failed to queue login notice");
                }
                Err(AuthRejection::RedirectToLogin)
            }
            Err(e) => {
                tracing::error!(error = %e, "Session store error");
                Err(AuthRejection::Unauthorized)
            }
        }
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(auth) = RequireAuth::from_request_parts(parts, state).await?;
        if auth.user.is_admin() {
            Ok(Self(auth))
        } else {
            tracing::info!(user_id = %auth.user.id, "Non-admin tried to open the admin console");
            Err(AuthRejection::RedirectHome)
        }
    }
}

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self(None));
        };
        let auth = resolve(session, state.api()).await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Session store error");
            None
        });
        Ok(Self(auth))
    }
}

/// Store a fresh login, rotating the session ID.
///
/// Drops any pending OTP flow and the previous cart summary.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_login(
    session: &Session,
    token: &str,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::TOKEN, token).await?;
    session.insert(session_keys::CURRENT_USER, user).await?;
    session.remove_value(session_keys::OTP_FLOW).await?;
    cart::forget(session).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Remove the token, the user and the cart summary (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_login(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove_value(session_keys::TOKEN).await?;
    session.remove_value(session_keys::CURRENT_USER).await?;
    cart::forget(session).await?;
    clear_sentry_user();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tower_sessions::MemoryStore;
    use wiremock::matchers::{header, method, path};
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

    #[tokio::test]
    async fn test_guest_has_no_login() {
        let server = MockServer::start().await;
        assert!(resolve(&session(), &api(&server)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_token_without_user_is_restored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user/my"))
            .and(header("token", "tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_id": "u1", "email": "a@b.co", "role": "admin"
            })))
            .expect(1)
            .mount(&server)
            .await;
        let session = session();
        session.insert(session_keys::TOKEN, "tok").await.unwrap();

        let auth = resolve(&session, &api(&server)).await.unwrap().unwrap();
        assert!(auth.user.is_admin());

        // Stored now, so no second backend call.
        resolve(&session, &api(&server)).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_rejected_token_is_cleared() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user/my"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(serde_json::json!({"message": "Please Login"})),
            )
            .mount(&server)
            .await;
        let session = session();
        session.insert(session_keys::TOKEN, "expired").await.unwrap();

        assert!(resolve(&session, &api(&server)).await.unwrap().is_none());
        assert!(session.get::<String>(session_keys::TOKEN).await.unwrap().is_none());
    }
}

//! Authentication route handlers.
//!
//! Passwordless login: the backend emails a six-digit code, the user types
//! it into the verify page, and a successful verification yields the token
//! stored in the session. The pending [`OtpFlow`] lives in the
//! [`OtpFlows`](crate::services::otp::OtpFlows) registry between the two
//! steps; every handler that touches it holds the flow's lock.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use shopeasy_core::Email;
use shopeasy_core::otp::{OtpError, OtpFlow, OtpPhase};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{CspNonce, OptionalAuth, PageContext, clear_login, set_login};
use crate::models::{CurrentUser, Flash};
use crate::services::{cart, flash};
use crate::state::AppState;

const EMAIL_MISSING: &str = "Email not found. Please login again!";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
}

/// A keystroke forwarded from the OTP boxes.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum OtpKeystroke {
    Edit { index: usize, value: String },
    Backspace { index: usize },
    Paste { text: String },
}

/// Slot state returned to the OTP boxes after a keystroke.
#[derive(Debug, Serialize)]
pub struct OtpInputState {
    pub accepted: bool,
    pub slots: Vec<String>,
    pub focus: usize,
    pub complete: bool,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
}

/// OTP verification page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/verify.html")]
pub struct VerifyTemplate {
    pub page: PageContext,
    pub email: String,
    pub slots: Vec<String>,
    pub focus: usize,
    pub complete: bool,
    pub seconds_remaining: u32,
    pub can_resend: bool,
    pub error: Option<String>,
}

// =============================================================================
// Helpers
// =============================================================================

/// Digits submitted by the verify form.
///
/// The boxes post one `digit` field each; a script-assembled `otp` field
/// wins when present.
fn submitted_code(fields: &[(String, String)]) -> String {
    if let Some((_, otp)) = fields.iter().find(|(k, v)| k == "otp" && !v.trim().is_empty()) {
        return otp.trim().to_owned();
    }
    fields
        .iter()
        .filter(|(k, _)| k == "digit")
        .map(|(_, v)| v.trim())
        .collect()
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
#[instrument(skip_all)]
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    OptionalAuth(auth): OptionalAuth,
) -> Result<Response> {
    if auth.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    let page = PageContext::for_user(&state, &session, &nonce, None).await?;
    Ok(LoginTemplate { page }.into_response())
}

/// Ask the backend to email a code, then continue to the verify page.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(e) => {
            return Ok(flash::redirect(&session, Flash::error(e.to_string()), "/login").await?);
        }
    };

    match state.api().send_otp(&email).await {
        Ok(response) => {
            tracing::info!("OTP requested");
            state
                .otp_flows()
                .start(&session, OtpFlow::start(email, Utc::now()))
                .await?;
            Ok(flash::redirect(
                &session,
                Flash::success(response.or("OTP sent successfully")),
                "/verify",
            )
            .await?)
        }
        Err(e) => {
            tracing::warn!(error = %e, "OTP request failed");
            Ok(flash::redirect(&session, Flash::error(e.user_message("Login failed")), "/login")
                .await?)
        }
    }
}

// =============================================================================
// Verify Routes
// =============================================================================

/// Display the six-box code entry with the resend countdown.
#[instrument(skip_all)]
pub async fn verify_page(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
) -> Result<Response> {
    let Some(handle) = state.otp_flows().current(&session).await? else {
        return Ok(flash::redirect(&session, Flash::error(EMAIL_MISSING), "/login").await?);
    };
    let flow = handle.lock().await.clone();

    let now = Utc::now();
    let page = PageContext::for_user(&state, &session, &nonce, None).await?;
    Ok(VerifyTemplate {
        page,
        email: flow.email().to_string(),
        slots: flow.input().slots(),
        focus: flow.input().focus(),
        complete: flow.input().is_complete(),
        seconds_remaining: flow.seconds_remaining(now),
        can_resend: flow.can_resend(now),
        error: flow.last_error().map(String::from),
    }
    .into_response())
}

/// Submit the code.
///
/// On success the token and user are stored, the pending flow is dropped and
/// the cart summary is refetched. On failure the user stays on the verify
/// page with the backend's message.
///
/// The flow stays locked while the backend checks the code, so keystrokes
/// and other submissions wait for the outcome. The attempt is only written
/// back once the backend answers; an abandoned request leaves the flow as it
/// was before the submission.
#[instrument(skip_all)]
pub async fn verify(
    State(state): State<AppState>,
    session: Session,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let Some(handle) = state.otp_flows().current(&session).await? else {
        return Ok(flash::redirect(&session, Flash::error(EMAIL_MISSING), "/login").await?);
    };
    let mut flow = handle.lock().await;

    let submitted = submitted_code(&fields);
    if !submitted.is_empty() {
        flow.input_mut().paste(&submitted);
    }
    let Some(code) = flow.input().code() else {
        drop(flow);
        let message = OtpError::InvalidCode.to_string();
        return Ok(flash::redirect(&session, Flash::error(message), "/verify").await?);
    };

    let mut attempt = flow.clone();
    if let Err(e) = attempt.begin_verify() {
        drop(flow);
        let to = if matches!(e, OtpError::AlreadyVerified) { "/" } else { "/verify" };
        return Ok(flash::redirect(&session, Flash::info(e.to_string()), to).await?);
    }

    let result = state.api().verify_otp(attempt.email(), &code).await;
    match result {
        Ok(response) => {
            attempt.succeed();
            *flow = attempt;
            drop(flow);
            state.otp_flows().finish(&session).await?;

            let user = CurrentUser::from(response.user);
            set_login(&session, &response.token, &user).await?;
            tracing::info!(user_id = %user.id, "User logged in");
            add_breadcrumb("auth", "Logged in", Some(&[("user_id", user.id.as_str())]));

            let token = secrecy::SecretString::from(response.token);
            cart::settle(state.api(), &session, &token).await?;

            let message = response
                .message
                .unwrap_or_else(|| "Verified successfully".to_string());
            Ok(flash::redirect(&session, Flash::success(message), "/").await?)
        }
        Err(e) => {
            tracing::info!(error = %e, "OTP rejected");
            attempt.fail(e.user_message("Invalid OTP"));
            *flow = attempt;
            Ok(Redirect::to("/verify").into_response())
        }
    }
}

/// Apply one keystroke to the pending flow's slots and return the new state.
///
/// Keystrokes for the same flow are applied one at a time, in the order
/// they acquire the flow's lock.
#[instrument(skip_all)]
pub async fn otp_input(
    State(state): State<AppState>,
    session: Session,
    Json(keystroke): Json<OtpKeystroke>,
) -> Result<Json<OtpInputState>> {
    let Some(handle) = state.otp_flows().current(&session).await? else {
        return Err(AppError::NotFound("pending verification".to_string()));
    };
    let mut flow = handle.lock().await;
    if matches!(flow.phase(), OtpPhase::Verifying | OtpPhase::Verified) {
        return Err(AppError::BadRequest("verification already submitted".to_string()));
    }

    let input = flow.input_mut();
    let accepted = match keystroke {
        OtpKeystroke::Edit { index, value } => input.edit(index, &value),
        OtpKeystroke::Backspace { index } => {
            input.backspace(index);
            true
        }
        OtpKeystroke::Paste { text } => input.paste(&text),
    };

    Ok(Json(OtpInputState {
        accepted,
        slots: input.slots(),
        focus: input.focus(),
        complete: input.is_complete(),
    }))
}

/// Request a fresh code once the countdown has run out.
#[instrument(skip_all)]
pub async fn resend(State(state): State<AppState>, session: Session) -> Result<Response> {
    let Some(handle) = state.otp_flows().current(&session).await? else {
        return Ok(flash::redirect(&session, Flash::error(EMAIL_MISSING), "/login").await?);
    };

    // Countdown restarts whether or not the backend accepts the request
    let email = {
        let mut flow = handle.lock().await;
        if let Err(e) = flow.resend(Utc::now()) {
            drop(flow);
            return Ok(flash::redirect(&session, Flash::error(e.to_string()), "/verify").await?);
        }
        flow.email().clone()
    };

    let notice = match state.api().send_otp(&email).await {
        Ok(response) => Flash::success(response.or("OTP resent")),
        Err(e) => {
            tracing::warn!(error = %e, "OTP resend failed");
            Flash::error(e.user_message("Failed to resend OTP"))
        }
    };
    Ok(flash::redirect(&session, notice, "/verify").await?)
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<Response> {
    clear_login(&session).await?;
    tracing::info!("User logged out");
    Ok(flash::redirect(&session, Flash::success("Logged out"), "/").await?)
}

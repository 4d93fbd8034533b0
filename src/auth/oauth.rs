//! OAuth sign-in flow
//!
//! Authorization code flow against the configured [`IdentityProvider`]:
//!
//! ```text
//! anonymous ── GET /auth/{provider} ──▶ provider consent screen
//!     ▲                                          │
//!     │ failure redirect                         ▼
//!     └──── GET /auth/{provider}/callback ──▶ authenticated (session cookie)
//! ```
//!
//! Every callback outcome ends in a redirect; nothing surfaces to the
//! browser as an error page.
//!
//! [`IdentityProvider`]: super::provider::IdentityProvider

use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use serde::Deserialize;
use thiserror::Error;

use super::middleware::session_token_from_jar;
use super::provider::UserProfile;
use super::session::sign_session_token;
use crate::AppState;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::metrics::record_auth_event;

/// Cookie carrying the CSRF state between redirect and callback
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// How long the browser has to come back from the provider
const OAUTH_STATE_MAX_AGE_SECS: i64 = 600;

/// Create authentication router
///
/// Routes:
/// - GET /auth/{provider} - Redirect to the identity provider
/// - GET /auth/{provider}/callback - OAuth callback
/// - GET|POST /logout - Logout
pub fn auth_router(provider: &str) -> Router<AppState> {
    Router::new()
        .route(&format!("/auth/{provider}"), get(provider_redirect))
        .route(&format!("/auth/{provider}/callback"), get(provider_callback))
        .route("/logout", get(logout).post(logout))
}

// =============================================================================
// Provider redirect
// =============================================================================

/// GET /auth/{provider}
///
/// Redirects the browser to the provider's authorization page.
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in cookie
/// 3. Redirect to the provider with client_id, redirect_uri, scope, state
async fn provider_redirect(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let csrf_state = generate_csrf_state();
    let authorization_url = state.provider.authorization_url(&csrf_state)?;

    record_auth_event("redirect");
    tracing::info!(provider = state.provider.name(), "Redirecting to identity provider");

    let jar = jar.add(oauth_state_cookie(&state.config, csrf_state));
    Ok((jar, found(authorization_url.as_str())))
}

// =============================================================================
// Callback
// =============================================================================

/// Query parameters from the provider callback
#[derive(Debug, Default, Deserialize)]
struct CallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// CSRF state token
    state: Option<String>,
    /// Set instead of `code` when the user declines or the provider fails
    error: Option<String>,
    error_description: Option<String>,
}

/// Reasons a callback does not produce a session
#[derive(Debug, Error)]
enum CallbackFailure {
    #[error("provider returned error: {0}")]
    ProviderDenied(String),

    #[error("CSRF state missing or mismatched")]
    StateMismatch,

    #[error("callback carried no authorization code")]
    MissingCode,

    #[error("malformed callback query: {0}")]
    MalformedQuery(String),

    #[error("code exchange failed: {0}")]
    Exchange(AppError),

    #[error("session could not be created: {0}")]
    Session(AppError),
}

/// GET /auth/{provider}/callback
///
/// Handles the OAuth callback.
///
/// # Steps
/// 1. Reject provider errors and CSRF state mismatches
/// 2. Exchange code for a profile
/// 3. Replace any existing session with a new one
/// 4. Set the session cookie and redirect to the success location
///
/// Any failure redirects to the failure location instead.
async fn provider_callback(
    State(state): State<AppState>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
    jar: CookieJar,
) -> Response {
    let expected_state = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|cookie| cookie.value().to_owned());
    let jar = jar.remove(Cookie::build(OAUTH_STATE_COOKIE).path("/"));

    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            let failure = CallbackFailure::MalformedQuery(rejection.body_text());
            return login_failed(&state, jar, failure);
        }
    };

    let profile = match authenticate(&state, &query, expected_state.as_deref()).await {
        Ok(profile) => profile,
        Err(failure) => return login_failed(&state, jar, failure),
    };

    // One session per browser: a fresh login replaces whatever it held.
    if let Some(previous) = session_token_from_jar(&jar, &state) {
        if let Err(error) = state.sessions.destroy(&previous).await {
            tracing::warn!(%error, "Failed to destroy previous session");
        }
    }

    let session = match state.sessions.create(profile).await {
        Ok(session) => session,
        Err(error) => return login_failed(&state, jar, CallbackFailure::Session(error)),
    };

    let cookie_value = match sign_session_token(&session.id, &state.config.auth.session_secret) {
        Ok(value) => value,
        Err(error) => {
            if let Err(destroy_error) = state.sessions.destroy(&session.id).await {
                tracing::warn!(error = %destroy_error, "Failed to discard unsigned session");
            }
            return login_failed(&state, jar, CallbackFailure::Session(error));
        }
    };

    record_auth_event("login");
    tracing::info!(
        provider = state.provider.name(),
        session = session.log_id(),
        "Session created"
    );

    let jar = jar.add(session_cookie(&state.config, cookie_value));
    let target = state.config.redirect_target(&state.config.auth.redirects.success);
    (jar, found(&target)).into_response()
}

async fn authenticate(
    state: &AppState,
    query: &CallbackQuery,
    expected_state: Option<&str>,
) -> Result<UserProfile, CallbackFailure> {
    if let Some(error) = &query.error {
        let reason = match &query.error_description {
            Some(description) => format!("{error} ({description})"),
            None => error.clone(),
        };
        return Err(CallbackFailure::ProviderDenied(reason));
    }

    verify_csrf_state(query.state.as_deref(), expected_state)?;

    let code = query
        .code
        .as_deref()
        .filter(|code| !code.is_empty())
        .ok_or(CallbackFailure::MissingCode)?;

    state
        .provider
        .exchange_code(code)
        .await
        .map_err(CallbackFailure::Exchange)
}

fn login_failed(state: &AppState, jar: CookieJar, failure: CallbackFailure) -> Response {
    record_auth_event("login_failed");
    tracing::warn!(
        provider = state.provider.name(),
        reason = %failure,
        "Sign-in failed"
    );

    let target = state.config.redirect_target(&state.config.auth.redirects.failure);
    (jar, found(&target)).into_response()
}

// =============================================================================
// Logout
// =============================================================================

/// GET /logout
///
/// Destroys the session (if any), clears the session cookie and redirects
/// to the landing location. Never fails.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(token) = session_token_from_jar(&jar, &state) {
        match state.sessions.destroy(&token).await {
            Ok(()) => tracing::info!("Session destroyed"),
            Err(error) => tracing::error!(%error, "Failed to destroy session on logout"),
        }
    }

    record_auth_event("logout");

    let jar = jar.remove(removal_cookie(&state.config));
    let target = state.config.redirect_target(&state.config.auth.redirects.logout);
    (jar, found(&target))
}

// =============================================================================
// Helpers
// =============================================================================

/// `302 Found` to `target`
fn found(target: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, target)]).into_response()
}

/// Generate a random CSRF state token
fn generate_csrf_state() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Verify CSRF state from cookie matches callback state
fn verify_csrf_state(received: Option<&str>, expected: Option<&str>) -> Result<(), CallbackFailure> {
    match (received, expected) {
        (Some(received), Some(expected)) if !expected.is_empty() && received == expected => Ok(()),
        _ => Err(CallbackFailure::StateMismatch),
    }
}

fn session_cookie(config: &AppConfig, value: String) -> Cookie<'static> {
    Cookie::build((config.auth.cookie.name.clone(), value))
        .path("/")
        .http_only(true)
        .same_site(config.auth.cookie.same_site.into())
        .secure(config.should_use_secure_cookies())
        .max_age(time::Duration::seconds(config.auth.session_max_age))
        .build()
}

fn removal_cookie(config: &AppConfig) -> Cookie<'static> {
    Cookie::build((config.auth.cookie.name.clone(), String::new()))
        .path("/")
        .http_only(true)
        .same_site(config.auth.cookie.same_site.into())
        .secure(config.should_use_secure_cookies())
        .build()
}

fn oauth_state_cookie(config: &AppConfig, value: String) -> Cookie<'static> {
    // Lax so the cookie survives the top-level redirect back from the provider.
    Cookie::build((OAUTH_STATE_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.should_use_secure_cookies())
        .max_age(time::Duration::seconds(OAUTH_STATE_MAX_AGE_SECS))
        .build()
}

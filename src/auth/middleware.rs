//! Session extraction
//!
//! Resolves the session cookie on a request into a live [`Session`].
//! No route in the shop requires authentication, so there is only the
//! optional extractor.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;

use super::session::{Session, verify_session_token};
use crate::AppState;

/// Session token from the signed session cookie, if present and authentic
pub fn session_token_from_jar(jar: &CookieJar, state: &AppState) -> Option<String> {
    let cookie = jar.get(&state.config.auth.cookie.name)?;

    match verify_session_token(cookie.value(), &state.config.auth.session_secret) {
        Ok(token) => Some(token),
        Err(error) => {
            tracing::debug!(%error, "Ignoring session cookie that failed verification");
            None
        }
    }
}

/// Look up the live session referenced by the request cookies
pub async fn current_session(jar: &CookieJar, state: &AppState) -> Option<Session> {
    let token = session_token_from_jar(jar, state)?;

    match state.sessions.get(&token).await {
        Ok(session) => session,
        Err(error) => {
            tracing::error!(%error, "Session lookup failed; treating request as anonymous");
            None
        }
    }
}

/// Optional current user extractor
///
/// Returns None if not authenticated, instead of error.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Session>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(MaybeUser(Some(session)));
        }

        let app_state = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let session = current_session(&jar, &app_state).await;

        if let Some(session) = &session {
            parts.extensions.insert(session.clone());
        }

        Ok(MaybeUser(session))
    }
}

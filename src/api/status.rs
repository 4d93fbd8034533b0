//! Session status endpoint
//!
//! - GET /api/auth/status

use axum::Json;

use super::dto::AuthStatusResponse;
use crate::auth::MaybeUser;

/// GET /api/auth/status
///
/// Reports whether the request carries a live session. Read-only: the
/// lookup never creates, renews or destroys anything.
pub async fn auth_status(MaybeUser(session): MaybeUser) -> Json<AuthStatusResponse> {
    Json(match session {
        Some(session) => AuthStatusResponse::authenticated(session.profile),
        None => AuthStatusResponse::anonymous(),
    })
}

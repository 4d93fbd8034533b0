//! API response DTOs

use serde::Serialize;

use crate::auth::UserProfile;

/// Body of `GET /api/auth/status`
///
/// `user` is present exactly when `logged_in` is true.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatusResponse {
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

impl AuthStatusResponse {
    pub fn anonymous() -> Self {
        Self {
            logged_in: false,
            user: None,
        }
    }

    pub fn authenticated(user: UserProfile) -> Self {
        Self {
            logged_in: true,
            user: Some(user),
        }
    }
}

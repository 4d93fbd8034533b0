//! Authentication
//!
//! Handles:
//! - OAuth sign-in against an identity provider (Google)
//! - Server-side sessions referenced by a signed cookie
//! - Session extraction for handlers

mod google;
mod middleware;
mod oauth;
pub mod provider;
pub mod session;

pub use google::GoogleProvider;
pub use middleware::{MaybeUser, current_session};
pub use oauth::{OAUTH_STATE_COOKIE, auth_router};
pub use provider::{IdentityProvider, UserProfile};
pub use session::{
    InMemorySessionStore, Session, SessionStore, sign_session_token, verify_session_token,
};

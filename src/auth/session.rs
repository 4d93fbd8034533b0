//! Session management
//!
//! Sessions live server-side in a [`SessionStore`]. The browser only holds
//! the session token, HMAC-signed with the session secret:
//!
//! ```text
//! cookie value = {token}.{base64(hmac_sha256(token))}
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::async_trait;
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::sync::RwLock;

use super::provider::UserProfile;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Random bytes behind each session token
const SESSION_TOKEN_BYTES: usize = 32;

/// Authenticated browser session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session token
    pub id: String,
    /// Profile as returned by the identity provider
    pub profile: UserProfile,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Short token prefix that is safe to log
    pub fn log_id(&self) -> &str {
        let end = self.id.len().min(8);
        &self.id[..end]
    }
}

/// Server-side session storage
///
/// Injected into the router so a persistent backend can replace the
/// in-memory one without touching route logic.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up a live session; expired or unknown tokens yield `None`
    async fn get(&self, token: &str) -> Result<Option<Session>, AppError>;

    /// Allocate a fresh token for `profile` with a fixed expiry
    async fn create(&self, profile: UserProfile) -> Result<Session, AppError>;

    /// Remove a session; unknown tokens are ignored
    async fn destroy(&self, token: &str) -> Result<(), AppError>;
}

/// Process-local session store
///
/// Sessions expire a fixed TTL after creation and are not renewed on
/// access. A restart drops every session.
pub struct InMemorySessionStore {
    /// Session storage: token -> session
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    /// Lifetime of each session
    ttl: Duration,
}

impl InMemorySessionStore {
    /// Create a store whose sessions live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Number of records currently held, expired ones included
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn prune_expired_locked(sessions: &mut HashMap<String, Session>) -> usize {
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        before - sessions.len()
    }

    fn record_size(sessions: &HashMap<String, Session>) {
        crate::metrics::SESSIONS_ACTIVE.set(sessions.len() as i64);
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, token: &str) -> Result<Option<Session>, AppError> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                None => return Ok(None),
                Some(session) if !session.is_expired() => return Ok(Some(session.clone())),
                Some(_) => {}
            }
        }

        let mut sessions = self.sessions.write().await;
        if sessions
            .get(token)
            .is_some_and(|session| session.is_expired())
        {
            sessions.remove(token);
            Self::record_size(&sessions);
            tracing::debug!("Dropped expired session on lookup");
        }

        Ok(None)
    }

    async fn create(&self, profile: UserProfile) -> Result<Session, AppError> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("session lifetime overflows the calendar"))
        })?;
        let session = Session {
            id: generate_session_token(),
            profile,
            created_at: now,
            expires_at,
        };

        let mut sessions = self.sessions.write().await;
        let pruned = Self::prune_expired_locked(&mut sessions);
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned expired sessions");
        }
        sessions.insert(session.id.clone(), session.clone());
        Self::record_size(&sessions);

        Ok(session)
    }

    async fn destroy(&self, token: &str) -> Result<(), AppError> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(token);
        Self::record_size(&sessions);
        Ok(())
    }
}

/// Generate a random, URL-safe session token
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Sign a session token for use as a cookie value
///
/// # Returns
/// `"{token}.{signature}"`
pub fn sign_session_token(token: &str, secret: &str) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(token.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", token, signature_b64))
}

/// Verify a signed cookie value and return the bare session token
///
/// # Errors
/// `Unauthorized` if the value is malformed, `InvalidSignature` if the
/// signature does not match.
pub fn verify_session_token(signed: &str, secret: &str) -> Result<String, AppError> {
    let (token, signature_b64) = signed.rsplit_once('.').ok_or(AppError::Unauthorized)?;
    if token.is_empty() {
        return Err(AppError::Unauthorized);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(token.as_bytes());

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;

    mac.verify_slice(&signature)
        .map_err(|_| AppError::InvalidSignature)?;

    Ok(token.to_string())
}

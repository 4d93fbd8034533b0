//! Identity provider capability
//!
//! The OAuth flow only needs two things from a provider: where to send the
//! browser, and how to turn an authorization code into a profile.
//! Google is the production implementation; tests plug in fakes.

use axum::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::error::AppError;

/// Scopes requested from the provider: identity plus contact address
pub const REQUESTED_SCOPES: &[&str] = &["profile", "email"];

/// Profile returned by the identity provider
///
/// Kept verbatim as the provider sent it (plus a `provider` key) and never
/// normalized into an internal user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(Map<String, Value>);

impl UserProfile {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wrap a provider response, which must be a JSON object
    pub fn from_value(value: Value) -> Result<Self, AppError> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(AppError::Provider(format!(
                "expected a profile object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// External service that authenticates users via the authorization code flow
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Route slug, e.g. "google" for `/auth/google`
    fn name(&self) -> &'static str;

    /// Authorization endpoint URL the browser is redirected to
    ///
    /// `state` is echoed back by the provider on the callback.
    fn authorization_url(&self, state: &str) -> Result<Url, AppError>;

    /// Exchange an authorization code for the user's profile
    ///
    /// Used or stale codes are rejected by the provider, not here.
    async fn exchange_code(&self, code: &str) -> Result<UserProfile, AppError>;
}

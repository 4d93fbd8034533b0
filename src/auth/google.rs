//! Google OAuth 2.0 provider
//!
//! Authorization code flow against Google's endpoints:
//!
//! 1. [`authorization_url`](GoogleProvider::authorization_url) sends the
//!    browser to the consent screen with `profile email` scopes.
//! 2. [`exchange_code`](GoogleProvider::exchange_code) trades the code for an
//!    access token and reads the userinfo endpoint with it.
//!
//! Endpoint URLs come from configuration so tests can point them elsewhere.

use axum::async_trait;
use serde::Deserialize;
use url::Url;

use super::provider::{IdentityProvider, REQUESTED_SCOPES, UserProfile};
use crate::config::GoogleOAuthConfig;
use crate::error::AppError;

/// Google token endpoint response
#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

/// Google token endpoint error body
#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Google identity provider
pub struct GoogleProvider {
    config: GoogleOAuthConfig,
    http_client: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(config: GoogleOAuthConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    async fn fetch_access_token(&self, code: &str) -> Result<String, AppError> {
        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<GoogleErrorResponse>(&body) {
                Ok(error) => match error.error_description {
                    Some(description) => format!("{}: {}", error.error, description),
                    None => error.error,
                },
                Err(_) => body,
            };
            return Err(AppError::Provider(format!(
                "token exchange failed with {status}: {reason}"
            )));
        }

        let token: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("malformed token response: {e}")))?;

        Ok(token.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, AppError> {
        let response = self
            .http_client
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Provider(format!(
                "userinfo request failed with {status}"
            )));
        }

        let userinfo: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("malformed userinfo response: {e}")))?;

        let mut profile = UserProfile::from_value(userinfo)?;
        profile.insert("provider", self.name());
        Ok(profile)
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn authorization_url(&self, state: &str) -> Result<Url, AppError> {
        let scope = REQUESTED_SCOPES.join(" ");
        Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("scope", scope.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| AppError::Config(format!("auth.google.auth_url is invalid: {e}")))
    }

    async fn exchange_code(&self, code: &str) -> Result<UserProfile, AppError> {
        let access_token = self.fetch_access_token(code).await?;
        self.fetch_profile(&access_token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(base: &str) -> GoogleOAuthConfig {
        GoogleOAuthConfig {
            client_id: "google-client-id".to_string(),
            client_secret: "google-client-secret".to_string(),
            callback_url: "http://localhost:5000/auth/google/callback".to_string(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: format!("{base}/token"),
            userinfo_url: format!("{base}/userinfo"),
        }
    }

    #[test]
    fn authorization_url_carries_client_scope_and_state() {
        let provider = GoogleProvider::new(config_for("http://unused"), reqwest::Client::new());
        let url = provider.authorization_url("csrf-123").unwrap();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let param = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(param("client_id").as_deref(), Some("google-client-id"));
        assert_eq!(param("response_type").as_deref(), Some("code"));
        assert_eq!(param("scope").as_deref(), Some("profile email"));
        assert_eq!(param("state").as_deref(), Some("csrf-123"));
        assert_eq!(
            param("redirect_uri").as_deref(),
            Some("http://localhost:5000/auth/google/callback")
        );
    }

    #[tokio::test]
    async fn exchange_code_returns_userinfo_with_provider_tag() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code=auth-code"))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access-123",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer access-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sub": "1098",
                "name": "Test User",
                "email": "t@example.com"
            })))
            .mount(&server)
            .await;

        let provider = GoogleProvider::new(config_for(&server.uri()), reqwest::Client::new());
        let profile = provider.exchange_code("auth-code").await.unwrap();

        assert_eq!(profile.name(), Some("Test User"));
        assert_eq!(profile.email(), Some("t@example.com"));
        assert_eq!(profile.get("sub"), Some(&json!("1098")));
        assert_eq!(profile.get("provider"), Some(&json!("google")));
    }

    #[tokio::test]
    async fn exchange_code_surfaces_provider_rejection() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Bad Request"
            })))
            .mount(&server)
            .await;

        let provider = GoogleProvider::new(config_for(&server.uri()), reqwest::Client::new());
        let error = provider
            .exchange_code("used-code")
            .await
            .expect_err("rejected code must fail");

        assert!(matches!(error, AppError::Provider(message) if message.contains("invalid_grant")));
    }

    #[tokio::test]
    async fn exchange_code_fails_when_userinfo_is_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"access_token": "access-123"})),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = GoogleProvider::new(config_for(&server.uri()), reqwest::Client::new());
        assert!(provider.exchange_code("auth-code").await.is_err());
    }
}

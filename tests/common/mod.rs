//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use shopfront::auth::{IdentityProvider, InMemorySessionStore, UserProfile};
use shopfront::error::AppError;
use shopfront::{AppState, config, data::Catalog};
use tempfile::TempDir;
use tokio::net::TcpListener;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SESSION_COOKIE: &str = "shopfront.sid";
pub const FRONTEND_URL: &str = "http://localhost:5000";
pub const SUCCESS_LOCATION: &str = "http://localhost:5000/shop.html";
pub const FAILURE_LOCATION: &str = "http://localhost:5000/shop.html?login=failed";
pub const LOGOUT_LOCATION: &str = "http://localhost:5000/";

/// Test server instance
///
/// Runs the real router on an ephemeral port. Google's token and userinfo
/// endpoints point at `idp`, a local mock server.
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub idp: MockServer,
    pub client: reqwest::Client,
    pub _frontend_dir: TempDir,
}

impl TestServer {
    /// Create a test server backed by the Google provider
    pub async fn new() -> Self {
        let idp = MockServer::start().await;
        let frontend_dir = frontend_fixture();
        let config = test_config(&idp.uri(), &frontend_dir);

        let state = AppState::new(config).expect("app state initializes");
        Self::start(state, idp, frontend_dir).await
    }

    /// Create a test server backed by an arbitrary identity provider
    pub async fn with_provider(provider: Arc<dyn IdentityProvider>) -> Self {
        let idp = MockServer::start().await;
        let frontend_dir = frontend_fixture();
        let config = test_config(&idp.uri(), &frontend_dir);

        let sessions = Arc::new(InMemorySessionStore::new(chrono::Duration::seconds(
            config.auth.session_max_age,
        )));
        let state = AppState::from_parts(config, provider, sessions, Catalog::builtin());
        Self::start(state, idp, frontend_dir).await
    }

    async fn start(state: AppState, idp: MockServer, frontend_dir: TempDir) -> Self {
        shopfront::metrics::init_metrics();

        // Redirects are asserted on, never followed.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = shopfront::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            idp,
            client,
            _frontend_dir: frontend_dir,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Make the mock identity provider accept any code and return `profile`
    pub async fn idp_accepts(&self, profile: Value) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "test-access-token",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .mount(&self.idp)
            .await;

        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile))
            .mount(&self.idp)
            .await;
    }

    /// Make the mock identity provider reject every code
    pub async fn idp_rejects(&self) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Bad Request"
            })))
            .mount(&self.idp)
            .await;
    }

    /// Start the sign-in flow and return `(state param, oauth_state cookie)`
    pub async fn begin_login(&self) -> (String, String) {
        let response = self
            .client
            .get(self.url("/auth/google"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);

        let redirect = Url::parse(location(&response)).unwrap();
        let state = redirect
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.to_string())
            .expect("state parameter");
        let cookie = cookie_pair(&response, shopfront::auth::OAUTH_STATE_COOKIE)
            .expect("oauth_state cookie");

        (state, cookie)
    }

    /// Run the callback with `code`, optionally carrying an existing session
    pub async fn callback(&self, code: &str, session_cookie: Option<&str>) -> reqwest::Response {
        let (state, state_cookie) = self.begin_login().await;
        let cookie_header = match session_cookie {
            Some(session) => format!("{state_cookie}; {session}"),
            None => state_cookie,
        };

        self.client
            .get(self.url("/auth/google/callback"))
            .query(&[("code", code), ("state", state.as_str())])
            .header("Cookie", cookie_header)
            .send()
            .await
            .unwrap()
    }

    /// Complete a sign-in and return the `name=value` session cookie pair
    pub async fn login(&self) -> String {
        let response = self.callback("valid-code", None).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), SUCCESS_LOCATION);

        cookie_pair(&response, SESSION_COOKIE).expect("session cookie")
    }

    /// Fetch `/api/auth/status`, optionally with a cookie header
    pub async fn status(&self, cookie: Option<&str>) -> Value {
        let mut request = self.client.get(self.url("/api/auth/status"));
        if let Some(cookie) = cookie {
            request = request.header("Cookie", cookie);
        }

        let response = request.send().await.unwrap();
        assert_eq!(response.status(), 200);
        response.json().await.unwrap()
    }
}

/// Identity provider that accepts one code and returns a fixed profile
pub struct FakeProvider {
    pub valid_code: String,
    pub profile: Value,
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn authorization_url(&self, state: &str) -> Result<Url, AppError> {
        Url::parse_with_params(
            "https://idp.test/authorize",
            &[
                ("client_id", "fake-client"),
                ("scope", "profile email"),
                ("state", state),
            ],
        )
        .map_err(|e| AppError::Config(e.to_string()))
    }

    async fn exchange_code(&self, code: &str) -> Result<UserProfile, AppError> {
        if code == self.valid_code {
            UserProfile::from_value(self.profile.clone())
        } else {
            Err(AppError::Provider("invalid_grant".to_string()))
        }
    }
}

/// `Location` header of a redirect response
pub fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
}

/// All `Set-Cookie` header values
pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok().map(ToString::to_string))
        .collect()
}

/// `name=value` pair of the named cookie set by the response
pub fn cookie_pair(response: &reqwest::Response, name: &str) -> Option<String> {
    set_cookies(response).into_iter().find_map(|raw| {
        let pair = raw.split(';').next()?.trim().to_string();
        let (cookie_name, value) = pair.split_once('=')?;
        (cookie_name == name && !value.is_empty()).then_some(pair)
    })
}

fn frontend_fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("shop.html"), "<h1>Shop</h1>").unwrap();
    std::fs::create_dir(dir.path().join("images")).unwrap();
    std::fs::write(dir.path().join("images").join("speaker.png"), b"png-bytes").unwrap();
    dir
}

fn test_config(idp_base: &str, frontend_dir: &TempDir) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            frontend_url: FRONTEND_URL.to_string(),
            frontend_dir: frontend_dir.path().to_path_buf(),
        },
        auth: config::AuthConfig {
            session_secret: "test-secret-key-that-is-32-bytes".to_string(),
            session_max_age: 86_400,
            require_credentials: true,
            cookie: config::CookieConfig {
                name: SESSION_COOKIE.to_string(),
                same_site: config::SameSitePolicy::Lax,
                secure: None,
            },
            redirects: config::RedirectConfig {
                success: "/shop.html".to_string(),
                failure: "/shop.html?login=failed".to_string(),
                logout: "/".to_string(),
            },
            google: config::GoogleOAuthConfig {
                client_id: "test-client-id".to_string(),
                client_secret: "test-client-secret".to_string(),
                callback_url: format!("{FRONTEND_URL}/auth/google/callback"),
                auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                token_url: format!("{idp_base}/token"),
                userinfo_url: format!("{idp_base}/userinfo"),
            },
        },
        catalog: config::CatalogConfig::default(),
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: config::LogFormat::Pretty,
        },
        metrics: config::MetricsConfig { enabled: true },
    }
}

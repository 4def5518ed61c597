use super::{ApiError, ApiResponse};
use crate::config::ApiConfig;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client for the Patron backend.
///
/// Every request carries the cookie jar, and the session cookie (if any) is
/// mirrored into an `Authorization: Bearer` header. No retries.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base_url: Url,
    session_cookie: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let jar = Arc::new(Jar::default());
        let mut builder = reqwest::Client::builder().cookie_provider(jar.clone());
        if config.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.request_timeout_secs));
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let client = Self {
            http,
            jar,
            base_url,
            session_cookie: config.session_cookie.clone(),
        };
        if let Some(token) = config.session_token.as_deref().filter(|t| !t.is_empty()) {
            client.set_session_token(token);
        }
        Ok(client)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Store `token` as the session cookie for the backend origin
    pub fn set_session_token(&self, token: &str) {
        let cookie = format!("{}={}; Path=/", self.session_cookie, token);
        self.jar.add_cookie_str(&cookie, &self.base_url);
    }

    /// Current session token from the cookie jar
    pub fn session_token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        let cookies = header.to_str().ok()?;
        cookies
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.session_cookie)
            .map(|(_, value)| value.to_string())
            .filter(|value| !value.is_empty())
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", joined, e)))
    }

    /// Perform one request and decode the body as `T`
    pub async fn send<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let mut request = self.http.request(method.clone(), url);
        if let Some(token) = self.session_token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(%method, path, "API request");
        let response = request.send().await.map_err(|e| {
            warn!(%method, path, error = %e, "API request failed");
            ApiError::Transport(e.to_string())
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            warn!(%method, path, status = status.as_u16(), "API returned error status");
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: error_message(status, &text),
            });
        }

        debug!(%method, path, status = status.as_u16(), bytes = text.len(), "API response");
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// `send` wrapped in the response envelope
    pub async fn call<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(method, path, body).await.into()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResponse<T> {
        self.call::<T, ()>(Method::GET, path, None).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(Method::POST, path, Some(body)).await
    }
}

/// Error text for a non-2xx response.
///
/// A JSON body with an `error`, `message` or `detail` string yields that
/// string; any other non-empty body is returned as is.
fn error_message(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return format!("HTTP {}", status.as_u16());
    }
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["error", "message", "detail"] {
            if let Some(text) = map.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty()) {
                return text.to_string();
            }
        }
    }
    trimmed.to_string()
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("session_cookie", &self.session_cookie)
            .field("authenticated", &self.session_token().is_some())
            .finish()
    }
}

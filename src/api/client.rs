//! Authenticated HTTP client for the marketplace API
//!
//! Wraps reqwest::Client with bearer token injection and response envelope
//! checking.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::auth::SessionStore;
use crate::config::Config;
use crate::models::User;

/// Generic `{status, message}` response envelope used by mutation endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub status: Option<String>,
    pub message: Option<String>,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

/// `{data: T}` wrapper used by read endpoints.
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// One page of a paginated listing, as nested under the outer `data` key:
/// `{data: {data: [...], current_page, last_page, total}}`.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: Option<u32>,
    pub last_page: Option<u32>,
    pub total: Option<u64>,
}

/// API-level error, carrying the server's envelope message when one exists.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("401 Unauthorized for {url}. Run 'tindahan-cli login'.")]
    Unauthorized { url: String },

    #[error("{message}")]
    Server { status: u16, message: String },
}

/// Authenticated client for the marketplace REST API.
pub struct ApiClient {
    http: reqwest::Client,
    config: Config,
}

impl ApiClient {
    /// Load config and build a client. Fails when no valid session exists.
    pub fn new() -> Result<Self> {
        let config = Config::load()?;

        let token = config
            .get_auth_token()
            .context("Not logged in. Run 'tindahan-cli login' first.")?;
        if token.is_expired() {
            bail!("Session token expired. Run 'tindahan-cli login'.");
        }

        Ok(Self {
            http: reqwest::Client::new(),
            config,
        })
    }

    /// Build a client from an explicit config, skipping session checks.
    #[cfg(test)]
    pub(crate) fn from_config(config: Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// The logged-in user cached at login time (session resolver input).
    pub fn session_user(&self) -> Option<User> {
        self.config.get_user()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn token(&self) -> Result<String> {
        let token = self
            .config
            .get_auth_token()
            .context("Not logged in. Run 'tindahan-cli login' first.")?;
        Ok(token.token)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    /// GET request with query parameters.
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        let token = self.token()?;
        let url = self.url(path);
        tracing::debug!("GET {} {:?}", url, query);

        let resp = self
            .http
            .get(&url)
            .query(query)
            .bearer_auth(&token)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        check_response(resp, &url).await
    }

    /// POST request with a JSON body.
    pub async fn post(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        let token = self.token()?;
        let url = self.url(path);
        tracing::debug!("POST {}", url);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        check_response(resp, &url).await
    }

    /// PUT request with a JSON body.
    pub async fn put(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        let token = self.token()?;
        let url = self.url(path);
        tracing::debug!("PUT {}", url);

        let resp = self
            .http
            .put(&url)
            .bearer_auth(&token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("PUT {} failed", url))?;

        check_response(resp, &url).await
    }

    /// DELETE request with an optional JSON body (password confirmation).
    pub async fn delete(
        &self,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let token = self.token()?;
        let url = self.url(path);
        tracing::debug!("DELETE {}", url);

        let mut req = self.http.delete(&url).bearer_auth(&token);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("DELETE {} failed", url))?;

        check_response(resp, &url).await
    }

    /// POST a multipart form (item/user forms with file attachments).
    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<reqwest::Response> {
        let token = self.token()?;
        let url = self.url(path);
        tracing::debug!("POST (multipart) {}", url);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        check_response(resp, &url).await
    }

    /// PUT a multipart form (user updates keep their PUT route even with
    /// an image attached).
    pub async fn put_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<reqwest::Response> {
        let token = self.token()?;
        let url = self.url(path);
        tracing::debug!("PUT (multipart) {}", url);

        let resp = self
            .http
            .put(&url)
            .bearer_auth(&token)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("PUT {} failed", url))?;

        check_response(resp, &url).await
    }
}

/// Check HTTP response status and turn failures into `ApiError`, preferring
/// the envelope's message field over the bare status line.
async fn check_response(resp: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized {
            url: url.to_string(),
        }
        .into());
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Server {
            status: status.as_u16(),
            message: error_message(status, &body),
        }
        .into());
    }
    Ok(resp)
}

/// Derive a user-facing error string from a failed response: the envelope
/// `message` when non-empty, otherwise `"<status> : <reason>"`.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    let envelope_message = serde_json::from_str::<Envelope>(body)
        .ok()
        .and_then(|e| e.message)
        .filter(|m| !m.is_empty());

    envelope_message.unwrap_or_else(|| {
        format!(
            "{} : {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_envelope() {
        let status = reqwest::StatusCode::UNPROCESSABLE_ENTITY;
        assert_eq!(
            error_message(status, r#"{"status":"error","message":"Content is required"}"#),
            "Content is required"
        );
    }

    #[test]
    fn error_message_falls_back_to_status_line() {
        let status = reqwest::StatusCode::INTERNAL_SERVER_ERROR;
        assert_eq!(
            error_message(status, "<html>oops</html>"),
            "500 : Internal Server Error"
        );
        assert_eq!(
            error_message(status, r#"{"message":""}"#),
            "500 : Internal Server Error"
        );
    }

    #[test]
    fn paginated_listing_deserializes() {
        let body = r#"{"data":{"data":[{"id":1,"first_name":"A","last_name":"B"}],"current_page":1,"last_page":3,"total":25}}"#;
        let page: DataEnvelope<Page<User>> = serde_json::from_str(body).unwrap();
        assert_eq!(page.data.data.len(), 1);
        assert_eq!(page.data.last_page, Some(3));
        assert_eq!(page.data.total, Some(25));
    }

    #[test]
    fn envelope_success_flag() {
        let env: Envelope =
            serde_json::from_str(r#"{"status":"success","message":"Saved"}"#).unwrap();
        assert!(env.is_success());
        let env: Envelope = serde_json::from_str(r#"{"status":"error","message":"No"}"#).unwrap();
        assert!(!env.is_success());
    }
}

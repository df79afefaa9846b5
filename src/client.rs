use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ReflectError, Result};
use crate::session::Session;

/// OAuth2 scopes requested from Reflect.
pub const SCOPES: &str = "read:graph write:graph";

/// Authenticated access to the Reflect API.
///
/// The dispatcher talks to this seam only, so tests can swap in a recording
/// transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue `method base_url+path` with `bearer` attached and return the
    /// parsed JSON body. Non-2xx statuses become `ReflectError::Api`.
    async fn send(
        &self,
        bearer: &str,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value>;

    /// Run the authorization-code grant against the token endpoint and
    /// return the raw token JSON.
    async fn exchange_code(&self, session: &Session, code: &str) -> Result<Value>;
}

/// Build the URL the user visits to authorize this client. No network call.
pub fn authorization_url(session: &Session) -> String {
    let base = session.authorize_url();
    let separator = if base.contains('?') { '&' } else { '?' };
    format!(
        "{}{}response_type=code&client_id={}&redirect_uri={}&scope={}",
        base,
        separator,
        urlencoding::encode(session.client_id()),
        urlencoding::encode(session.redirect_uri()),
        urlencoding::encode(SCOPES),
    )
}

/// HTTP client for one call sequence against the Reflect API.
///
/// Opened per sequence and dropped when it ends, which closes the pooled
/// connections on every exit path.
pub struct ReflectClient {
    base_url: String,
    http: reqwest::Client,
}

impl ReflectClient {
    pub fn open(session: &Session) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("reflect-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: session.api_base_url().to_string(),
            http,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Render a token endpoint rejection, preferring the RFC 6749 error fields.
fn describe_oauth_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<OAuthErrorBody>(body) {
        Ok(OAuthErrorBody {
            error,
            error_description: Some(description),
        }) => format!("{} ({}): {}", error, status, description),
        Ok(OAuthErrorBody { error, .. }) => format!("{} ({})", error, status),
        Err(_) => format!("token endpoint returned {}: {}", status, body),
    }
}

fn parse_body(record: &'static str, text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| ReflectError::Validation {
        record,
        reason: e.to_string(),
    })
}

#[async_trait]
impl Transport for ReflectClient {
    async fn send(
        &self,
        bearer: &str,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        if bearer.is_empty() {
            return Err(ReflectError::AuthRequired);
        }

        log::debug!("Reflect API: {} {}", method, path);

        let mut request = self
            .http
            .request(method.clone(), format!("{}{}", self.base_url, path))
            .bearer_auth(bearer);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            log::warn!("Reflect API: {} {} failed with {}", method, path, status);
            return Err(ReflectError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_body("response", &text)
    }

    async fn exchange_code(&self, session: &Session, code: &str) -> Result<Value> {
        log::info!("Exchanging authorization code at {}", session.token_url());

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", session.redirect_uri()),
        ];

        let response = self
            .http
            .post(session.token_url())
            .basic_auth(session.client_id(), Some(session.client_secret()))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ReflectError::Auth(describe_oauth_error(status, &text)));
        }

        parse_body("token", &text)
    }
}

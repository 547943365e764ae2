//! Raw request plumbing shared by the Vault client and the KV store

use crate::error::{BackendError, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tenantforge_core::{SecureString, VaultConfig};
use tracing::{debug, warn};

/// Header Vault reads the client token from
pub const TOKEN_HEADER: &str = "X-Vault-Token";

#[derive(Debug, Deserialize)]
struct ErrorDocument {
    #[serde(default)]
    errors: Vec<String>,
}

/// Authenticated HTTP handle on the Vault API
#[derive(Debug, Clone)]
pub(crate) struct VaultHttp {
    client: reqwest::Client,
    address: String,
    token: SecureString,
}

impl VaultHttp {
    pub(crate) fn new(config: &VaultConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            address: config.address.clone(),
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.address, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(TOKEN_HEADER, self.token.as_str())
    }

    pub(crate) async fn get(&self, path: &str) -> Result<Response> {
        self.send(Method::GET, path, self.request(Method::GET, path))
            .await
    }

    pub(crate) async fn post(&self, path: &str, body: &Value) -> Result<Response> {
        self.send(Method::POST, path, self.request(Method::POST, path).json(body))
            .await
    }

    pub(crate) async fn put(&self, path: &str, body: &Value) -> Result<Response> {
        self.send(Method::PUT, path, self.request(Method::PUT, path).json(body))
            .await
    }

    async fn send(&self, method: Method, path: &str, request: RequestBuilder) -> Result<Response> {
        debug!("Vault {} {}", method, path);
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);
        warn!("Vault {} {} rejected (HTTP {}): {}", method, path, status.as_u16(), message);
        Err(BackendError::rejected(status.as_u16(), message))
    }
}

/// Decode a JSON body, mapping decode failures to `MalformedResponse`
pub(crate) async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| BackendError::MalformedResponse(e.to_string()))
}

/// Vault reports failures as `{"errors": [...]}`; fall back to the raw body
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(doc) = serde_json::from_str::<ErrorDocument>(body) {
        if !doc.errors.is_empty() {
            return doc.errors.join("; ");
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && !trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    status
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_string()
}

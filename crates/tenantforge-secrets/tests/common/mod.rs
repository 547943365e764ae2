//! Common test helpers for tenantforge-secrets integration tests
//!
//! Stands up a wiremock server playing Vault and builds clients pointed at it.

#![allow(dead_code)]

use serde_json::{json, Value};
use tenantforge_core::VaultConfig;
use tenantforge_secrets::VaultClient;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_TOKEN: &str = "test-token";

pub fn client_for(server: &MockServer) -> VaultClient {
    let config = VaultConfig::new(&server.uri(), TEST_TOKEN).unwrap();
    VaultClient::new(&config).unwrap()
}

/// Body Vault returns from `GET {namespace}/creds/{role}`
pub fn lease_body(access_key: &str, secret_key: &str) -> Value {
    json!({
        "request_id": "9f1c7a52-0000-0000-0000-000000000000",
        "lease_id": "acme_aws/creds/backend-role/Kxq2",
        "renewable": true,
        "lease_duration": 2764800,
        "data": {
            "access_key": access_key,
            "secret_key": secret_key,
            "security_token": null
        },
        "wrap_info": null,
        "warnings": null,
        "auth": null
    })
}

pub fn vault_errors(messages: &[&str]) -> Value {
    json!({ "errors": messages })
}

/// Accept any write under `path_str` with 204
pub async fn mock_write(server: &MockServer, path_str: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(path_str.to_string()))
        .and(header("X-Vault-Token", TEST_TOKEN))
        .respond_with(ResponseTemplate::new(204))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Paths of every request the server saw, in arrival order
pub async fn request_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect()
}

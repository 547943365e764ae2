//! Credential lease issuance

use crate::backend::SecretsBackend;
use crate::error::{BackendError, Result};
use crate::types::{Lease, RawLease};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tenantforge_core::{SecureString, TenantNamespace};
use tracing::info;

/// Issues a fresh lease on every call. Leases are never cached: each
/// consumer gets keys nobody else has seen.
#[derive(Clone)]
pub struct LeaseManager {
    backend: Arc<dyn SecretsBackend>,
}

impl LeaseManager {
    pub fn new(backend: Arc<dyn SecretsBackend>) -> Self {
        Self { backend }
    }

    pub async fn issue(&self, namespace: &TenantNamespace, role: &str) -> Result<Lease> {
        let raw = self.backend.read_lease(namespace, role).await?;
        let lease = decode_lease(raw, Utc::now())?;
        info!(
            namespace = %namespace,
            lease_id = %lease.lease_id,
            ttl_secs = lease.ttl.as_secs(),
            "Issued credential lease"
        );
        Ok(lease)
    }
}

/// Turn Vault's generic key/value payload into a typed lease
pub fn decode_lease(raw: RawLease, issued_at: DateTime<Utc>) -> Result<Lease> {
    let data = raw.data.unwrap_or_default();

    Ok(Lease {
        access_key: required(&data, "access_key")?,
        secret_key: required(&data, "secret_key")?,
        security_token: data
            .get("security_token")
            .and_then(Value::as_str)
            .map(SecureString::from),
        lease_id: raw.lease_id,
        issued_at,
        ttl: Duration::from_secs(raw.lease_duration),
        renewable: raw.renewable,
    })
}

fn required(data: &Map<String, Value>, field: &'static str) -> Result<SecureString> {
    data.get(field)
        .and_then(Value::as_str)
        .map(SecureString::from)
        .ok_or(BackendError::MalformedLease { field })
}

//! Secrets backend trait and the Vault implementation
//!
//! Each call is exactly one HTTP round trip. Nothing is retried here;
//! failures go straight back to the caller, which decides whether e.g. an
//! existing mount is acceptable.

use crate::error::{BackendError, Result};
use crate::http::{decode, VaultHttp};
use crate::kv::KvStore;
use crate::types::{AccessPolicy, EngineType, RawLease, RootCredential};
use async_trait::async_trait;
use serde_json::json;
use tenantforge_core::{TenantNamespace, VaultConfig};
use tracing::debug;

/// Operations the provisioning and apply workflows need from the backend
#[async_trait]
pub trait SecretsBackend: Send + Sync {
    /// Enable a secrets engine at the tenant namespace
    async fn mount(&self, namespace: &TenantNamespace, engine: EngineType) -> Result<()>;

    /// Store the tenant's root cloud credential in the engine
    async fn write_config(&self, namespace: &TenantNamespace, root: &RootCredential)
        -> Result<()>;

    /// Create or overwrite the role and its access policy
    async fn write_policy(
        &self,
        namespace: &TenantNamespace,
        role: &str,
        policy: &AccessPolicy,
    ) -> Result<()>;

    /// Ask the engine for a fresh derived credential
    async fn read_lease(&self, namespace: &TenantNamespace, role: &str) -> Result<RawLease>;
}

/// Vault HTTP API client
#[derive(Debug, Clone)]
pub struct VaultClient {
    http: VaultHttp,
}

impl VaultClient {
    pub fn new(config: &VaultConfig) -> Result<Self> {
        Ok(Self {
            http: VaultHttp::new(config)?,
        })
    }

    /// KV v2 store sharing this client's connection and token
    pub fn kv(&self) -> KvStore {
        KvStore::from_http(self.http.clone())
    }
}

#[async_trait]
impl SecretsBackend for VaultClient {
    async fn mount(&self, namespace: &TenantNamespace, engine: EngineType) -> Result<()> {
        let path = format!("sys/mounts/{}", namespace);
        match self.http.post(&path, &json!({ "type": engine.as_str() })).await {
            Ok(_) => {
                debug!("Mounted {} engine at {}", engine, namespace);
                Ok(())
            }
            Err(BackendError::Rejected { message, .. }) if is_mount_conflict(&message) => {
                Err(BackendError::already_mounted(namespace.as_str()))
            }
            Err(e) => Err(e),
        }
    }

    async fn write_config(
        &self,
        namespace: &TenantNamespace,
        root: &RootCredential,
    ) -> Result<()> {
        let path = format!("{}/config/root", namespace);
        self.http.post(&path, &root.to_body()).await?;
        debug!("Wrote root config for {}", namespace);
        Ok(())
    }

    async fn write_policy(
        &self,
        namespace: &TenantNamespace,
        role: &str,
        policy: &AccessPolicy,
    ) -> Result<()> {
        let path = format!("{}/roles/{}", namespace, role);
        self.http.post(&path, &policy.to_body()).await?;
        debug!("Wrote role {} for {}", role, namespace);
        Ok(())
    }

    async fn read_lease(&self, namespace: &TenantNamespace, role: &str) -> Result<RawLease> {
        let path = format!("{}/creds/{}", namespace, role);
        let response = self.http.get(&path).await?;
        decode(response).await
    }
}

/// Vault words this as "path is already in use at X/" (older releases:
/// "existing mount at X/")
fn is_mount_conflict(message: &str) -> bool {
    message.contains("already in use") || message.contains("existing mount")
}

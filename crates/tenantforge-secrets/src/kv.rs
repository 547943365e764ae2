//! Static per-organization secrets in Vault's KV v2 engine

use crate::error::Result;
use crate::http::{decode, VaultHttp};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tenantforge_core::OrganizationId;
use tracing::debug;

/// Mount point of the KV v2 engine
pub const DEFAULT_KV_MOUNT: &str = "secret";

#[derive(Debug, Deserialize)]
struct KvEnvelope {
    data: KvData,
}

#[derive(Debug, Deserialize)]
struct KvData {
    #[serde(default)]
    data: HashMap<String, String>,
}

/// Stores and retrieves opaque string maps under
/// `secret/data/{organization}/{name}`. Every key is scoped to one
/// organization.
#[derive(Debug, Clone)]
pub struct KvStore {
    http: VaultHttp,
    mount: String,
}

impl KvStore {
    pub(crate) fn from_http(http: VaultHttp) -> Self {
        Self {
            http,
            mount: DEFAULT_KV_MOUNT.to_string(),
        }
    }

    pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
        self.mount = mount.into();
        self
    }

    fn path(&self, key: &str) -> String {
        format!("{}/data/{}", self.mount, key)
    }

    /// Latest version of the organization's secret `name`
    pub async fn get(&self, org: &OrganizationId, name: &str) -> Result<HashMap<String, String>> {
        let key = org.secret_key(name);
        let response = self.http.get(&self.path(&key)).await?;
        let envelope: KvEnvelope = decode(response).await?;
        debug!("Read static secret {}/{}", self.mount, key);
        Ok(envelope.data.data)
    }

    /// Write a new version of the organization's secret `name`
    pub async fn put(
        &self,
        org: &OrganizationId,
        name: &str,
        values: &HashMap<String, String>,
    ) -> Result<()> {
        let key = org.secret_key(name);
        self.http
            .put(&self.path(&key), &json!({ "data": values }))
            .await?;
        debug!("Wrote static secret {}/{}", self.mount, key);
        Ok(())
    }
}

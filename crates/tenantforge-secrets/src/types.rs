//! Core types for tenant credentials

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::time::Duration;
use tenantforge_core::SecureString;

/// Kind of secrets engine mounted for a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineType {
    Aws,
}

impl EngineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineType::Aws => "aws",
        }
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Long-lived AWS keys a tenant hands over once at configuration time
#[derive(Debug, Clone)]
pub struct RootCredential {
    pub access_key: SecureString,
    pub secret_key: SecureString,
    pub region: String,
}

impl RootCredential {
    pub fn new(
        access_key: impl Into<SecureString>,
        secret_key: impl Into<SecureString>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: region.into(),
        }
    }

    /// Request body for `{namespace}/config/root`
    pub(crate) fn to_body(&self) -> Value {
        json!({
            "access_key": self.access_key.as_str(),
            "secret_key": self.secret_key.as_str(),
            "region": self.region,
        })
    }
}

/// How Vault materializes credentials for a role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialType {
    IamUser,
}

impl CredentialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialType::IamUser => "iam_user",
        }
    }
}

/// IAM policy attached to the tenant role
#[derive(Debug, Clone, PartialEq)]
pub struct AccessPolicy {
    pub credential_type: CredentialType,
    pub document: Value,
}

impl AccessPolicy {
    /// Policy every tenant role is bound to: IAM and EC2 management only
    pub fn tenant_default() -> Self {
        Self {
            credential_type: CredentialType::IamUser,
            document: json!({
                "Version": "2012-10-17",
                "Statement": [
                    {
                        "Effect": "Allow",
                        "Action": ["iam:*", "ec2:*"],
                        "Resource": ["*"]
                    }
                ]
            }),
        }
    }

    /// Request body for `{namespace}/roles/{role}`. Vault expects the
    /// policy document as a JSON string, not a nested object.
    pub(crate) fn to_body(&self) -> Value {
        json!({
            "credential_type": self.credential_type.as_str(),
            "policy_document": self.document.to_string(),
        })
    }
}

/// Lease envelope as returned by `GET {namespace}/creds/{role}`
#[derive(Debug, Clone, Deserialize)]
pub struct RawLease {
    #[serde(default)]
    pub lease_id: String,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
}

/// Short-lived AWS keys derived from a tenant's root credential
#[derive(Debug, Clone)]
pub struct Lease {
    pub access_key: SecureString,
    pub secret_key: SecureString,
    pub security_token: Option<SecureString>,
    pub lease_id: String,
    pub issued_at: DateTime<Utc>,
    pub ttl: Duration,
    pub renewable: bool,
}

impl Lease {
    /// When Vault will revoke the keys. `None` when no TTL was reported.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        if self.ttl.is_zero() {
            return None;
        }
        chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| self.issued_at.checked_add_signed(ttl))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expiry| now >= expiry)
    }
}

//! Vault integration for tenantforge
//!
//! This crate provides:
//! - **Backend client**: mount, root config, role/policy and lease calls against Vault
//! - **Lease manager**: typed, single-use AWS credential leases
//! - **Provisioning workflow**: mount -> configure -> bind policy per tenant
//! - **KV store**: static per-organization secrets in KV v2

pub mod backend;
pub mod error;
mod http;
pub mod kv;
pub mod lease;
pub mod provision;
pub mod types;

pub use backend::{SecretsBackend, VaultClient};
pub use error::BackendError;
pub use kv::KvStore;
pub use lease::LeaseManager;
pub use provision::{ProvisionError, ProvisionStage, ProvisionState, ProvisioningWorkflow};
pub use types::{AccessPolicy, CredentialType, EngineType, Lease, RawLease, RootCredential};

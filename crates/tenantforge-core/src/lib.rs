//! # tenantforge-core
//!
//! Core library shared by the tenantforge crates:
//! - Tenant path resolution (organization id to backend namespace)
//! - Server configuration and validation
//! - Secret-holding string type with zeroize on drop

pub mod config;
pub mod error;
pub mod security;
pub mod tenant;

pub use config::{ServerConfig, TerraformConfig, VaultConfig};
pub use error::{Error, Result};
pub use security::SecureString;
pub use tenant::{OrganizationId, TenantNamespace, ROLE_NAME};

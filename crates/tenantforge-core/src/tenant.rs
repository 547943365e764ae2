//! Tenant path resolution
//!
//! Every organization gets its own AWS secrets engine mounted at
//! `{organization}_aws`. The mount is the isolation boundary: the root
//! credential, the role and every issued lease live underneath it.

use crate::error::{Error, Result};
use std::fmt;

/// Suffix appended to an organization id to form its engine mount point
pub const NAMESPACE_SUFFIX: &str = "_aws";

/// Role every tenant's credentials are issued from
pub const ROLE_NAME: &str = "backend-role";

/// Validated organization identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrganizationId(String);

impl OrganizationId {
    /// Parse an organization id.
    ///
    /// The id becomes a single segment of every Vault path for the tenant,
    /// so only ASCII letters, digits, `-`, `_` and `.` are accepted and `..`
    /// is rejected. Anything else could address another tenant's mount.
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::invalid_organization("must not be empty"));
        }
        if let Some(c) = id.chars().find(|c| !is_id_char(*c)) {
            return Err(Error::invalid_organization(format!(
                "'{}' contains disallowed character {:?}",
                id.escape_default(),
                c
            )));
        }
        if id.contains("..") {
            return Err(Error::invalid_organization(format!(
                "'{}' must not contain '..'",
                id
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Backend namespace (engine mount point) owned by this organization
    pub fn namespace(&self) -> TenantNamespace {
        TenantNamespace(format!("{}{}", self.0, NAMESPACE_SUFFIX))
    }

    /// Role name credentials are leased from within the namespace
    pub fn role_name(&self) -> &'static str {
        ROLE_NAME
    }

    /// Key for a static secret owned by this organization
    pub fn secret_key(&self, name: &str) -> String {
        format!("{}/{}", self.0, name)
    }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mount point of a tenant's dynamic secrets engine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantNamespace(String);

impl TenantNamespace {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//! Server configuration
//!
//! Values arrive from CLI flags or their environment fallbacks (see the
//! `tenantforge` binary) and are validated here once at startup.

use crate::error::{Error, Result};
use crate::security::SecureString;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Default HTTP listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Default location of the terraform executable
pub const DEFAULT_TERRAFORM_BIN: &str = "/usr/local/bin/terraform";

/// How long freshly leased AWS keys are given to become usable
pub const DEFAULT_PROPAGATION_WINDOW: Duration = Duration::from_secs(5);

/// Default timeout for a single Vault request
pub const DEFAULT_VAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the Vault API
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Base address without trailing slash, e.g. `https://vault.example.com:8200`
    pub address: String,
    pub token: SecureString,
    pub timeout: Duration,
}

impl VaultConfig {
    pub fn new(address: &str, token: impl Into<SecureString>) -> Result<Self> {
        let token = token.into();
        if address.trim().is_empty() {
            return Err(Error::missing_field("vault address"));
        }
        if token.is_empty() {
            return Err(Error::missing_field("vault token"));
        }

        let url = Url::parse(address)
            .map_err(|e| Error::invalid_config(format!("vault address '{}': {}", address, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_config(format!(
                "vault address must be http or https, got '{}'",
                url.scheme()
            )));
        }

        Ok(Self {
            address: address.trim_end_matches('/').to_string(),
            token,
            timeout: DEFAULT_VAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Location of the terraform binary and the configuration it applies
#[derive(Debug, Clone)]
pub struct TerraformConfig {
    pub binary: PathBuf,
    pub working_dir: PathBuf,
}

impl TerraformConfig {
    pub fn new(binary: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            working_dir: working_dir.into(),
        }
    }
}

/// Fully validated configuration for the HTTP service
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub vault: VaultConfig,
    pub port: u16,
    pub terraform: TerraformConfig,
    pub propagation_window: Duration,
}

impl ServerConfig {
    pub fn new(vault: VaultConfig, terraform: TerraformConfig) -> Self {
        Self {
            vault,
            port: DEFAULT_PORT,
            terraform,
            propagation_window: DEFAULT_PROPAGATION_WINDOW,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_propagation_window(mut self, window: Duration) -> Self {
        if window.is_zero() {
            warn!("Propagation window is zero; applies may fail with freshly issued keys");
        }
        self.propagation_window = window;
        self
    }

    /// Address the HTTP listener binds to
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

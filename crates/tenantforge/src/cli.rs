//! Command-line interface
//!
//! Every option can also come from the environment (or a `.env` file), which
//! is how the service is usually configured in containers.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tenantforge_core::config::{DEFAULT_PORT, DEFAULT_TERRAFORM_BIN};
use tenantforge_core::{ServerConfig, TerraformConfig, VaultConfig};

#[derive(Parser, Debug)]
#[command(name = "tenantforge")]
#[command(author, version, about = "Tenant-scoped AWS credentials from Vault, applied with Terraform")]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Vault API address, e.g. https://vault.example.com:8200
    #[arg(long, env = "VAULT_API_ADDR")]
    pub vault_addr: String,

    /// Vault token used for every request
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true)]
    pub vault_token: String,

    /// Timeout for a single Vault request, in seconds
    #[arg(long, env = "VAULT_TIMEOUT", default_value_t = 30)]
    pub vault_timeout: u64,

    /// HTTP listen port
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Path to the terraform executable
    #[arg(long, env = "TERRAFORM_BIN", default_value = DEFAULT_TERRAFORM_BIN)]
    pub terraform_bin: PathBuf,

    /// Directory holding the terraform configuration [default: current directory]
    #[arg(long, env = "TERRAFORM_DIR")]
    pub terraform_dir: Option<PathBuf>,

    /// Seconds to wait for leased keys to become usable before applying
    #[arg(long, env = "PROPAGATION_WINDOW_SECS", default_value_t = 5)]
    pub propagation_window: u64,
}

impl Cli {
    /// Validate the parsed options into a server configuration
    pub fn into_config(self) -> Result<ServerConfig> {
        let vault = VaultConfig::new(&self.vault_addr, self.vault_token)
            .context("invalid Vault settings")?
            .with_timeout(Duration::from_secs(self.vault_timeout));

        let working_dir = match self.terraform_dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("failed to read current directory")?,
        };

        Ok(
            ServerConfig::new(vault, TerraformConfig::new(self.terraform_bin, working_dir))
                .with_port(self.port)
                .with_propagation_window(Duration::from_secs(self.propagation_window)),
        )
    }
}

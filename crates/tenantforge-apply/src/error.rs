//! Error types for apply orchestration

use std::path::PathBuf;
use tenantforge_secrets::BackendError;
use thiserror::Error;

/// Failure running the apply engine itself
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Terraform binary not found or not executable: {}", path.display())]
    BinaryNotFound { path: PathBuf },

    #[error("Terraform working directory does not exist: {}", path.display())]
    WorkingDirNotFound { path: PathBuf },

    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {}: {stderr}", describe_exit(exit_code))]
    Failed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Apply was attempted with no leased key pair in the execution context
    #[error("No credentials injected into the execution context")]
    MissingCredentials,
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("status {}", code),
        None => "signal".to_string(),
    }
}

/// Stage of an apply run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStage {
    Init,
    LeaseAcquired,
    Propagating,
    Applied,
}

impl std::fmt::Display for ApplyStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplyStage::Init => write!(f, "init"),
            ApplyStage::LeaseAcquired => write!(f, "lease"),
            ApplyStage::Propagating => write!(f, "propagation"),
            ApplyStage::Applied => write!(f, "apply"),
        }
    }
}

/// Why an apply run ended in `Failed(stage)`
#[derive(Error, Debug)]
pub enum ApplyError {
    /// Engine could not be initialized; nothing tenant-specific happened yet
    #[error("Apply engine initialization failed: {0}")]
    EngineInit(#[source] EngineError),

    /// Tenant-scoped: Vault could not issue a lease for the organization
    #[error("{0}")]
    Lease(#[from] BackendError),

    /// Lease ran out while waiting for it to propagate
    #[error("Lease {lease_id} expired before apply")]
    LeaseExpired { lease_id: String },

    #[error("Apply failed: {0}")]
    EngineApply(#[source] EngineError),
}

impl ApplyError {
    /// Stage the run failed in
    pub fn stage(&self) -> ApplyStage {
        match self {
            ApplyError::EngineInit(_) => ApplyStage::Init,
            ApplyError::Lease(_) => ApplyStage::LeaseAcquired,
            ApplyError::LeaseExpired { .. } => ApplyStage::Propagating,
            ApplyError::EngineApply(_) => ApplyStage::Applied,
        }
    }

    /// Engine-level failures, as opposed to problems with the tenant's lease
    pub fn is_engine_failure(&self) -> bool {
        matches!(self, ApplyError::EngineInit(_) | ApplyError::EngineApply(_))
    }
}

//! Apply engine trait and the execution context it runs under

use crate::error::EngineError;
use async_trait::async_trait;
use tenantforge_core::SecureString;
use tenantforge_secrets::Lease;

/// Terraform input variable carrying the leased access key
pub const ACCESS_KEY_VAR: &str = "TF_VAR_aws_access_key";

/// Terraform input variable carrying the leased secret key
pub const SECRET_KEY_VAR: &str = "TF_VAR_aws_secret_key";

/// Infrastructure-as-code engine driven by the orchestrator
#[async_trait]
pub trait ApplyEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Refresh providers/modules in the working directory
    async fn init(&self) -> Result<(), EngineError>;

    /// Reconcile infrastructure using the credentials in `context`
    async fn apply(&self, context: &ExecutionContext) -> Result<(), EngineError>;
}

#[derive(Debug, Clone)]
struct InjectedKeys {
    lease_id: String,
    access_key: SecureString,
    secret_key: SecureString,
}

/// Environment an apply runs under. Holds at most one lease's key pair;
/// injecting a new lease replaces the previous one.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    keys: Option<InjectedKeys>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(&mut self, lease: &Lease) {
        self.keys = Some(InjectedKeys {
            lease_id: lease.lease_id.clone(),
            access_key: lease.access_key.clone(),
            secret_key: lease.secret_key.clone(),
        });
    }

    pub fn clear(&mut self) {
        self.keys = None;
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_none()
    }

    /// Id of the lease whose keys are currently injected
    pub fn lease_id(&self) -> Option<&str> {
        self.keys.as_ref().map(|k| k.lease_id.as_str())
    }

    /// Variables to export into the engine's process environment
    pub fn env_vars(&self) -> Vec<(&'static str, &str)> {
        match &self.keys {
            Some(keys) => vec![
                (ACCESS_KEY_VAR, keys.access_key.as_str()),
                (SECRET_KEY_VAR, keys.secret_key.as_str()),
            ],
            None => Vec::new(),
        }
    }
}

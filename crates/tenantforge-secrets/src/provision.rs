//! Tenant provisioning workflow
//!
//! `Unmounted -> Mounted -> Configured -> PolicyBound`. A failed step stops
//! the workflow and reports which step broke; earlier steps are not undone.
//! Runs for the same namespace must be serialized by the caller.

use crate::backend::SecretsBackend;
use crate::error::BackendError;
use crate::types::{AccessPolicy, EngineType, RootCredential};
use std::fmt;
use std::sync::Arc;
use tenantforge_core::OrganizationId;
use thiserror::Error;
use tracing::info;

/// Where a tenant's engine stands after a successful step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionState {
    Unmounted,
    Mounted,
    Configured,
    PolicyBound,
}

/// Step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStage {
    Mount,
    WriteConfig,
    WritePolicy,
}

impl fmt::Display for ProvisionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionStage::Mount => write!(f, "mount"),
            ProvisionStage::WriteConfig => write!(f, "write config"),
            ProvisionStage::WritePolicy => write!(f, "write policy"),
        }
    }
}

#[derive(Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct ProvisionError {
    pub stage: ProvisionStage,
    #[source]
    pub source: BackendError,
}

impl ProvisionError {
    fn at(stage: ProvisionStage) -> impl FnOnce(BackendError) -> Self {
        move |source| Self { stage, source }
    }

    pub fn is_already_mounted(&self) -> bool {
        self.stage == ProvisionStage::Mount && self.source.is_already_mounted()
    }

    /// State the backend was left in when the workflow stopped
    pub fn reached(&self) -> ProvisionState {
        match self.stage {
            ProvisionStage::Mount => ProvisionState::Unmounted,
            ProvisionStage::WriteConfig => ProvisionState::Mounted,
            ProvisionStage::WritePolicy => ProvisionState::Configured,
        }
    }
}

pub struct ProvisioningWorkflow {
    backend: Arc<dyn SecretsBackend>,
    policy: AccessPolicy,
}

impl ProvisioningWorkflow {
    pub fn new(backend: Arc<dyn SecretsBackend>) -> Self {
        Self {
            backend,
            policy: AccessPolicy::tenant_default(),
        }
    }

    /// `Unmounted -> Mounted`. Fails with `AlreadyMounted` if the tenant
    /// engine exists.
    pub async fn mount(&self, org: &OrganizationId) -> Result<ProvisionState, ProvisionError> {
        let namespace = org.namespace();
        self.backend
            .mount(&namespace, EngineType::Aws)
            .await
            .map_err(ProvisionError::at(ProvisionStage::Mount))?;

        info!(organization = %org, namespace = %namespace, "Tenant engine mounted");
        Ok(ProvisionState::Mounted)
    }

    /// `Mounted -> Configured -> PolicyBound`. Overwrites any existing root
    /// config and role. The root credential is dropped once written.
    pub async fn configure(
        &self,
        org: &OrganizationId,
        root: RootCredential,
    ) -> Result<ProvisionState, ProvisionError> {
        let namespace = org.namespace();

        self.backend
            .write_config(&namespace, &root)
            .await
            .map_err(ProvisionError::at(ProvisionStage::WriteConfig))?;
        let region = root.region.clone();
        drop(root);
        info!(organization = %org, region = %region, "Root credential written");

        self.backend
            .write_policy(&namespace, org.role_name(), &self.policy)
            .await
            .map_err(ProvisionError::at(ProvisionStage::WritePolicy))?;
        info!(organization = %org, role = org.role_name(), "Access policy bound");

        Ok(ProvisionState::PolicyBound)
    }

    /// Run every step from an unmounted namespace
    pub async fn provision(
        &self,
        org: &OrganizationId,
        root: RootCredential,
    ) -> Result<ProvisionState, ProvisionError> {
        self.mount(org).await?;
        self.configure(org, root).await
    }
}

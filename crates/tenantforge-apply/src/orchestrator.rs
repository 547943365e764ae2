//! Apply orchestration
//!
//! A run walks `Init -> LeaseAcquired -> Propagating -> Applied`, stopping
//! at the first failure. The engine's working directory and execution
//! context are shared state, so each run holds the engine's slot from init
//! until the apply returns. Runs against one engine never overlap.

use crate::engine::{ApplyEngine, ExecutionContext};
use crate::error::ApplyError;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tenantforge_core::OrganizationId;
use tenantforge_secrets::{Lease, LeaseManager};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub organization: String,
    pub lease_id: String,
    pub propagation_wait: Duration,
}

pub struct ApplyOrchestrator {
    engine: Arc<dyn ApplyEngine>,
    leases: LeaseManager,
    propagation_window: Duration,
    slot: Mutex<ExecutionContext>,
}

impl ApplyOrchestrator {
    pub fn new(
        engine: Arc<dyn ApplyEngine>,
        leases: LeaseManager,
        propagation_window: Duration,
    ) -> Self {
        Self {
            engine,
            leases,
            propagation_window,
            slot: Mutex::new(ExecutionContext::new()),
        }
    }

    /// Apply the configuration with a freshly leased key pair for `org`
    pub async fn run(&self, org: &OrganizationId) -> Result<ApplyReport, ApplyError> {
        let mut context = self.slot.lock().await;
        debug!(organization = %org, "Acquired {} execution slot", self.engine.name());

        self.engine.init().await.map_err(ApplyError::EngineInit)?;

        let lease = self.leases.issue(&org.namespace(), org.role_name()).await?;
        context.inject(&lease);

        let result = self.propagate_and_apply(&context, &lease).await;
        context.clear();

        match &result {
            Ok(_) => info!(organization = %org, lease_id = %lease.lease_id, "Apply finished"),
            Err(e) => warn!(organization = %org, stage = %e.stage(), "Apply failed: {}", e),
        }
        result.map(|propagation_wait| ApplyReport {
            organization: org.to_string(),
            lease_id: lease.lease_id.clone(),
            propagation_wait,
        })
    }

    /// Freshly created IAM users are not usable at AWS for a few seconds.
    /// The wait is unconditional; the keys are not tested first.
    async fn propagate_and_apply(
        &self,
        context: &ExecutionContext,
        lease: &Lease,
    ) -> Result<Duration, ApplyError> {
        debug!(
            lease_id = %lease.lease_id,
            "Waiting {:?} for credentials to propagate",
            self.propagation_window
        );
        tokio::time::sleep(self.propagation_window).await;

        if lease.is_expired_at(Utc::now()) {
            return Err(ApplyError::LeaseExpired {
                lease_id: lease.lease_id.clone(),
            });
        }

        self.engine
            .apply(context)
            .await
            .map_err(ApplyError::EngineApply)?;
        Ok(self.propagation_window)
    }
}

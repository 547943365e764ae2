//! Shared handler state

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;
use tenantforge_apply::{ApplyEngine, ApplyOrchestrator};
use tenantforge_core::TenantNamespace;
use tenantforge_secrets::{LeaseManager, ProvisioningWorkflow, SecretsBackend};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone)]
pub struct AppState {
    pub provisioning: Arc<ProvisioningWorkflow>,
    pub leases: LeaseManager,
    pub orchestrator: Arc<ApplyOrchestrator>,
    pub locks: TenantLocks,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn SecretsBackend>,
        engine: Arc<dyn ApplyEngine>,
        propagation_window: Duration,
    ) -> Self {
        let leases = LeaseManager::new(backend.clone());
        Self {
            provisioning: Arc::new(ProvisioningWorkflow::new(backend)),
            orchestrator: Arc::new(ApplyOrchestrator::new(
                engine,
                leases.clone(),
                propagation_window,
            )),
            leases,
            locks: TenantLocks::default(),
        }
    }
}

type LockMap = HashMap<TenantNamespace, Arc<Mutex<()>>>;

/// One lock per tenant namespace. Provisioning steps for the same tenant
/// run one at a time; different tenants proceed in parallel. An entry lives
/// only while some request holds or waits on it.
#[derive(Clone, Default)]
pub struct TenantLocks {
    inner: Arc<StdMutex<LockMap>>,
}

impl TenantLocks {
    pub async fn acquire(&self, namespace: &TenantNamespace) -> TenantGuard {
        let lock = {
            let mut locks = self.map();
            // Entries left behind by cancelled waiters
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(namespace.clone()).or_default().clone()
        };
        TenantGuard {
            guard: Some(lock.lock_owned().await),
            namespace: namespace.clone(),
            locks: self.clone(),
        }
    }

    fn map(&self) -> MutexGuard<'_, LockMap> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.map().len()
    }
}

/// Held for the duration of a provisioning step
pub struct TenantGuard {
    guard: Option<OwnedMutexGuard<()>>,
    namespace: TenantNamespace,
    locks: TenantLocks,
}

impl Drop for TenantGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.map();
        let idle = locks
            .get(&self.namespace)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            locks.remove(&self.namespace);
        }
    }
}

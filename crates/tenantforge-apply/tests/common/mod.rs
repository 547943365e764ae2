//! Common test helpers for tenantforge-apply integration tests
//!
//! In-memory stand-ins for Vault and the apply engine that record every
//! interaction into a shared event log, so tests can assert on ordering.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tenantforge_apply::{ApplyEngine, ApplyOrchestrator, EngineError, ExecutionContext};
use tenantforge_apply::{ACCESS_KEY_VAR, SECRET_KEY_VAR};
use tenantforge_core::TenantNamespace;
use tenantforge_secrets::error::Result as BackendResult;
use tenantforge_secrets::{
    AccessPolicy, BackendError, EngineType, LeaseManager, RawLease, RootCredential,
    SecretsBackend,
};

/// Ordered record of what happened, with the paused-clock time it happened at
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    LeaseIssued { namespace: String, access_key: String },
    Init,
    ApplyStarted {
        access_key: Option<String>,
        secret_key: Option<String>,
        lease_id: Option<String>,
    },
    ApplyFinished { access_key: Option<String> },
}

#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<(tokio::time::Instant, Event)>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        self.events
            .lock()
            .unwrap()
            .push((tokio::time::Instant::now(), event));
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn timed(&self) -> Vec<(tokio::time::Instant, Event)> {
        self.events.lock().unwrap().clone()
    }
}

/// Lease payload kinds the fake backend can hand out
#[derive(Clone)]
pub enum LeaseReply {
    Keys { access_key: String, secret_key: String },
    Raw(Value),
    Reject { status: u16, message: String },
}

/// Vault stand-in keyed by namespace
pub struct FakeBackend {
    log: EventLog,
    replies: HashMap<String, LeaseReply>,
    ttl_secs: u64,
    counter: Mutex<u64>,
}

impl FakeBackend {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            replies: HashMap::new(),
            ttl_secs: 3600,
            counter: Mutex::new(0),
        }
    }

    pub fn with_keys(mut self, namespace: &str, access_key: &str, secret_key: &str) -> Self {
        self.replies.insert(
            namespace.to_string(),
            LeaseReply::Keys {
                access_key: access_key.to_string(),
                secret_key: secret_key.to_string(),
            },
        );
        self
    }

    pub fn with_reply(mut self, namespace: &str, reply: LeaseReply) -> Self {
        self.replies.insert(namespace.to_string(), reply);
        self
    }

    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    fn next_lease_id(&self, namespace: &str) -> String {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        format!("{}/creds/backend-role/{}", namespace, *counter)
    }
}

#[async_trait]
impl SecretsBackend for FakeBackend {
    async fn mount(&self, _namespace: &TenantNamespace, _engine: EngineType) -> BackendResult<()> {
        Ok(())
    }

    async fn write_config(
        &self,
        _namespace: &TenantNamespace,
        _root: &RootCredential,
    ) -> BackendResult<()> {
        Ok(())
    }

    async fn write_policy(
        &self,
        _namespace: &TenantNamespace,
        _role: &str,
        _policy: &AccessPolicy,
    ) -> BackendResult<()> {
        Ok(())
    }

    async fn read_lease(&self, namespace: &TenantNamespace, _role: &str) -> BackendResult<RawLease> {
        let reply = self.replies.get(namespace.as_str()).cloned().unwrap_or(LeaseReply::Reject {
            status: 404,
            message: format!("no handler for route \"{}/creds/backend-role\"", namespace),
        });

        let body = match reply {
            LeaseReply::Keys { access_key, secret_key } => {
                self.log.push(Event::LeaseIssued {
                    namespace: namespace.to_string(),
                    access_key: access_key.clone(),
                });
                json!({
                    "lease_id": self.next_lease_id(namespace.as_str()),
                    "lease_duration": self.ttl_secs,
                    "renewable": true,
                    "data": {"access_key": access_key, "secret_key": secret_key}
                })
            }
            LeaseReply::Raw(value) => value,
            LeaseReply::Reject { status, message } => {
                return Err(BackendError::rejected(status, message));
            }
        };

        Ok(serde_json::from_value(body).unwrap())
    }
}

/// Engine stand-in that records the credentials it was handed
pub struct RecordingEngine {
    log: EventLog,
    apply_duration: Duration,
    fail_init: bool,
    fail_apply: bool,
}

impl RecordingEngine {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            apply_duration: Duration::ZERO,
            fail_init: false,
            fail_apply: false,
        }
    }

    /// Make each apply take this long, yielding to other tasks meanwhile
    pub fn with_apply_duration(mut self, duration: Duration) -> Self {
        self.apply_duration = duration;
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn failing_apply(mut self) -> Self {
        self.fail_apply = true;
        self
    }
}

fn env_value(context: &ExecutionContext, name: &str) -> Option<String> {
    context
        .env_vars()
        .into_iter()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

#[async_trait]
impl ApplyEngine for RecordingEngine {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn init(&self) -> Result<(), EngineError> {
        self.log.push(Event::Init);
        if self.fail_init {
            return Err(EngineError::Failed {
                command: "terraform init".to_string(),
                exit_code: Some(1),
                stderr: "Error: Failed to query available provider packages".to_string(),
            });
        }
        Ok(())
    }

    async fn apply(&self, context: &ExecutionContext) -> Result<(), EngineError> {
        self.log.push(Event::ApplyStarted {
            access_key: env_value(context, ACCESS_KEY_VAR),
            secret_key: env_value(context, SECRET_KEY_VAR),
            lease_id: context.lease_id().map(str::to_string),
        });
        if !self.apply_duration.is_zero() {
            tokio::time::sleep(self.apply_duration).await;
        }
        self.log.push(Event::ApplyFinished {
            access_key: env_value(context, ACCESS_KEY_VAR),
        });
        if self.fail_apply {
            return Err(EngineError::Failed {
                command: "terraform apply".to_string(),
                exit_code: Some(1),
                stderr: "Error: creating EC2 Instance: UnauthorizedOperation".to_string(),
            });
        }
        Ok(())
    }
}

pub fn orchestrator(
    backend: FakeBackend,
    engine: RecordingEngine,
    window: Duration,
) -> ApplyOrchestrator {
    ApplyOrchestrator::new(
        Arc::new(engine),
        LeaseManager::new(Arc::new(backend)),
        window,
    )
}

pub fn raw_without_access_key() -> Value {
    let mut data = Map::new();
    data.insert("secret_key".to_string(), json!("orphan-secret"));
    json!({"lease_id": "acme_aws/creds/backend-role/bad", "lease_duration": 60, "data": data})
}

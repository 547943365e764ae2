//! Apply orchestrator behavior: ordering, propagation wait, failure
//! classification and serialization of concurrent runs.
//!
//! All tests run on a paused tokio clock so the propagation window costs
//! no wall time.

mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use tenantforge_apply::{ApplyError, ApplyStage};
use tenantforge_core::OrganizationId;
use tenantforge_secrets::BackendError;

const WINDOW: Duration = Duration::from_secs(5);

fn org(id: &str) -> OrganizationId {
    OrganizationId::parse(id).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_run_orders_init_lease_wait_apply() {
    let log = EventLog::new();
    let backend = FakeBackend::new(log.clone()).with_keys("acme_aws", "AKIALEASE", "leased");
    let orchestrator = orchestrator(backend, RecordingEngine::new(log.clone()), WINDOW);

    let report = orchestrator.run(&org("acme")).await.unwrap();

    let timed = log.timed();
    let kinds: Vec<_> = timed.iter().map(|(_, e)| e.clone()).collect();
    assert!(matches!(kinds[0], Event::Init));
    assert!(matches!(kinds[1], Event::LeaseIssued { .. }));
    assert!(matches!(kinds[2], Event::ApplyStarted { .. }));
    assert!(matches!(kinds[3], Event::ApplyFinished { .. }));

    let waited = timed[2].0 - timed[1].0;
    assert!(
        waited >= WINDOW,
        "apply started {:?} after the lease; window is {:?}",
        waited,
        WINDOW
    );
    assert_eq!(report.propagation_wait, WINDOW);
    assert_eq!(report.organization, "acme");
}

#[tokio::test(start_paused = true)]
async fn test_apply_sees_the_leased_keys() {
    let log = EventLog::new();
    let backend = FakeBackend::new(log.clone()).with_keys("acme_aws", "AKIALEASE", "leased");
    let orchestrator = orchestrator(backend, RecordingEngine::new(log.clone()), WINDOW);

    let report = orchestrator.run(&org("acme")).await.unwrap();

    let started = log
        .events()
        .into_iter()
        .find(|e| matches!(e, Event::ApplyStarted { .. }))
        .unwrap();
    assert_eq!(
        started,
        Event::ApplyStarted {
            access_key: Some("AKIALEASE".to_string()),
            secret_key: Some("leased".to_string()),
            lease_id: Some(report.lease_id.clone()),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_every_run_uses_a_fresh_lease() {
    let log = EventLog::new();
    let backend = FakeBackend::new(log.clone()).with_keys("acme_aws", "AKIALEASE", "leased");
    let orchestrator = orchestrator(backend, RecordingEngine::new(log.clone()), WINDOW);

    let first = orchestrator.run(&org("acme")).await.unwrap();
    let second = orchestrator.run(&org("acme")).await.unwrap();

    assert_ne!(first.lease_id, second.lease_id);
    let leases = log
        .events()
        .iter()
        .filter(|e| matches!(e, Event::LeaseIssued { .. }))
        .count();
    assert_eq!(leases, 2);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_lease_never_reaches_apply() {
    let log = EventLog::new();
    let backend = FakeBackend::new(log.clone())
        .with_reply("acme_aws", LeaseReply::Raw(raw_without_access_key()));
    let orchestrator = orchestrator(backend, RecordingEngine::new(log.clone()), WINDOW);

    let err = orchestrator.run(&org("acme")).await.unwrap_err();

    assert_eq!(err.stage(), ApplyStage::LeaseAcquired);
    assert!(matches!(
        err,
        ApplyError::Lease(BackendError::MalformedLease {
            field: "access_key"
        })
    ));
    assert!(!log
        .events()
        .iter()
        .any(|e| matches!(e, Event::ApplyStarted { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_unprovisioned_org_fails_at_lease() {
    let log = EventLog::new();
    let backend = FakeBackend::new(log.clone());
    let orchestrator = orchestrator(backend, RecordingEngine::new(log.clone()), WINDOW);

    let err = orchestrator.run(&org("unknown-org")).await.unwrap_err();

    assert!(!err.is_engine_failure());
    assert!(
        err.to_string().contains("no handler for route"),
        "Unexpected error: {}",
        err
    );
    assert_eq!(log.events(), vec![Event::Init]);
}

#[tokio::test(start_paused = true)]
async fn test_init_failure_is_engine_failure_and_skips_lease() {
    let log = EventLog::new();
    let backend = FakeBackend::new(log.clone()).with_keys("acme_aws", "AKIALEASE", "leased");
    let engine = RecordingEngine::new(log.clone()).failing_init();
    let orchestrator = orchestrator(backend, engine, WINDOW);

    let err = orchestrator.run(&org("acme")).await.unwrap_err();

    assert!(matches!(err, ApplyError::EngineInit(_)));
    assert!(err.is_engine_failure());
    assert_eq!(log.events(), vec![Event::Init]);
}

#[tokio::test(start_paused = true)]
async fn test_apply_failure_is_reported_and_slot_recovers() {
    let log = EventLog::new();
    let backend = FakeBackend::new(log.clone()).with_keys("acme_aws", "AKIALEASE", "leased");
    let engine = RecordingEngine::new(log.clone()).failing_apply();
    let orchestrator = orchestrator(backend, engine, WINDOW);

    let err = orchestrator.run(&org("acme")).await.unwrap_err();
    assert_eq!(err.stage(), ApplyStage::Applied);
    assert!(err.to_string().contains("UnauthorizedOperation"));

    // The slot is released and usable by the next run
    let again = orchestrator.run(&org("acme")).await.unwrap_err();
    assert_eq!(again.stage(), ApplyStage::Applied);
}

#[tokio::test(start_paused = true)]
async fn test_lease_expiring_during_propagation_is_not_applied() {
    let log = EventLog::new();
    let backend = FakeBackend::new(log.clone())
        .with_keys("acme_aws", "AKIALEASE", "leased")
        .with_ttl(1);
    let orchestrator = orchestrator(
        backend,
        RecordingEngine::new(log.clone()),
        // Wall clock drives lease expiry, so the wait has to be real here
        Duration::from_millis(1100),
    );

    // Paused time would skip the sleep without advancing chrono's clock
    tokio::time::resume();
    let err = orchestrator.run(&org("acme")).await.unwrap_err();

    assert!(matches!(err, ApplyError::LeaseExpired { .. }), "Unexpected error: {}", err);
    assert!(!log
        .events()
        .iter()
        .any(|e| matches!(e, Event::ApplyStarted { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_runs_never_interleave_credentials() {
    let log = EventLog::new();
    let backend = FakeBackend::new(log.clone())
        .with_keys("acme_aws", "AKIAACME", "acme-secret")
        .with_keys("other_aws", "AKIAOTHER", "other-secret");
    let engine = RecordingEngine::new(log.clone()).with_apply_duration(Duration::from_secs(3));
    let orchestrator = Arc::new(orchestrator(backend, engine, WINDOW));

    let a = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.run(&org("acme")).await }
    });
    let b = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.run(&org("other")).await }
    });
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    // Each run is a contiguous block: init, lease, apply start, apply finish
    let events = log.events();
    assert_eq!(events.len(), 8);
    for run in events.chunks(4) {
        let leased_key = match &run[1] {
            Event::LeaseIssued { access_key, .. } => access_key.clone(),
            other => panic!("Expected lease after init, got {:?}", other),
        };
        assert_eq!(run[0], Event::Init);
        match &run[2] {
            Event::ApplyStarted { access_key, .. } => {
                assert_eq!(access_key.as_deref(), Some(leased_key.as_str()))
            }
            other => panic!("Expected apply start, got {:?}", other),
        }
        assert_eq!(
            run[3],
            Event::ApplyFinished {
                access_key: Some(leased_key)
            }
        );
    }
}

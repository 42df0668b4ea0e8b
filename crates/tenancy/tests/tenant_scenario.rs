//! End-to-end adaptation of process-lifecycle components to one tenant.
//!
//! Exercises the public API only: registration, conversion with the default
//! configuration, and a full tenant activation and termination.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rstest::{fixture, rstest};
use tokio_util::sync::CancellationToken;

use tenancy::{
    AssignableRegistration, Candidate, CandidateSet, ComponentError, Config, GraphRewriter,
    HostedLifecycleService, HostedService, LifecycleError, Phase, RemovingContext,
    ServiceCollection, ServiceProvider, TenantEvents, TenantLifecycleRegistration,
    TenantSettings,
};

type Journal = Arc<Mutex<Vec<&'static str>>>;

#[fixture]
fn journal() -> Journal {
    Journal::default()
}

fn note(journal: &Journal, entry: &'static str) {
    journal.lock().expect("journal mutex poisoned").push(entry);
}

fn entries(journal: &Journal) -> Vec<&'static str> {
    journal.lock().expect("journal mutex poisoned").clone()
}

/// Basic component: start and stop only.
struct Ingest {
    journal: Journal,
}

#[async_trait]
impl HostedService for Ingest {
    async fn start(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        note(&self.journal, "ingest:start");
        Ok(())
    }

    async fn stop(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        note(&self.journal, "ingest:stop");
        Ok(())
    }
}

/// Extended component with every hook.
struct Indexer {
    journal: Journal,
    refuse_start: bool,
}

#[async_trait]
impl HostedService for Indexer {
    async fn start(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        if self.refuse_start {
            return Err(ComponentError::new("index store unavailable"));
        }
        note(&self.journal, "indexer:start");
        Ok(())
    }

    async fn stop(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        note(&self.journal, "indexer:stop");
        Ok(())
    }

    fn as_lifecycle(&self) -> Option<&dyn HostedLifecycleService> {
        Some(self)
    }
}

#[async_trait]
impl HostedLifecycleService for Indexer {
    async fn starting(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        note(&self.journal, "indexer:starting");
        Ok(())
    }

    async fn started(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        note(&self.journal, "indexer:started");
        Ok(())
    }

    async fn stopping(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        note(&self.journal, "indexer:stopping");
        Ok(())
    }

    async fn stopped(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        note(&self.journal, "indexer:stopped");
        Ok(())
    }
}

fn tenant_services(journal: &Journal, refuse_start: bool) -> ServiceCollection {
    let ingest_journal = Arc::clone(journal);
    let indexer_journal = Arc::clone(journal);
    let mut services = ServiceCollection::new();
    services.add_instance(Arc::new(TenantSettings::new("acme")));
    services.add_hosted_service::<Ingest, _>(move |_: &ServiceProvider| {
        Ok(Ingest {
            journal: Arc::clone(&ingest_journal),
        })
    });
    services.add_hosted_lifecycle_service::<Indexer, _>(move |_: &ServiceProvider| {
        Ok(Indexer {
            journal: Arc::clone(&indexer_journal),
            refuse_start,
        })
    });
    services
}

fn participants(mut services: ServiceCollection) -> Vec<Arc<dyn TenantEvents>> {
    let report = services
        .convert_hosted_services(&GraphRewriter::from_config(&Config::default()))
        .expect("no conflicting rules");
    assert_eq!(report.rewritten.len(), 2);
    services
        .build()
        .get_all::<dyn TenantEvents>()
        .expect("tenant participants resolve")
}

#[rstest]
#[tokio::test]
async fn tenant_drives_components_through_a_full_cycle(journal: Journal) {
    let events = participants(tenant_services(&journal, false));

    for participant in &events {
        participant.activating().await.expect("activating");
    }
    for participant in &events {
        participant.activated().await.expect("activated");
    }
    for participant in &events {
        participant.terminating().await.expect("terminating");
    }
    for participant in &events {
        participant.terminated().await.expect("terminated");
    }

    assert_eq!(
        entries(&journal),
        vec![
            "indexer:starting",
            "ingest:start",
            "indexer:start",
            "indexer:started",
            "indexer:stopping",
            "ingest:stop",
            "indexer:stop",
            "indexer:stopped",
        ]
    );
}

#[rstest]
#[tokio::test]
async fn removal_stops_running_components(journal: Journal) {
    let events = participants(tenant_services(&journal, false));
    let context = RemovingContext::new("acme", false);

    for participant in &events {
        participant.activated().await.expect("activated");
    }
    for participant in &events {
        participant.removing(&context).await.expect("removing");
    }
    for participant in &events {
        participant.dispose().await.expect("dispose");
    }

    let recorded = entries(&journal);
    assert_eq!(recorded.iter().filter(|e| **e == "ingest:stop").count(), 1);
    assert_eq!(recorded.iter().filter(|e| **e == "indexer:stop").count(), 1);
    assert_eq!(recorded.last(), Some(&"indexer:stopped"));
}

#[rstest]
#[tokio::test]
async fn component_failure_names_tenant_and_phase(journal: Journal) {
    let events = participants(tenant_services(&journal, true));
    let indexer = events.last().expect("indexer participant");

    let error = indexer.activated().await.expect_err("start is refused");

    match &error {
        LifecycleError::Component { tenant, phase, .. } => {
            assert_eq!(tenant, "acme");
            assert_eq!(*phase, Phase::Start);
        }
        LifecycleError::Disposed { .. } => panic!("unexpected disposal: {error}"),
    }
    assert!(error.to_string().contains("Indexer"), "{error}");
}

/// Registered through the registrar rather than directly.
#[derive(Default)]
struct Heartbeat;

#[async_trait]
impl HostedService for Heartbeat {
    async fn start(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        Ok(())
    }

    async fn stop(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        Ok(())
    }
}

#[test]
fn registrar_candidates_are_converted() {
    let set = CandidateSet::new().with(Candidate::<Heartbeat>::from_default().hosted_service());
    let mut services = ServiceCollection::new();
    services.add_singleton_assignable_to::<dyn HostedService>(&set);

    let report = services
        .convert_hosted_services(&GraphRewriter::from_config(&Config::default()))
        .expect("no conflicting rules");

    assert_eq!(report.rewritten.len(), 1);
    let provider = services.build();
    assert!(provider.get_required::<Heartbeat>().is_ok());
    assert!(provider.get_required::<dyn HostedService>().is_err());
    assert_eq!(
        provider
            .get_all::<dyn TenantEvents>()
            .expect("participants")
            .len(),
        1
    );
}

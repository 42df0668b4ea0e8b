//! Crate-level end-to-end and BDD tests.

use std::sync::Arc;

use crate::registrar::{AssignableRegistration, Candidate, CandidateSet};
use crate::registry::{ServiceCollection, ServiceProvider};
use crate::rewriter::{Eligibility, GraphRewriter, TenantLifecycleRegistration};
use crate::tenant::{RemovingContext, TenantEvents, TenantSettings};
use crate::{Config, HostedService};

use self::support::{CallLog, RecordingService, entries};

pub(crate) mod support;

fn recording(label: &'static str, log: &CallLog) -> Candidate<RecordingService> {
    let log = log.clone();
    Candidate::new(move |_: &ServiceProvider| Ok(RecordingService::new(label, log.clone())))
}

#[tokio::test]
async fn registered_candidates_follow_one_tenant() {
    let log = CallLog::default();
    let set = CandidateSet::new().with(recording("worker", &log).hosted_lifecycle_service());
    let cache_log = log.clone();
    let mut services = ServiceCollection::new();
    services.add_instance(Arc::new(TenantSettings::new("acme")));
    services.add_singleton_assignable_to::<dyn HostedService>(&set);
    services.add_hosted_service::<RecordingService, _>(move |_: &ServiceProvider| {
        Ok(RecordingService::new("cache", cache_log.clone()))
    });

    let config = Config {
        reserved_namespaces: vec!["tenancy::adapter".to_owned()],
        ..Config::default()
    };
    let report = services
        .convert_hosted_services(&GraphRewriter::from_config(&config))
        .expect("rewrite");
    assert_eq!(report.rewritten.len(), 2);

    let provider = services.build();
    let participants = provider.get_all::<dyn TenantEvents>().expect("participants");
    assert_eq!(participants.len(), 2);

    for participant in &participants {
        participant.activating().await.expect("activating");
    }
    for participant in &participants {
        participant.activated().await.expect("activated");
    }
    let removal = RemovingContext::new("acme", true);
    for participant in participants.iter().rev() {
        participant.removing(&removal).await.expect("removing");
    }
    for participant in participants.iter().rev() {
        participant.dispose().await.expect("dispose");
    }

    let mut expected = entries("worker", &["starting", "start", "started"]);
    expected.extend(entries("cache", &["start", "stop"]));
    expected.extend(entries("worker", &["stopping", "stop", "stopped"]));
    expected.extend(entries("cache", &["release", "release_async"]));
    expected.extend(entries("worker", &["release", "release_async"]));
    assert_eq!(log.calls(), expected);
}

#[test]
fn adaptation_layer_is_never_wrapped_by_default() {
    let log = CallLog::default();
    let mut services = ServiceCollection::new();
    services.add_hosted_service::<RecordingService, _>(move |_: &ServiceProvider| {
        Ok(RecordingService::new("internal", log.clone()))
    });

    let report = services
        .convert_hosted_services(&GraphRewriter::new(Eligibility::default()))
        .expect("rewrite");

    assert!(report.is_empty());
    assert_eq!(report.reserved.len(), 1);
}

//! Unit tests for candidate registration.

use std::ptr;
use std::sync::Arc;

use async_trait::async_trait;
use rstest::{fixture, rstest};
use tokio_util::sync::CancellationToken;

use super::*;
use crate::adapter::LifecycleShape;
use crate::component::ComponentError;

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

trait Named: Send + Sync {
    fn name(&self) -> &'static str;
}

#[derive(Default)]
struct Alpha;

impl Greeter for Alpha {
    fn greet(&self) -> String {
        "alpha".to_owned()
    }
}

impl Named for Alpha {
    fn name(&self) -> &'static str {
        "alpha"
    }
}

#[derive(Default)]
struct Bravo;

impl Greeter for Bravo {
    fn greet(&self) -> String {
        "bravo".to_owned()
    }
}

#[derive(Default)]
struct Charlie;

impl Named for Charlie {
    fn name(&self) -> &'static str {
        "charlie"
    }
}

#[derive(Default)]
struct Worker;

#[async_trait]
impl HostedService for Worker {
    async fn start(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        Ok(())
    }

    async fn stop(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        Ok(())
    }

    fn as_lifecycle(&self) -> Option<&dyn HostedLifecycleService> {
        Some(self)
    }
}

#[async_trait]
impl HostedLifecycleService for Worker {
    async fn starting(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        Ok(())
    }

    async fn started(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        Ok(())
    }

    async fn stopping(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        Ok(())
    }

    async fn stopped(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        Ok(())
    }
}

/// Candidates deliberately listed out of name order.
#[fixture]
fn candidates() -> CandidateSet {
    CandidateSet::new()
        .with(Candidate::<Charlie>::from_default().implements::<dyn Named>(|it| it))
        .with(Candidate::<Bravo>::from_default().implements::<dyn Greeter>(|it| it))
        .with(
            Candidate::<Alpha>::from_default()
                .implements::<dyn Named>(|it| it)
                .implements::<dyn Greeter>(|it| it)
                .implements::<dyn Named>(|it| it),
        )
}

fn layout(services: &ServiceCollection) -> Vec<(TypeKey, TypeKey)> {
    services
        .iter()
        .map(|descriptor| (descriptor.capability(), descriptor.implementation()))
        .collect()
}

fn same_instance<A: ?Sized, B: ?Sized>(left: &Arc<A>, right: &Arc<B>) -> bool {
    ptr::addr_eq(Arc::as_ptr(left), Arc::as_ptr(right))
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[rstest]
fn registers_concrete_then_sorted_capabilities(candidates: CandidateSet) {
    let mut services = ServiceCollection::new();
    services.add_singleton_assignable_to::<dyn Greeter>(&candidates);

    let alpha = TypeKey::of::<Alpha>();
    let bravo = TypeKey::of::<Bravo>();
    assert_eq!(
        layout(&services),
        vec![
            (alpha, alpha),
            (TypeKey::of::<dyn Greeter>(), alpha),
            (TypeKey::of::<dyn Named>(), alpha),
            (bravo, bravo),
            (TypeKey::of::<dyn Greeter>(), bravo),
        ]
    );
    assert!(services.iter().all(|d| d.lifetime() == Lifetime::Singleton));
}

#[rstest]
fn registration_is_deterministic(candidates: CandidateSet) {
    let mut first = ServiceCollection::new();
    first.add_transient_assignable_to::<dyn Named>(&candidates);
    let mut second = ServiceCollection::new();
    second.add_transient_assignable_to::<dyn Named>(&candidates);

    assert_eq!(layout(&first), layout(&second));
    assert_eq!(first.len(), 5);
}

#[test]
fn candidates_without_target_capability_are_skipped() {
    let set = CandidateSet::new()
        .with(Candidate::<Charlie>::from_default().implements::<dyn Named>(|it| it));
    let mut services = ServiceCollection::new();
    services.add_scoped_assignable_to::<dyn Greeter>(&set);

    assert!(services.is_empty());
    assert_eq!(set.len(), 1);
}

#[test]
fn capabilities_are_sorted_and_unique() {
    let candidate = Candidate::<Alpha>::from_default()
        .implements::<dyn Named>(|it| it)
        .implements::<dyn Greeter>(|it| it)
        .implements::<dyn Named>(|it| it);

    assert_eq!(
        candidate.capabilities(),
        vec![TypeKey::of::<dyn Greeter>(), TypeKey::of::<dyn Named>()]
    );
}

// ---------------------------------------------------------------------------
// Sharing
// ---------------------------------------------------------------------------

#[rstest]
fn singleton_is_shared_across_capabilities(candidates: CandidateSet) {
    let mut services = ServiceCollection::new();
    services.add_singleton_assignable_to::<dyn Greeter>(&candidates);
    let provider = services.build();

    let concrete = provider.get_required::<Alpha>().expect("alpha");
    let named = provider.get_required::<dyn Named>().expect("named");
    let greeters = provider.get_all::<dyn Greeter>().expect("greeters");

    assert!(same_instance(&concrete, &named));
    let first_greeter = greeters.first().expect("alpha greeter");
    assert!(same_instance(&concrete, first_greeter));
    assert_eq!(
        greeters.iter().map(|greeter| greeter.greet()).collect::<Vec<_>>(),
        vec!["alpha".to_owned(), "bravo".to_owned()]
    );

    let scope = provider.create_scope();
    let from_scope = scope.get_required::<dyn Greeter>().expect("greeter");
    assert_eq!(from_scope.greet(), "bravo");
    assert!(same_instance(
        &from_scope,
        greeters.last().expect("bravo greeter")
    ));
}

#[rstest]
fn scoped_instances_are_shared_within_a_scope_only(candidates: CandidateSet) {
    let mut services = ServiceCollection::new();
    services.add_scoped_assignable_to::<dyn Greeter>(&candidates);
    let provider = services.build();
    let first = provider.create_scope();
    let second = provider.create_scope();

    let concrete = first.get_required::<Alpha>().expect("alpha");
    let named = first.get_required::<dyn Named>().expect("named");
    let elsewhere = second.get_required::<dyn Named>().expect("named");

    assert!(same_instance(&concrete, &named));
    assert!(!same_instance(&concrete, &elsewhere));
    assert_eq!(elsewhere.name(), "alpha");
}

#[rstest]
fn transient_instances_are_fresh(candidates: CandidateSet) {
    let mut services = ServiceCollection::new();
    services.add_transient_assignable_to::<dyn Greeter>(&candidates);
    let provider = services.build();

    let concrete = provider.get_required::<Alpha>().expect("alpha");
    let named = provider.get_required::<dyn Named>().expect("named");

    assert!(!same_instance(&concrete, &named));
}

#[test]
fn candidates_may_resolve_dependencies() {
    struct Greeting(String);

    impl Greeter for Greeting {
        fn greet(&self) -> String {
            self.0.clone()
        }
    }

    let set = CandidateSet::new().with(
        Candidate::new(|provider: &ServiceProvider| {
            let bravo = provider.get_required::<Bravo>()?;
            Ok(Greeting(format!("hello {}", bravo.greet())))
        })
        .implements::<dyn Greeter>(|it| it),
    );
    let mut services = ServiceCollection::new();
    services.add_instance(Arc::new(Bravo));
    services.add_singleton_assignable_to::<dyn Greeter>(&set);
    let provider = services.build();

    let greeting = provider.get_required::<dyn Greeter>().expect("greeting");
    assert_eq!(greeting.greet(), "hello bravo");
}

#[test]
fn concrete_target_registers_candidate_without_self_forwarding() {
    let set = CandidateSet::new().with(
        Candidate::<Bravo>::from_default()
            .implements::<Bravo>(|it| it)
            .implements::<dyn Greeter>(|it| it),
    );
    let mut services = ServiceCollection::new();
    services.add_singleton_assignable_to::<Bravo>(&set);

    let bravo = TypeKey::of::<Bravo>();
    assert_eq!(
        layout(&services),
        vec![(bravo, bravo), (TypeKey::of::<dyn Greeter>(), bravo)]
    );
    let provider = services.build();
    let concrete = provider.get_required::<Bravo>().expect("bravo");
    assert_eq!(concrete.greet(), "bravo");
}

// ---------------------------------------------------------------------------
// Lifecycle bindings
// ---------------------------------------------------------------------------

#[rstest]
#[case::basic(Candidate::<Worker>::from_default().hosted_service(), LifecycleShape::Basic, 2)]
#[case::extended(
    Candidate::<Worker>::from_default().hosted_lifecycle_service(),
    LifecycleShape::Extended,
    3
)]
fn hosted_capability_carries_binding(
    #[case] candidate: Candidate<Worker>,
    #[case] shape: LifecycleShape,
    #[case] registrations: usize,
) {
    let set = CandidateSet::new().with(candidate);
    let mut services = ServiceCollection::new();
    services.add_singleton_assignable_to::<dyn HostedService>(&set);

    assert_eq!(services.len(), registrations);
    let hosted: Vec<&ServiceDescriptor> = services
        .iter()
        .filter(|d| d.capability() == TypeKey::of::<dyn HostedService>())
        .collect();
    assert_eq!(hosted.len(), 1);
    let binding = hosted
        .first()
        .and_then(|d| d.binding())
        .expect("hosted registration has a binding");
    assert_eq!(binding.shape(), shape);
    assert_eq!(binding.component(), TypeKey::of::<Worker>());
    assert!(
        services
            .iter()
            .filter(|d| d.capability() != TypeKey::of::<dyn HostedService>())
            .all(|d| d.binding().is_none())
    );
}

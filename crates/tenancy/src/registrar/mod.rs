//! Registration of candidate types under every capability they expose.
//!
//! Callers describe each candidate once with a [`Candidate`] builder: how to
//! construct it and which capabilities it implements. Registering a
//! [`CandidateSet`] against a target capability adds, for every candidate
//! exposing that capability, one registration of the concrete type followed
//! by one forwarding registration per exposed capability. Forwarding
//! registrations resolve the concrete registration, so a singleton or
//! scoped candidate is the same instance behind every capability.
//!
//! Output order is a pure function of the candidate set: candidates are
//! processed by type name and capabilities by name, with duplicates dropped.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::adapter::LifecycleBinding;
use crate::component::{HostedLifecycleService, HostedService};
use crate::error::ResolveError;
use crate::registry::{
    Factory, Instance, Lifetime, ServiceCollection, ServiceDescriptor, ServiceProvider, TypeKey,
};

/// Log target for registrar operations.
const REGISTRAR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registrar");

type Construct<T> = Arc<dyn Fn(&ServiceProvider) -> Result<T, ResolveError> + Send + Sync>;

type Upcast<T> = Arc<dyn Fn(Arc<T>) -> Instance + Send + Sync>;

struct Exposure<T> {
    capability: TypeKey,
    upcast: Upcast<T>,
}

impl<T> Clone for Exposure<T> {
    fn clone(&self) -> Self {
        Self {
            capability: self.capability,
            upcast: Arc::clone(&self.upcast),
        }
    }
}

/// Description of one concrete type offered for registration.
pub struct Candidate<T> {
    construct: Construct<T>,
    exposures: Vec<Exposure<T>>,
    binding: Option<LifecycleBinding>,
}

impl<T: Send + Sync + 'static> Candidate<T> {
    /// Describes a candidate built by `construct`.
    #[must_use]
    pub fn new<F>(construct: F) -> Self
    where
        F: Fn(&ServiceProvider) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        Self {
            construct: Arc::new(construct),
            exposures: Vec::new(),
            binding: None,
        }
    }

    /// Describes a candidate built with [`Default`].
    #[must_use]
    pub fn from_default() -> Self
    where
        T: Default,
    {
        Self::new(|_: &ServiceProvider| Ok(T::default()))
    }

    /// Declares that the candidate implements capability `I`.
    ///
    /// `upcast` is usually the identity closure `|it| it`, which coerces the
    /// concrete handle to the trait object.
    #[must_use]
    pub fn implements<I>(mut self, upcast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.exposures.push(Exposure {
            capability: TypeKey::of::<I>(),
            upcast: Arc::new(move |component: Arc<T>| Instance::new(upcast(component))),
        });
        self
    }

    /// Declares that the candidate is a [`HostedService`].
    ///
    /// The lifecycle registration remembers the concrete type so it can be
    /// adapted later through the basic contract.
    #[must_use]
    pub fn hosted_service(mut self) -> Self
    where
        T: HostedService,
    {
        self.binding = Some(LifecycleBinding::basic::<T, _>(
            |provider: &ServiceProvider| provider.get_required::<T>(),
        ));
        self.implements::<dyn HostedService>(|it| it)
    }

    /// Declares that the candidate is a [`HostedLifecycleService`], and
    /// therefore also a [`HostedService`].
    #[must_use]
    pub fn hosted_lifecycle_service(mut self) -> Self
    where
        T: HostedLifecycleService,
    {
        self.binding = Some(LifecycleBinding::extended::<T, _>(
            |provider: &ServiceProvider| provider.get_required::<T>(),
        ));
        self.implements::<dyn HostedLifecycleService>(|it| it)
            .implements::<dyn HostedService>(|it| it)
    }

    /// Capabilities declared so far, sorted by name without duplicates.
    ///
    /// The concrete type itself is never listed; it is always registered.
    #[must_use]
    pub fn capabilities(&self) -> Vec<TypeKey> {
        self.sorted_exposures()
            .iter()
            .map(|exposure| exposure.capability)
            .collect()
    }

    fn sorted_exposures(&self) -> Vec<Exposure<T>> {
        let mut exposures = self.exposures.clone();
        exposures.sort_by_key(|exposure| exposure.capability);
        exposures.dedup_by_key(|exposure| exposure.capability);
        exposures.retain(|exposure| exposure.capability != TypeKey::of::<T>());
        exposures
    }
}

impl<T> fmt::Debug for Candidate<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Candidate")
            .field("implementation", &std::any::type_name::<T>())
            .field(
                "capabilities",
                &self
                    .exposures
                    .iter()
                    .map(|exposure| exposure.capability)
                    .collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

trait ErasedCandidate: Send + Sync {
    fn implementation(&self) -> TypeKey;

    fn exposes(&self, capability: TypeKey) -> bool;

    fn register(&self, lifetime: Lifetime, services: &mut ServiceCollection);
}

impl<T: Send + Sync + 'static> ErasedCandidate for Candidate<T> {
    fn implementation(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn exposes(&self, capability: TypeKey) -> bool {
        capability == TypeKey::of::<T>()
            || self
                .exposures
                .iter()
                .any(|exposure| exposure.capability == capability)
    }

    fn register(&self, lifetime: Lifetime, services: &mut ServiceCollection) {
        let implementation = TypeKey::of::<T>();
        let construct = Arc::clone(&self.construct);
        let concrete: Factory = Arc::new(move |provider: &ServiceProvider| {
            construct(provider).map(|component| Instance::new(Arc::new(component)))
        });
        services.add(ServiceDescriptor::new(
            implementation,
            implementation,
            lifetime,
            concrete,
        ));

        for exposure in self.sorted_exposures() {
            let upcast = exposure.upcast;
            let forward: Factory = Arc::new(move |provider: &ServiceProvider| {
                provider.get_required::<T>().map(upcast.as_ref())
            });
            let mut descriptor =
                ServiceDescriptor::new(exposure.capability, implementation, lifetime, forward);
            if exposure.capability == TypeKey::of::<dyn HostedService>()
                && let Some(binding) = &self.binding
            {
                descriptor = descriptor.with_binding(binding.clone());
            }
            debug!(
                target: REGISTRAR_TARGET,
                implementation = %implementation,
                capability = %exposure.capability,
                lifetime = %lifetime,
                "registered forwarding capability"
            );
            services.add(descriptor);
        }
    }
}

/// Explicit set of candidates offered to the registrar.
#[derive(Default)]
pub struct CandidateSet {
    candidates: Vec<Box<dyn ErasedCandidate>>,
}

impl CandidateSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a candidate, returning the set for chaining.
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, candidate: Candidate<T>) -> Self {
        self.push(candidate);
        self
    }

    /// Adds a candidate.
    pub fn push<T: Send + Sync + 'static>(&mut self, candidate: Candidate<T>) {
        self.candidates.push(Box::new(candidate));
    }

    /// Number of candidates.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Returns `true` when the set has no candidates.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    fn exposing(&self, capability: TypeKey) -> Vec<&dyn ErasedCandidate> {
        let mut selected: Vec<&dyn ErasedCandidate> = self
            .candidates
            .iter()
            .map(Box::as_ref)
            .filter(|candidate| candidate.exposes(capability))
            .collect();
        selected.sort_by_key(|candidate| candidate.implementation());
        selected
    }
}

impl fmt::Debug for CandidateSet {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_list()
            .entries(self.candidates.iter().map(|candidate| candidate.implementation()))
            .finish()
    }
}

/// Registrar entry points on [`ServiceCollection`].
pub trait AssignableRegistration {
    /// Registers every candidate exposing capability `I` under `lifetime`.
    fn add_assignable_to<I: ?Sized + 'static>(
        &mut self,
        lifetime: Lifetime,
        candidates: &CandidateSet,
    ) -> &mut Self;

    /// Registers every candidate exposing `I` as a singleton.
    fn add_singleton_assignable_to<I: ?Sized + 'static>(
        &mut self,
        candidates: &CandidateSet,
    ) -> &mut Self {
        self.add_assignable_to::<I>(Lifetime::Singleton, candidates)
    }

    /// Registers every candidate exposing `I` as scoped.
    fn add_scoped_assignable_to<I: ?Sized + 'static>(
        &mut self,
        candidates: &CandidateSet,
    ) -> &mut Self {
        self.add_assignable_to::<I>(Lifetime::Scoped, candidates)
    }

    /// Registers every candidate exposing `I` as transient.
    fn add_transient_assignable_to<I: ?Sized + 'static>(
        &mut self,
        candidates: &CandidateSet,
    ) -> &mut Self {
        self.add_assignable_to::<I>(Lifetime::Transient, candidates)
    }
}

impl AssignableRegistration for ServiceCollection {
    fn add_assignable_to<I: ?Sized + 'static>(
        &mut self,
        lifetime: Lifetime,
        candidates: &CandidateSet,
    ) -> &mut Self {
        let capability = TypeKey::of::<I>();
        for candidate in candidates.exposing(capability) {
            debug!(
                target: REGISTRAR_TARGET,
                implementation = %candidate.implementation(),
                capability = %capability,
                lifetime = %lifetime,
                "registering candidate"
            );
            candidate.register(lifetime, self);
        }
        self
    }
}

#[cfg(test)]
mod tests;

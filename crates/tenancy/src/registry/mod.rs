//! Ordered service registry and the provider that resolves it.
//!
//! A [`ServiceCollection`] records registrations in insertion order. Each
//! [`ServiceDescriptor`] names the capability it answers for, the concrete
//! implementation behind it, a [`Lifetime`] controlling how instances are
//! shared, and the factory that builds the instance. Building the collection
//! yields a [`ServiceProvider`].
//!
//! The registry resolves by capability only. It performs no constructor
//! injection; factories pull their own dependencies from the provider they
//! are handed.

mod key;
mod provider;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub use self::key::TypeKey;
pub use self::provider::ServiceProvider;

use crate::adapter::LifecycleBinding;
use crate::component::{HostedLifecycleService, HostedService};
use crate::error::ResolveError;

/// Sharing policy for resolved instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// One instance for the whole provider tree.
    Singleton,
    /// One instance per scope.
    Scoped,
    /// A fresh instance on every resolution.
    Transient,
}

impl fmt::Display for Lifetime {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Singleton => "singleton",
            Self::Scoped => "scoped",
            Self::Transient => "transient",
        };
        formatter.write_str(label)
    }
}

/// Type-erased handle to a resolved `Arc<I>`.
#[derive(Clone)]
pub struct Instance(Arc<dyn Any + Send + Sync>);

impl Instance {
    /// Erases `value` so it can be stored in a provider cache.
    #[must_use]
    pub fn new<I: ?Sized + Send + Sync + 'static>(value: Arc<I>) -> Self {
        let erased: Arc<dyn Any + Send + Sync> = Arc::new(value);
        Self(erased)
    }

    /// Recovers the `Arc<I>` stored by [`Instance::new`].
    #[must_use]
    pub fn downcast<I: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<I>> {
        self.0.downcast_ref::<Arc<I>>().cloned()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Instance").finish_non_exhaustive()
    }
}

/// Outcome of running a registration's factory.
pub type Resolved = Result<Instance, ResolveError>;

/// Builds an instance for a registration.
pub type Factory = Arc<dyn Fn(&ServiceProvider) -> Resolved + Send + Sync>;

/// One registration in a [`ServiceCollection`].
#[derive(Clone)]
pub struct ServiceDescriptor {
    capability: TypeKey,
    implementation: TypeKey,
    lifetime: Lifetime,
    factory: Factory,
    binding: Option<LifecycleBinding>,
}

impl ServiceDescriptor {
    /// Creates a registration from its parts.
    #[must_use]
    pub fn new(
        capability: TypeKey,
        implementation: TypeKey,
        lifetime: Lifetime,
        factory: Factory,
    ) -> Self {
        Self {
            capability,
            implementation,
            lifetime,
            factory,
            binding: None,
        }
    }

    /// Attaches the lifecycle binding captured for the concrete component.
    #[must_use]
    pub fn with_binding(mut self, binding: LifecycleBinding) -> Self {
        self.binding = Some(binding);
        self
    }

    /// Capability this registration answers for.
    #[must_use]
    pub const fn capability(&self) -> TypeKey {
        self.capability
    }

    /// Concrete type behind the registration.
    #[must_use]
    pub const fn implementation(&self) -> TypeKey {
        self.implementation
    }

    /// Sharing policy.
    #[must_use]
    pub const fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Factory producing the instance.
    #[must_use]
    pub const fn factory(&self) -> &Factory {
        &self.factory
    }

    /// Lifecycle binding, when the concrete component type was known at
    /// registration time.
    #[must_use]
    pub const fn binding(&self) -> Option<&LifecycleBinding> {
        self.binding.as_ref()
    }

    /// Returns `true` when both descriptors are copies of one registration.
    #[must_use]
    pub fn same_registration(&self, other: &Self) -> bool {
        self.capability == other.capability
            && self.lifetime == other.lifetime
            && Arc::ptr_eq(&self.factory, &other.factory)
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ServiceDescriptor")
            .field("capability", &self.capability)
            .field("implementation", &self.implementation)
            .field("lifetime", &self.lifetime)
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

/// Insertion-ordered set of registrations.
#[derive(Debug, Clone, Default)]
pub struct ServiceCollection {
    descriptors: Vec<ServiceDescriptor>,
}

impl ServiceCollection {
    /// Creates an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// Appends a registration.
    pub fn add(&mut self, descriptor: ServiceDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Registers an existing value as a singleton under its own type.
    pub fn add_instance<T: Send + Sync + 'static>(&mut self, value: Arc<T>) -> &mut Self {
        self.add_instance_as::<T, T>(value, |it| it)
    }

    /// Registers an existing `T` as a singleton under capability `I`.
    ///
    /// `upcast` converts the value to the capability, typically an unsizing
    /// coercion such as `|it| it` into `Arc<dyn HostedService>`. The
    /// registration records `T` as its implementation.
    pub fn add_instance_as<I, T>(
        &mut self,
        value: Arc<T>,
        upcast: fn(Arc<T>) -> Arc<I>,
    ) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        let instance = Instance::new(upcast(value));
        let factory: Factory = Arc::new(move |_: &ServiceProvider| -> Resolved {
            Ok(instance.clone())
        });
        self.add(ServiceDescriptor::new(
            TypeKey::of::<I>(),
            TypeKey::of::<T>(),
            Lifetime::Singleton,
            factory,
        ))
    }

    /// Registers a factory for capability `I` implemented by `T`.
    ///
    /// `T` only names the implementation; the factory decides what is built.
    pub fn add_factory<I, T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        T: ?Sized + 'static,
        F: Fn(&ServiceProvider) -> Result<Arc<I>, ResolveError> + Send + Sync + 'static,
    {
        let erased: Factory =
            Arc::new(move |provider: &ServiceProvider| factory(provider).map(Instance::new));
        self.add(ServiceDescriptor::new(
            TypeKey::of::<I>(),
            TypeKey::of::<T>(),
            lifetime,
            erased,
        ))
    }

    /// Registers `T` as a singleton [`HostedService`].
    ///
    /// The registration remembers that `T` only implements the basic
    /// contract so it can later be adapted without losing the concrete type.
    pub fn add_hosted_service<T, F>(&mut self, construct: F) -> &mut Self
    where
        T: HostedService + 'static,
        F: Fn(&ServiceProvider) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        let shared = Arc::new(construct);
        let build = Arc::clone(&shared);
        let binding = LifecycleBinding::basic::<T, _>(move |provider: &ServiceProvider| {
            build(provider).map(Arc::new)
        });
        self.add_hosted::<T>(shared, binding)
    }

    /// Registers `T` as a singleton [`HostedService`] that also implements
    /// the extended [`HostedLifecycleService`] hooks.
    pub fn add_hosted_lifecycle_service<T, F>(&mut self, construct: F) -> &mut Self
    where
        T: HostedLifecycleService + 'static,
        F: Fn(&ServiceProvider) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        let shared = Arc::new(construct);
        let build = Arc::clone(&shared);
        let binding =
            LifecycleBinding::extended::<T, _>(move |provider: &ServiceProvider| {
                build(provider).map(Arc::new)
            });
        self.add_hosted::<T>(shared, binding)
    }

    fn add_hosted<T: HostedService + 'static>(
        &mut self,
        construct: Arc<dyn Fn(&ServiceProvider) -> Result<T, ResolveError> + Send + Sync>,
        binding: LifecycleBinding,
    ) -> &mut Self {
        let factory: Factory = Arc::new(move |provider: &ServiceProvider| -> Resolved {
            let component: Arc<dyn HostedService> = Arc::new(construct(provider)?);
            Ok(Instance::new(component))
        });
        self.add(
            ServiceDescriptor::new(
                TypeKey::of::<dyn HostedService>(),
                TypeKey::of::<T>(),
                Lifetime::Singleton,
                factory,
            )
            .with_binding(binding),
        )
    }

    /// Keeps only the registrations matching `predicate`, preserving order.
    pub fn retain(&mut self, predicate: impl FnMut(&ServiceDescriptor) -> bool) -> &mut Self {
        self.descriptors.retain(predicate);
        self
    }

    /// Iterates over registrations in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, ServiceDescriptor> {
        self.descriptors.iter()
    }

    /// Registrations in insertion order.
    #[must_use]
    pub fn descriptors(&self) -> &[ServiceDescriptor] {
        &self.descriptors
    }

    /// Number of registrations.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Freezes the collection into a root provider.
    #[must_use]
    pub fn build(self) -> ServiceProvider {
        ServiceProvider::new(self.descriptors)
    }

    pub(crate) fn take(&mut self) -> Vec<ServiceDescriptor> {
        std::mem::take(&mut self.descriptors)
    }
}

impl<'a> IntoIterator for &'a ServiceCollection {
    type Item = &'a ServiceDescriptor;
    type IntoIter = std::slice::Iter<'a, ServiceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

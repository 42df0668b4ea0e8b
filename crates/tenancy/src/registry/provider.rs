//! Resolution of registrations with lifetime-aware caching.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Instance, Lifetime, ServiceDescriptor, TypeKey};
use crate::error::ResolveError;

/// Resolves capabilities from a frozen set of registrations.
///
/// The provider returned by [`ServiceCollection::build`] is the root scope.
/// Singletons are cached in the root and always constructed with the root
/// provider; scoped instances are cached in the scope that first resolved
/// them; transients are never cached. Cloning a provider yields a handle to
/// the same scope.
///
/// [`ServiceCollection::build`]: super::ServiceCollection::build
#[derive(Clone)]
pub struct ServiceProvider {
    registrations: Arc<Registrations>,
    scope: Arc<ScopeCache>,
}

struct Registrations {
    descriptors: Vec<ServiceDescriptor>,
    root: Arc<ScopeCache>,
}

#[derive(Default)]
struct ScopeCache {
    instances: Mutex<HashMap<usize, Instance>>,
}

impl ScopeCache {
    fn lock(&self) -> MutexGuard<'_, HashMap<usize, Instance>> {
        self.instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self, index: usize) -> Option<Instance> {
        self.lock().get(&index).cloned()
    }

    /// Stores `created` unless another resolution got there first, returning
    /// whichever instance is cached.
    fn get_or_insert(&self, index: usize, created: Instance) -> Instance {
        self.lock().entry(index).or_insert(created).clone()
    }
}

impl ServiceProvider {
    pub(super) fn new(descriptors: Vec<ServiceDescriptor>) -> Self {
        let root = Arc::new(ScopeCache::default());
        Self {
            scope: Arc::clone(&root),
            registrations: Arc::new(Registrations { descriptors, root }),
        }
    }

    /// Opens a child scope sharing this provider's singletons.
    #[must_use]
    pub fn create_scope(&self) -> Self {
        Self {
            registrations: Arc::clone(&self.registrations),
            scope: Arc::new(ScopeCache::default()),
        }
    }

    /// Returns `true` when this provider is the root scope.
    #[must_use]
    pub fn is_root(&self) -> bool {
        Arc::ptr_eq(&self.scope, &self.registrations.root)
    }

    /// Resolves the last registration for capability `I`.
    ///
    /// # Errors
    ///
    /// Returns an error when the factory fails or produces a value of the
    /// wrong type.
    pub fn get<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<I>>, ResolveError> {
        let key = TypeKey::of::<I>();
        self.registrations
            .descriptors
            .iter()
            .enumerate()
            .rev()
            .find(|(_, descriptor)| descriptor.capability() == key)
            .map(|(index, descriptor)| self.resolve_as::<I>(index, descriptor))
            .transpose()
    }

    /// Resolves the last registration for capability `I`, failing when none
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotRegistered`] when `I` has no registration,
    /// or any error raised while building the instance.
    pub fn get_required<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<I>, ResolveError> {
        self.get::<I>()?.ok_or(ResolveError::NotRegistered {
            capability: TypeKey::of::<I>().name(),
        })
    }

    /// Resolves every registration for capability `I` in registration order.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while building an instance.
    pub fn get_all<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<I>>, ResolveError> {
        let key = TypeKey::of::<I>();
        self.registrations
            .descriptors
            .iter()
            .enumerate()
            .filter(|(_, descriptor)| descriptor.capability() == key)
            .map(|(index, descriptor)| self.resolve_as::<I>(index, descriptor))
            .collect()
    }

    fn root(&self) -> Self {
        Self {
            registrations: Arc::clone(&self.registrations),
            scope: Arc::clone(&self.registrations.root),
        }
    }

    fn resolve_as<I: ?Sized + Send + Sync + 'static>(
        &self,
        index: usize,
        descriptor: &ServiceDescriptor,
    ) -> Result<Arc<I>, ResolveError> {
        let instance = match descriptor.lifetime() {
            Lifetime::Singleton => self.root().cached(index, descriptor)?,
            Lifetime::Scoped => self.cached(index, descriptor)?,
            Lifetime::Transient => (descriptor.factory())(self)?,
        };
        instance
            .downcast::<I>()
            .ok_or(ResolveError::TypeMismatch {
                capability: descriptor.capability().name(),
                implementation: descriptor.implementation().name(),
            })
    }

    /// Builds through the factory without holding the cache lock so that
    /// factories may resolve further registrations from the same scope.
    fn cached(&self, index: usize, descriptor: &ServiceDescriptor) -> Result<Instance, ResolveError> {
        if let Some(found) = self.scope.get(index) {
            return Ok(found);
        }
        let created = (descriptor.factory())(self)?;
        Ok(self.scope.get_or_insert(index, created))
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ServiceProvider")
            .field("registrations", &self.registrations.descriptors.len())
            .field("root", &self.is_root())
            .finish()
    }
}

//! Recipes for building an adapter from a registration.

use std::fmt;
use std::sync::Arc;

use super::{
    BasicComponent, ErasedComponent, ErasedServiceAdapter, ExtendedComponent,
    HostedLifecycleServiceAdapter, HostedServiceAdapter, StopOrdering,
};
use crate::component::{HostedLifecycleService, HostedService};
use crate::error::ResolveError;
use crate::registry::{Factory, ServiceProvider, TypeKey};
use crate::tenant::TenantEvents;

/// Contract a lifecycle component was registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleShape {
    /// Start and stop only.
    Basic,
    /// Start and stop plus the four surrounding hooks.
    Extended,
    /// Registered without its concrete type; the hooks run when the
    /// component exposes them through `HostedService::as_lifecycle`.
    Detected,
}

/// Settings an adapter is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterOptions {
    /// Tenant the adapter serves, used for diagnostics.
    pub tenant: String,
    /// Policy applied to stop phases on an idle adapter.
    pub ordering: StopOrdering,
}

impl AdapterOptions {
    /// Creates options for `tenant` with the given stop ordering.
    #[must_use]
    pub fn new(tenant: impl Into<String>, ordering: StopOrdering) -> Self {
        Self {
            tenant: tenant.into(),
            ordering,
        }
    }
}

type Built = Result<Arc<dyn TenantEvents>, ResolveError>;

type AdapterBuilder = Arc<dyn Fn(&ServiceProvider, &AdapterOptions) -> Built + Send + Sync>;

/// How to wrap one registered lifecycle component in an adapter.
///
/// Bindings are captured where the concrete component type is statically
/// known, so the adapter built later is typed over that component rather
/// than over the erased contract.
#[derive(Clone)]
pub struct LifecycleBinding {
    shape: LifecycleShape,
    component: TypeKey,
    adapter: TypeKey,
    build: AdapterBuilder,
}

impl LifecycleBinding {
    /// Binds a component implementing only [`HostedService`].
    ///
    /// `resolve` produces the component each time an adapter is built.
    #[must_use]
    pub fn basic<T, F>(resolve: F) -> Self
    where
        T: HostedService + 'static,
        F: Fn(&ServiceProvider) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
    {
        let build: AdapterBuilder = Arc::new(
            move |provider: &ServiceProvider, options: &AdapterOptions| -> Built {
                let component = BasicComponent::new(resolve(provider)?);
                Ok(Arc::new(HostedServiceAdapter::new(component, options)))
            },
        );
        Self {
            shape: LifecycleShape::Basic,
            component: TypeKey::of::<T>(),
            adapter: TypeKey::of::<HostedServiceAdapter<T>>(),
            build,
        }
    }

    /// Binds a component implementing [`HostedLifecycleService`].
    #[must_use]
    pub fn extended<T, F>(resolve: F) -> Self
    where
        T: HostedLifecycleService + 'static,
        F: Fn(&ServiceProvider) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
    {
        let build: AdapterBuilder = Arc::new(
            move |provider: &ServiceProvider, options: &AdapterOptions| -> Built {
                let component = ExtendedComponent::new(resolve(provider)?);
                Ok(Arc::new(HostedLifecycleServiceAdapter::new(component, options)))
            },
        );
        Self {
            shape: LifecycleShape::Extended,
            component: TypeKey::of::<T>(),
            adapter: TypeKey::of::<HostedLifecycleServiceAdapter<T>>(),
            build,
        }
    }

    /// Binds a registration whose concrete type is only known by key.
    ///
    /// The component is taken from `factory` as an erased
    /// `Arc<dyn HostedService>`. Whether the extended hooks run is decided
    /// by the component itself once it is resolved.
    pub(crate) fn from_factory(component: TypeKey, factory: Factory) -> Self {
        let build: AdapterBuilder = Arc::new(
            move |provider: &ServiceProvider, options: &AdapterOptions| -> Built {
                let erased = factory(provider)?
                    .downcast::<dyn HostedService>()
                    .ok_or(ResolveError::TypeMismatch {
                        capability: TypeKey::of::<dyn HostedService>().name(),
                        implementation: component.name(),
                    })?;
                let adapter = ErasedServiceAdapter::new(ErasedComponent::new(erased), options)
                    .with_component_name(component.name());
                Ok(Arc::new(adapter))
            },
        );
        Self {
            shape: LifecycleShape::Detected,
            component,
            adapter: TypeKey::of::<ErasedServiceAdapter>(),
            build,
        }
    }

    /// Contract the component was registered with.
    #[must_use]
    pub const fn shape(&self) -> LifecycleShape {
        self.shape
    }

    /// Key of the wrapped component type.
    #[must_use]
    pub const fn component(&self) -> TypeKey {
        self.component
    }

    /// Key of the concrete adapter type.
    #[must_use]
    pub const fn adapter(&self) -> TypeKey {
        self.adapter
    }

    /// Resolves the component and wraps it in a fresh adapter.
    ///
    /// # Errors
    ///
    /// Returns any error raised while resolving the component.
    pub fn build(
        &self,
        provider: &ServiceProvider,
        options: &AdapterOptions,
    ) -> Result<Arc<dyn TenantEvents>, ResolveError> {
        (self.build)(provider, options)
    }
}

impl fmt::Debug for LifecycleBinding {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LifecycleBinding")
            .field("shape", &self.shape)
            .field("component", &self.component)
            .field("adapter", &self.adapter)
            .finish_non_exhaustive()
    }
}

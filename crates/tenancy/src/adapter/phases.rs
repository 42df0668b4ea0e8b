//! Uniform phase surface over basic and extended components.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::component::{ComponentError, HostedLifecycleService, HostedService};

/// Phases an adapter drives, used in diagnostics and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Hook before native start.
    PreStart,
    /// Native start.
    Start,
    /// Hook after native start.
    PostStart,
    /// Hook before native stop.
    PreStop,
    /// Native stop.
    Stop,
    /// Hook after native stop.
    PostStop,
    /// Resource release.
    Dispose,
}

impl fmt::Display for Phase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::PreStart => "pre-start",
            Self::Start => "start",
            Self::PostStart => "post-start",
            Self::PreStop => "pre-stop",
            Self::Stop => "stop",
            Self::PostStop => "post-stop",
            Self::Dispose => "dispose",
        };
        formatter.write_str(label)
    }
}

/// Operations an adapter can invoke on the component it wraps.
///
/// Hooks default to success so that shapes without them simply skip those
/// phases.
#[async_trait]
pub trait ComponentPhases: Send + Sync {
    /// Fully-qualified name of the wrapped component type.
    fn component_name(&self) -> &'static str;

    /// Hook run before native start.
    async fn pre_start(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Native start.
    async fn start(&self, cancellation: &CancellationToken) -> Result<(), ComponentError>;

    /// Hook run after native start.
    async fn post_start(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Hook run before native stop.
    async fn pre_stop(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Native stop.
    async fn stop(&self, cancellation: &CancellationToken) -> Result<(), ComponentError>;

    /// Hook run after native stop.
    async fn post_stop(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Drains both release paths of the component, if it has any.
    async fn release(&self);
}

/// Component implementing only [`HostedService`].
pub struct BasicComponent<T: ?Sized>(Arc<T>);

impl<T: ?Sized> BasicComponent<T> {
    /// Wraps a shared component.
    #[must_use]
    pub const fn new(component: Arc<T>) -> Self {
        Self(component)
    }

    /// Shared handle to the wrapped component.
    #[must_use]
    pub const fn inner(&self) -> &Arc<T> {
        &self.0
    }
}

#[async_trait]
impl<T: HostedService + ?Sized + 'static> ComponentPhases for BasicComponent<T> {
    fn component_name(&self) -> &'static str {
        type_name::<T>()
    }

    async fn start(&self, cancellation: &CancellationToken) -> Result<(), ComponentError> {
        self.0.start(cancellation).await
    }

    async fn stop(&self, cancellation: &CancellationToken) -> Result<(), ComponentError> {
        self.0.stop(cancellation).await
    }

    async fn release(&self) {
        release(self.0.as_ref()).await;
    }
}

/// Component implementing the extended [`HostedLifecycleService`] hooks.
pub struct ExtendedComponent<T: ?Sized>(Arc<T>);

impl<T: ?Sized> ExtendedComponent<T> {
    /// Wraps a shared component.
    #[must_use]
    pub const fn new(component: Arc<T>) -> Self {
        Self(component)
    }

    /// Shared handle to the wrapped component.
    #[must_use]
    pub const fn inner(&self) -> &Arc<T> {
        &self.0
    }
}

#[async_trait]
impl<T: HostedLifecycleService + ?Sized + 'static> ComponentPhases for ExtendedComponent<T> {
    fn component_name(&self) -> &'static str {
        type_name::<T>()
    }

    async fn pre_start(&self, cancellation: &CancellationToken) -> Result<(), ComponentError> {
        self.0.starting(cancellation).await
    }

    async fn start(&self, cancellation: &CancellationToken) -> Result<(), ComponentError> {
        self.0.start(cancellation).await
    }

    async fn post_start(&self, cancellation: &CancellationToken) -> Result<(), ComponentError> {
        self.0.started(cancellation).await
    }

    async fn pre_stop(&self, cancellation: &CancellationToken) -> Result<(), ComponentError> {
        self.0.stopping(cancellation).await
    }

    async fn stop(&self, cancellation: &CancellationToken) -> Result<(), ComponentError> {
        self.0.stop(cancellation).await
    }

    async fn post_stop(&self, cancellation: &CancellationToken) -> Result<(), ComponentError> {
        self.0.stopped(cancellation).await
    }

    async fn release(&self) {
        release(self.0.as_ref()).await;
    }
}

/// Component known only through the erased [`HostedService`] contract.
///
/// The surrounding hooks are looked up on each call through
/// [`HostedService::as_lifecycle`]; components without them skip those
/// phases like a [`BasicComponent`].
pub struct ErasedComponent(Arc<dyn HostedService>);

impl ErasedComponent {
    /// Wraps a shared component.
    #[must_use]
    pub const fn new(component: Arc<dyn HostedService>) -> Self {
        Self(component)
    }

    /// Shared handle to the wrapped component.
    #[must_use]
    pub const fn inner(&self) -> &Arc<dyn HostedService> {
        &self.0
    }

    /// Returns `true` when the wrapped component exposes the extended hooks.
    #[must_use]
    pub fn is_extended(&self) -> bool {
        self.0.as_lifecycle().is_some()
    }
}

#[async_trait]
impl ComponentPhases for ErasedComponent {
    fn component_name(&self) -> &'static str {
        type_name::<dyn HostedService>()
    }

    async fn pre_start(&self, cancellation: &CancellationToken) -> Result<(), ComponentError> {
        let Some(hooks) = self.0.as_lifecycle() else {
            return Ok(());
        };
        hooks.starting(cancellation).await
    }

    async fn start(&self, cancellation: &CancellationToken) -> Result<(), ComponentError> {
        self.0.start(cancellation).await
    }

    async fn post_start(&self, cancellation: &CancellationToken) -> Result<(), ComponentError> {
        let Some(hooks) = self.0.as_lifecycle() else {
            return Ok(());
        };
        hooks.started(cancellation).await
    }

    async fn pre_stop(&self, cancellation: &CancellationToken) -> Result<(), ComponentError> {
        let Some(hooks) = self.0.as_lifecycle() else {
            return Ok(());
        };
        hooks.stopping(cancellation).await
    }

    async fn stop(&self, cancellation: &CancellationToken) -> Result<(), ComponentError> {
        self.0.stop(cancellation).await
    }

    async fn post_stop(&self, cancellation: &CancellationToken) -> Result<(), ComponentError> {
        let Some(hooks) = self.0.as_lifecycle() else {
            return Ok(());
        };
        hooks.stopped(cancellation).await
    }

    async fn release(&self) {
        release(self.0.as_ref()).await;
    }
}

async fn release<T: HostedService + ?Sized>(component: &T) {
    if let Some(resources) = component.as_release() {
        resources.release();
        resources.release_async().await;
    }
}

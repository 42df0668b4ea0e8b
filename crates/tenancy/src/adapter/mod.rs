//! Tenant-aware lifecycle adapter.
//!
//! A [`LifecycleAdapter`] wraps one component written for a single
//! process-wide lifecycle and exposes it as a tenant lifecycle participant.
//! Tenant notifications arrive in any order and any number of times; the
//! adapter filters them through a small state machine so the component sees
//! each of its native operations at most once per cycle, in the order it
//! expects.
//!
//! Phases heal missed predecessors. A post-start that arrives without a
//! pre-start runs the pre-start first; a pre-stop on a half-started adapter
//! completes the start before stopping. Whether stop phases may open a cycle
//! on an adapter that was never activated is governed by [`StopOrdering`].
//!
//! All state lives behind one asynchronous lock held for the whole phase, so
//! tenants sharing a singleton adapter are serialised and concurrent disposal
//! releases the component exactly once.

mod binding;
mod phases;
mod state;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use self::binding::{AdapterOptions, LifecycleBinding, LifecycleShape};
pub use self::phases::{
    BasicComponent, ComponentPhases, ErasedComponent, ExtendedComponent, Phase,
};
pub use self::state::{LifecycleState, StopOrdering};

use self::state::Cycle;
use crate::component::ComponentError;
use crate::error::LifecycleError;
use crate::tenant::{RemovingContext, TenantEvents};

/// Log target for adapter operations.
pub(crate) const ADAPTER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::adapter");

/// Adapter over a component implementing only the basic contract.
pub type HostedServiceAdapter<T> = LifecycleAdapter<BasicComponent<T>>;

/// Adapter over a component implementing the extended contract.
pub type HostedLifecycleServiceAdapter<T> = LifecycleAdapter<ExtendedComponent<T>>;

/// Adapter over a component registered without its concrete type.
pub type ErasedServiceAdapter = LifecycleAdapter<ErasedComponent>;

/// Diagnostic identity of an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterIdentity {
    component: &'static str,
    tenant: String,
}

impl AdapterIdentity {
    /// Fully-qualified type name of the wrapped component.
    #[must_use]
    pub const fn component(&self) -> &'static str {
        self.component
    }

    /// Tenant the adapter serves.
    #[must_use]
    pub const fn tenant(&self) -> &str {
        self.tenant.as_str()
    }
}

/// State machine exposing tenant phases over a process-lifecycle component.
pub struct LifecycleAdapter<C> {
    component: C,
    identity: AdapterIdentity,
    ordering: StopOrdering,
    cancellation: CancellationToken,
    cycle: Mutex<Cycle>,
}

impl<C: ComponentPhases> LifecycleAdapter<C> {
    /// Wraps `component` for the tenant and stop ordering in `options`.
    #[must_use]
    pub fn new(component: C, options: &AdapterOptions) -> Self {
        let identity = AdapterIdentity {
            component: component.component_name(),
            tenant: options.tenant.clone(),
        };
        Self {
            component,
            identity,
            ordering: options.ordering,
            cancellation: CancellationToken::new(),
            cycle: Mutex::new(Cycle::default()),
        }
    }

    /// Overrides the component name reported in diagnostics.
    #[must_use]
    pub(crate) const fn with_component_name(mut self, component: &'static str) -> Self {
        self.identity.component = component;
        self
    }

    /// Wrapped component.
    #[must_use]
    pub const fn component(&self) -> &C {
        &self.component
    }

    /// Diagnostic identity.
    #[must_use]
    pub const fn identity(&self) -> &AdapterIdentity {
        &self.identity
    }

    /// Stop ordering policy.
    #[must_use]
    pub const fn ordering(&self) -> StopOrdering {
        self.ordering
    }

    /// Current state, waiting for any running phase to finish.
    pub async fn state(&self) -> LifecycleState {
        self.cycle.lock().await.state
    }

    /// Opens a cycle by running the pre-start hook.
    ///
    /// Does nothing while a cycle is already open.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Disposed`] after disposal, or
    /// [`LifecycleError::Component`] when the hook fails.
    pub async fn pre_start(&self) -> Result<(), LifecycleError> {
        let mut cycle = self.cycle.lock().await;
        self.ensure_live(&cycle)?;
        self.pre_start_locked(&mut cycle).await
    }

    /// Completes activation: pre-start and native start when they have not
    /// run yet, then the post-start hook once per cycle.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Disposed`] after disposal, or
    /// [`LifecycleError::Component`] when any step fails. Completed steps are
    /// not repeated by a retry.
    pub async fn post_start(&self) -> Result<(), LifecycleError> {
        let mut cycle = self.cycle.lock().await;
        self.ensure_live(&cycle)?;
        self.post_start_locked(&mut cycle).await
    }

    /// Begins shutdown by running the pre-stop hook.
    ///
    /// Activation is completed first when it was cut short.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Disposed`] after disposal, or
    /// [`LifecycleError::Component`] when any step fails.
    pub async fn pre_stop(&self) -> Result<(), LifecycleError> {
        let mut cycle = self.cycle.lock().await;
        self.ensure_live(&cycle)?;
        self.pre_stop_locked(&mut cycle).await
    }

    /// Closes the cycle: pre-stop if needed, native stop, then the post-stop
    /// hook.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Disposed`] after disposal, or
    /// [`LifecycleError::Component`] when any step fails.
    pub async fn post_stop(&self) -> Result<(), LifecycleError> {
        let mut cycle = self.cycle.lock().await;
        self.ensure_live(&cycle)?;
        self.post_stop_locked(&mut cycle).await
    }

    /// Closes any open cycle and releases the component.
    ///
    /// Repeated calls do nothing. The component is released even when
    /// closing the cycle fails, and that failure is returned afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Component`] when closing the open cycle
    /// fails.
    pub async fn dispose(&self) -> Result<(), LifecycleError> {
        let mut cycle = self.cycle.lock().await;
        if cycle.state == LifecycleState::Disposed {
            return Ok(());
        }
        self.log_phase(Phase::Dispose);
        let closed = if cycle.state.in_cycle() {
            self.post_stop_locked(&mut cycle).await
        } else {
            Ok(())
        };
        self.component.release().await;
        cycle.state = LifecycleState::Disposed;
        closed
    }

    async fn pre_start_locked(&self, cycle: &mut Cycle) -> Result<(), LifecycleError> {
        if cycle.state.in_cycle() {
            return Ok(());
        }
        self.log_phase(Phase::PreStart);
        self.run(Phase::PreStart, self.component.pre_start(&self.cancellation).await)?;
        cycle.open();
        Ok(())
    }

    async fn start_locked(&self, cycle: &mut Cycle) -> Result<(), LifecycleError> {
        if cycle.state != LifecycleState::Starting {
            return Ok(());
        }
        self.log_phase(Phase::Start);
        self.run(Phase::Start, self.component.start(&self.cancellation).await)?;
        cycle.state = LifecycleState::Started;
        info!(
            target: ADAPTER_TARGET,
            component = self.identity.component,
            tenant = %self.identity.tenant,
            "component started"
        );
        Ok(())
    }

    async fn post_start_locked(&self, cycle: &mut Cycle) -> Result<(), LifecycleError> {
        self.pre_start_locked(cycle).await?;
        self.start_locked(cycle).await?;
        if cycle.post_started {
            return Ok(());
        }
        self.log_phase(Phase::PostStart);
        self.run(Phase::PostStart, self.component.post_start(&self.cancellation).await)?;
        cycle.post_started = true;
        Ok(())
    }

    async fn pre_stop_locked(&self, cycle: &mut Cycle) -> Result<(), LifecycleError> {
        if !self.ordering.admits(cycle.state) {
            return Ok(());
        }
        self.post_start_locked(cycle).await?;
        if cycle.state == LifecycleState::Stopping {
            return Ok(());
        }
        self.log_phase(Phase::PreStop);
        self.run(Phase::PreStop, self.component.pre_stop(&self.cancellation).await)?;
        cycle.state = LifecycleState::Stopping;
        Ok(())
    }

    async fn post_stop_locked(&self, cycle: &mut Cycle) -> Result<(), LifecycleError> {
        if !self.ordering.admits(cycle.state) {
            return Ok(());
        }
        self.pre_stop_locked(cycle).await?;
        if !cycle.halted {
            self.log_phase(Phase::Stop);
            self.run(Phase::Stop, self.component.stop(&self.cancellation).await)?;
            cycle.halted = true;
            info!(
                target: ADAPTER_TARGET,
                component = self.identity.component,
                tenant = %self.identity.tenant,
                "component stopped"
            );
        }
        self.log_phase(Phase::PostStop);
        self.run(Phase::PostStop, self.component.post_stop(&self.cancellation).await)?;
        cycle.close();
        Ok(())
    }

    fn ensure_live(&self, cycle: &Cycle) -> Result<(), LifecycleError> {
        if cycle.state == LifecycleState::Disposed {
            return Err(LifecycleError::Disposed {
                component: self.identity.component,
            });
        }
        Ok(())
    }

    fn run(&self, phase: Phase, outcome: Result<(), ComponentError>) -> Result<(), LifecycleError> {
        outcome.map_err(|source| {
            warn!(
                target: ADAPTER_TARGET,
                phase = %phase,
                component = self.identity.component,
                tenant = %self.identity.tenant,
                error = %source,
                "component phase failed"
            );
            LifecycleError::Component {
                component: self.identity.component,
                tenant: self.identity.tenant.clone(),
                phase,
                source,
            }
        })
    }

    fn log_phase(&self, phase: Phase) {
        info!(
            target: ADAPTER_TARGET,
            phase = %phase,
            component = self.identity.component,
            tenant = %self.identity.tenant,
            "lifecycle phase"
        );
    }
}

#[async_trait]
impl<C: ComponentPhases + 'static> TenantEvents for LifecycleAdapter<C> {
    async fn activating(&self) -> Result<(), LifecycleError> {
        self.pre_start().await
    }

    async fn activated(&self) -> Result<(), LifecycleError> {
        self.post_start().await
    }

    async fn terminating(&self) -> Result<(), LifecycleError> {
        self.pre_stop().await
    }

    async fn terminated(&self) -> Result<(), LifecycleError> {
        self.post_stop().await
    }

    async fn removing(&self, context: &RemovingContext) -> Result<(), LifecycleError> {
        info!(
            target: ADAPTER_TARGET,
            component = self.identity.component,
            tenant = %context.tenant,
            local_resources_only = context.local_resources_only,
            "tenant removing"
        );
        self.pre_stop().await?;
        self.post_stop().await
    }

    async fn dispose(&self) -> Result<(), LifecycleError> {
        Self::dispose(self).await
    }
}

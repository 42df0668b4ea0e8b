//! Tenant-aware lifecycle adaptation for multi-tenant hosts.
//!
//! Components written for a single-tenant host implement
//! [`HostedService`] (start and stop) or [`HostedLifecycleService`] (start
//! and stop plus four surrounding hooks) and expect to run once per process.
//! A multi-tenant host instead activates and terminates each tenant
//! independently, notifying every [`TenantEvents`] participant registered in
//! the tenant's container.
//!
//! The crate bridges the two models:
//!
//! - [`registry`] holds the minimal container: ordered registrations, three
//!   lifetimes and a scope-aware provider.
//! - [`registrar`] registers a candidate type under every capability it
//!   exposes, in a deterministic order, sharing one instance across them.
//! - [`adapter`] wraps one component in a [`LifecycleAdapter`], an
//!   idempotent state machine mapping tenant phases onto component calls.
//! - [`rewriter`] replaces eligible lifecycle registrations with adapter
//!   registrations before a tenant container is built.
//!
//! # Stop ordering
//!
//! By default ([`StopOrdering::RequireActivation`]) stop phases on an adapter
//! that was never activated do nothing, so a lone `terminated` notification
//! leaves the component untouched. Setting
//! [`Config::complete_activation_on_stop()`] selects
//! [`StopOrdering::CompleteActivation`], under which the adapter orders
//! itself: a stop phase on an idle adapter first runs the whole activation,
//! and every phase still runs exactly once, in order.
//!
//! # Example
//!
//! ```rust,no_run
//! use tenancy::{Config, GraphRewriter, ServiceCollection, TenantLifecycleRegistration};
//!
//! let mut services = ServiceCollection::new();
//! // services.add_hosted_service::<MyWorker, _>(|_| Ok(MyWorker::default()));
//! let rewriter = GraphRewriter::from_config(&Config::default());
//! let report = services.convert_hosted_services(&rewriter).expect("no rule conflict");
//! assert!(report.is_empty());
//! ```

pub mod adapter;
pub mod component;
pub mod error;
pub mod registrar;
pub mod registry;
pub mod rewriter;
pub mod telemetry;
pub mod tenant;

#[cfg(test)]
mod tests;

pub use self::adapter::{
    AdapterIdentity, AdapterOptions, ErasedServiceAdapter, HostedLifecycleServiceAdapter,
    HostedServiceAdapter, LifecycleAdapter, LifecycleBinding, LifecycleShape, LifecycleState,
    Phase, StopOrdering,
};
pub use self::component::{ComponentError, HostedLifecycleService, HostedService, Release};
pub use self::error::{LifecycleError, ResolveError, RewriteError};
pub use self::registrar::{AssignableRegistration, Candidate, CandidateSet};
pub use self::registry::{Lifetime, ServiceCollection, ServiceDescriptor, ServiceProvider, TypeKey};
pub use self::rewriter::{
    AdaptationRule, Eligibility, GraphRewriter, RewriteRecord, RewriteReport,
    TenantLifecycleRegistration,
};
pub use self::telemetry::{TelemetryError, TelemetryHandle};
pub use self::tenant::{RemovingContext, TenantEvents, TenantSettings};
pub use tenancy_config::{Config, LogFormat};

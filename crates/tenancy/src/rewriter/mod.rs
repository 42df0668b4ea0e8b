//! Rewriting of lifecycle registrations into tenant lifecycle participants.
//!
//! Hosts register process-wide components as `dyn HostedService`
//! singletons. In a multi-tenant host those components must instead follow
//! each tenant's activation, so [`GraphRewriter::rewrite`] replaces every
//! eligible registration with a `dyn TenantEvents` registration whose factory
//! wraps the original component in a [`LifecycleAdapter`].
//!
//! Registrations whose implementation lives in a reserved namespace belong to
//! the trusted host runtime and are left untouched, as are lifetimes that
//! are not admitted.
//!
//! [`LifecycleAdapter`]: crate::adapter::LifecycleAdapter

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tenancy_config::Config;
use tracing::{debug, info};

use crate::adapter::{AdapterOptions, LifecycleBinding, LifecycleShape, StopOrdering};
use crate::component::HostedService;
use crate::error::RewriteError;
use crate::registry::{
    Factory, Instance, Lifetime, Resolved, ServiceCollection, ServiceDescriptor, ServiceProvider,
    TypeKey,
};
use crate::tenant::{TenantEvents, TenantSettings};

/// Log target for rewriter operations.
const REWRITER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::rewriter");

/// Which registrations are subject to rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligibility {
    reserved_namespaces: Vec<String>,
    lifetimes: Vec<Lifetime>,
}

/// Outcome of classifying one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Not a lifecycle registration, or its lifetime is not admitted.
    Ignored,
    /// A lifecycle registration owned by the host runtime.
    Reserved,
    /// A lifecycle registration to adapt.
    Eligible,
}

impl Eligibility {
    /// Admits singleton lifecycle registrations outside `reserved_namespaces`.
    #[must_use]
    pub fn new<I, S>(reserved_namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reserved_namespaces: reserved_namespaces.into_iter().map(Into::into).collect(),
            lifetimes: vec![Lifetime::Singleton],
        }
    }

    /// Builds the eligibility rules described by `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let eligibility = Self::new(config.reserved_namespaces().iter().cloned());
        if config.adapt_scoped() {
            eligibility.with_lifetime(Lifetime::Scoped)
        } else {
            eligibility
        }
    }

    /// Also admits registrations with `lifetime`.
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        if !self.lifetimes.contains(&lifetime) {
            self.lifetimes.push(lifetime);
        }
        self
    }

    /// Reserved namespaces in configuration order.
    #[must_use]
    pub fn reserved_namespaces(&self) -> &[String] {
        &self.reserved_namespaces
    }

    /// Returns `true` when `implementation` lives in a reserved namespace.
    #[must_use]
    pub fn is_reserved(&self, implementation: TypeKey) -> bool {
        self.reserved_namespaces
            .iter()
            .any(|namespace| implementation.is_within(namespace))
    }

    /// Returns `true` when `lifetime` is admitted.
    #[must_use]
    pub fn admits(&self, lifetime: Lifetime) -> bool {
        self.lifetimes.contains(&lifetime)
    }

    /// Classifies one registration.
    #[must_use]
    pub fn classify(&self, descriptor: &ServiceDescriptor) -> Verdict {
        if descriptor.capability() != TypeKey::of::<dyn HostedService>()
            || !self.admits(descriptor.lifetime())
        {
            Verdict::Ignored
        } else if self.is_reserved(descriptor.implementation()) {
            Verdict::Reserved
        } else {
            Verdict::Eligible
        }
    }
}

impl Default for Eligibility {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Strategy choosing how an eligible registration is adapted.
pub trait AdaptationRule: Send + Sync {
    /// Stable rule name used in diagnostics and conflict reports.
    fn name(&self) -> &'static str;

    /// Returns the binding to use, or `None` when the rule does not apply.
    fn bind(&self, descriptor: &ServiceDescriptor) -> Option<LifecycleBinding>;
}

/// Uses the binding captured when the component was registered.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredBindingRule;

impl AdaptationRule for DeclaredBindingRule {
    fn name(&self) -> &'static str {
        "declared-binding"
    }

    fn bind(&self, descriptor: &ServiceDescriptor) -> Option<LifecycleBinding> {
        descriptor.binding().cloned()
    }
}

/// Adapts registrations without a captured binding through the erased
/// contract, using the registration's own factory.
///
/// The extended hooks still run for components that expose them through
/// [`HostedService::as_lifecycle`](crate::component::HostedService::as_lifecycle).
#[derive(Debug, Clone, Copy, Default)]
pub struct FactoryFallbackRule;

impl AdaptationRule for FactoryFallbackRule {
    fn name(&self) -> &'static str {
        "factory-fallback"
    }

    fn bind(&self, descriptor: &ServiceDescriptor) -> Option<LifecycleBinding> {
        if descriptor.binding().is_some() {
            return None;
        }
        Some(LifecycleBinding::from_factory(
            descriptor.implementation(),
            Arc::clone(descriptor.factory()),
        ))
    }
}

/// One registration replaced by the rewriter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRecord {
    /// Implementation of the original registration.
    pub component: TypeKey,
    /// Implementation key of the new registration.
    pub adapter: TypeKey,
    /// Contract the adapter drives.
    pub shape: LifecycleShape,
    /// Lifetime carried over from the original registration.
    pub lifetime: Lifetime,
    /// Rule that produced the binding.
    pub rule: &'static str,
}

/// Summary of one rewrite pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Registrations replaced, in original order.
    pub rewritten: Vec<RewriteRecord>,
    /// Lifecycle registrations left alone because they are reserved.
    pub reserved: Vec<TypeKey>,
    /// Eligible registrations no rule could adapt.
    pub unmatched: Vec<TypeKey>,
}

impl RewriteReport {
    /// Returns `true` when nothing was rewritten.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rewritten.is_empty()
    }
}

/// Replaces eligible lifecycle registrations with tenant-aware adapters.
pub struct GraphRewriter {
    eligibility: Eligibility,
    rules: Vec<Box<dyn AdaptationRule>>,
    default_tenant: String,
    ordering: StopOrdering,
}

impl GraphRewriter {
    /// Creates a rewriter with the default rules, tenant and stop ordering.
    #[must_use]
    pub fn new(eligibility: Eligibility) -> Self {
        Self {
            eligibility,
            rules: vec![Box::new(DeclaredBindingRule), Box::new(FactoryFallbackRule)],
            default_tenant: tenancy_config::default_tenant_name_string(),
            ordering: StopOrdering::default(),
        }
    }

    /// Creates the rewriter described by `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(Eligibility::from_config(config))
            .with_default_tenant(config.default_tenant())
            .with_ordering(StopOrdering::from_flag(config.complete_activation_on_stop()))
    }

    /// Appends an adaptation rule evaluated after the existing ones.
    #[must_use]
    pub fn with_rule(mut self, rule: impl AdaptationRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Sets the tenant reported by adapters resolved without tenant settings.
    #[must_use]
    pub fn with_default_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.default_tenant = tenant.into();
        self
    }

    /// Sets the stop ordering given to every adapter.
    #[must_use]
    pub const fn with_ordering(mut self, ordering: StopOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Eligibility rules in use.
    #[must_use]
    pub const fn eligibility(&self) -> &Eligibility {
        &self.eligibility
    }

    /// Rewrites `services` in place.
    ///
    /// Eligible registrations are removed and a `dyn TenantEvents`
    /// registration is appended for each, in their original order. The rest
    /// of the collection keeps its order and its descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`RewriteError::EligibilityConflict`] when several rules claim
    /// one registration. The collection is left unchanged in that case.
    pub fn rewrite(&self, services: &mut ServiceCollection) -> Result<RewriteReport, RewriteError> {
        let mut report = RewriteReport::default();
        let mut plan: Vec<(usize, &'static str, LifecycleBinding)> = Vec::new();

        for (index, descriptor) in services.iter().enumerate() {
            match self.eligibility.classify(descriptor) {
                Verdict::Ignored => {}
                Verdict::Reserved => {
                    debug!(
                        target: REWRITER_TARGET,
                        component = %descriptor.implementation(),
                        "skipping reserved lifecycle component"
                    );
                    report.reserved.push(descriptor.implementation());
                }
                Verdict::Eligible => match self.select(descriptor)? {
                    Some((rule, binding)) => plan.push((index, rule, binding)),
                    None => {
                        debug!(
                            target: REWRITER_TARGET,
                            component = %descriptor.implementation(),
                            "no adaptation rule applies"
                        );
                        report.unmatched.push(descriptor.implementation());
                    }
                },
            }
        }

        if plan.is_empty() {
            return Ok(report);
        }

        let planned: HashSet<usize> = plan.iter().map(|(index, _, _)| *index).collect();
        let mut lifetimes = Vec::with_capacity(plan.len());
        for (index, descriptor) in services.take().into_iter().enumerate() {
            if planned.contains(&index) {
                lifetimes.push(descriptor.lifetime());
            } else {
                services.add(descriptor);
            }
        }

        for ((_, rule, binding), lifetime) in plan.into_iter().zip(lifetimes) {
            info!(
                target: REWRITER_TARGET,
                component = %binding.component(),
                adapter = %binding.adapter(),
                lifetime = %lifetime,
                rule,
                "adapting lifecycle component to tenant events"
            );
            report.rewritten.push(RewriteRecord {
                component: binding.component(),
                adapter: binding.adapter(),
                shape: binding.shape(),
                lifetime,
                rule,
            });
            services.add(self.adapter_descriptor(lifetime, binding));
        }

        Ok(report)
    }

    fn select(
        &self,
        descriptor: &ServiceDescriptor,
    ) -> Result<Option<(&'static str, LifecycleBinding)>, RewriteError> {
        let mut matched: Vec<(&'static str, LifecycleBinding)> = self
            .rules
            .iter()
            .filter_map(|rule| rule.bind(descriptor).map(|binding| (rule.name(), binding)))
            .collect();
        if matched.len() > 1 {
            return Err(RewriteError::EligibilityConflict {
                implementation: descriptor.implementation().name(),
                rules: matched.iter().map(|(rule, _)| *rule).collect(),
            });
        }
        Ok(matched.pop())
    }

    fn adapter_descriptor(
        &self,
        lifetime: Lifetime,
        binding: LifecycleBinding,
    ) -> ServiceDescriptor {
        let default_tenant = self.default_tenant.clone();
        let ordering = self.ordering;
        let adapter = binding.adapter();
        let factory: Factory = Arc::new(move |provider: &ServiceProvider| -> Resolved {
            let tenant = provider
                .get::<TenantSettings>()?
                .map_or_else(|| default_tenant.clone(), |settings| settings.name().to_owned());
            let events = binding.build(provider, &AdapterOptions::new(tenant, ordering))?;
            Ok(Instance::new(events))
        });
        ServiceDescriptor::new(TypeKey::of::<dyn TenantEvents>(), adapter, lifetime, factory)
    }
}

impl fmt::Debug for GraphRewriter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("GraphRewriter")
            .field("eligibility", &self.eligibility)
            .field(
                "rules",
                &self.rules.iter().map(|rule| rule.name()).collect::<Vec<_>>(),
            )
            .field("default_tenant", &self.default_tenant)
            .field("ordering", &self.ordering)
            .finish()
    }
}

/// Tenant lifecycle conversion on [`ServiceCollection`].
pub trait TenantLifecycleRegistration {
    /// Converts eligible lifecycle registrations with `rewriter`.
    ///
    /// # Errors
    ///
    /// Returns the rewriter's error; the collection is unchanged on failure.
    fn convert_hosted_services(
        &mut self,
        rewriter: &GraphRewriter,
    ) -> Result<RewriteReport, RewriteError>;
}

impl TenantLifecycleRegistration for ServiceCollection {
    fn convert_hosted_services(
        &mut self,
        rewriter: &GraphRewriter,
    ) -> Result<RewriteReport, RewriteError> {
        rewriter.rewrite(self)
    }
}

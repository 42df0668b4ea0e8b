//! Tenant lifecycle contract driven by the host.

use async_trait::async_trait;

use crate::error::LifecycleError;

/// Participant in tenant activation and termination.
///
/// The host resolves every registration of `dyn TenantEvents` from a tenant
/// container and notifies each one as the tenant moves through its
/// lifecycle.
#[async_trait]
pub trait TenantEvents: Send + Sync {
    /// The tenant is about to activate.
    async fn activating(&self) -> Result<(), LifecycleError>;

    /// The tenant finished activating.
    async fn activated(&self) -> Result<(), LifecycleError>;

    /// The tenant is about to terminate.
    async fn terminating(&self) -> Result<(), LifecycleError>;

    /// The tenant finished terminating.
    async fn terminated(&self) -> Result<(), LifecycleError>;

    /// The tenant is being removed from the host.
    async fn removing(&self, context: &RemovingContext) -> Result<(), LifecycleError>;

    /// The tenant container is being torn down.
    async fn dispose(&self) -> Result<(), LifecycleError>;
}

/// Settings the host registers in each tenant container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantSettings {
    name: String,
}

impl TenantSettings {
    /// Creates settings for the tenant called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Tenant name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }
}

/// Details of a tenant removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovingContext {
    /// Tenant being removed.
    pub tenant: String,
    /// Only resources local to this host should be released.
    pub local_resources_only: bool,
}

impl RemovingContext {
    /// Creates the context for removing `tenant`.
    #[must_use]
    pub fn new(tenant: impl Into<String>, local_resources_only: bool) -> Self {
        Self {
            tenant: tenant.into(),
            local_resources_only,
        }
    }
}

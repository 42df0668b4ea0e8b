//! Lifecycle contracts implemented by host components.
//!
//! Components written for a single process-wide lifecycle implement
//! [`HostedService`], optionally extended with the finer grained hooks of
//! [`HostedLifecycleService`]. Neither contract knows anything about tenants;
//! the adapter layer supplies that.

use std::error::Error as StdError;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Basic lifecycle contract: a component that can be started and stopped.
#[async_trait]
pub trait HostedService: Send + Sync {
    /// Starts the component.
    async fn start(&self, cancellation: &CancellationToken) -> Result<(), ComponentError>;

    /// Stops the component.
    async fn stop(&self, cancellation: &CancellationToken) -> Result<(), ComponentError>;

    /// Returns the release contract when the component holds resources that
    /// must be freed on disposal.
    fn as_release(&self) -> Option<&dyn Release> {
        None
    }

    /// Returns the extended hooks when the component implements
    /// [`HostedLifecycleService`].
    ///
    /// Registrations that only keep an erased `Arc<dyn HostedService>` rely on
    /// this to reach the hooks, so extended components should return
    /// `Some(self)`.
    fn as_lifecycle(&self) -> Option<&dyn HostedLifecycleService> {
        None
    }
}

/// Extended lifecycle contract with hooks around start and stop.
///
/// Implementors should also override [`HostedService::as_lifecycle`] so the
/// hooks stay reachable through `dyn HostedService`.
#[async_trait]
pub trait HostedLifecycleService: HostedService {
    /// Runs before [`HostedService::start`].
    async fn starting(&self, cancellation: &CancellationToken) -> Result<(), ComponentError>;

    /// Runs after [`HostedService::start`].
    async fn started(&self, cancellation: &CancellationToken) -> Result<(), ComponentError>;

    /// Runs before [`HostedService::stop`].
    async fn stopping(&self, cancellation: &CancellationToken) -> Result<(), ComponentError>;

    /// Runs after [`HostedService::stop`].
    async fn stopped(&self, cancellation: &CancellationToken) -> Result<(), ComponentError>;
}

/// Optional resource release contract.
///
/// Both paths default to no-ops. Disposal drains the immediate path first and
/// the deferred path second.
#[async_trait]
pub trait Release: Send + Sync {
    /// Releases resources immediately.
    fn release(&self) {}

    /// Releases resources that need to be awaited.
    async fn release_async(&self) {}
}

/// Failure reported by a component while running one of its operations.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ComponentError {
    message: String,
    /// Optional source error reported by the component implementation.
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ComponentError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable message describing the failure.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }
}

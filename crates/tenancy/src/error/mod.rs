//! Errors raised by the registry, the lifecycle adapter and the rewriter.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect failures programmatically. Type names are carried as
//! `&'static str` because they always originate from
//! [`std::any::type_name`].

use thiserror::Error;

use crate::adapter::Phase;
use crate::component::ComponentError;

/// Errors surfaced by a lifecycle adapter phase.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A phase was requested after the adapter had been disposed.
    #[error("lifecycle adapter for '{component}' has been disposed")]
    Disposed {
        /// Type name of the wrapped component.
        component: &'static str,
    },

    /// The wrapped component failed while running a phase.
    #[error("component '{component}' failed during {phase} for tenant '{tenant}'")]
    Component {
        /// Type name of the wrapped component.
        component: &'static str,
        /// Tenant the adapter was serving.
        tenant: String,
        /// Phase that was running.
        phase: Phase,
        /// Failure reported by the component.
        #[source]
        source: ComponentError,
    },
}

impl LifecycleError {
    /// Returns `true` when the error reports use after disposal.
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed { .. })
    }

    /// Phase that failed, when the component reported the failure.
    #[must_use]
    pub const fn phase(&self) -> Option<Phase> {
        match self {
            Self::Disposed { .. } => None,
            Self::Component { phase, .. } => Some(*phase),
        }
    }
}

/// Errors raised while resolving registrations from a provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No registration exists for the requested capability.
    #[error("no registration for '{capability}'")]
    NotRegistered {
        /// Type name of the requested capability.
        capability: &'static str,
    },

    /// A factory produced a value that does not match its capability.
    #[error("registration '{implementation}' does not provide '{capability}'")]
    TypeMismatch {
        /// Type name of the requested capability.
        capability: &'static str,
        /// Type name of the registered implementation.
        implementation: &'static str,
    },

    /// A factory could not construct its implementation.
    #[error("failed to construct '{implementation}': {message}")]
    Construction {
        /// Type name of the implementation being built.
        implementation: &'static str,
        /// Human-readable failure description.
        message: String,
    },
}

impl ResolveError {
    /// Builds a construction failure for `implementation`.
    #[must_use]
    pub fn construction(implementation: &'static str, message: impl Into<String>) -> Self {
        Self::Construction {
            implementation,
            message: message.into(),
        }
    }
}

/// Errors raised while rewriting a service collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    /// More than one adaptation rule claimed the same registration.
    #[error(
        "registration '{implementation}' matched several adaptation rules: {}",
        .rules.join(", ")
    )]
    EligibilityConflict {
        /// Type name of the registered implementation.
        implementation: &'static str,
        /// Names of the rules that matched, in evaluation order.
        rules: Vec<&'static str>,
    },
}

#[cfg(test)]
mod tests;

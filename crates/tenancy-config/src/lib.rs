//! Shared configuration for tenant lifecycle adaptation.
//!
//! Hosts load a single [`Config`] and hand it to the graph rewriter and the
//! telemetry installer. Values are layered by `ortho_config`: built-in
//! defaults, then a configuration file, then `TENANCY_*` environment
//! variables, then command-line flags.

mod defaults;
mod logging;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_TENANT_NAME, TENANCY_NAMESPACE, default_log_filter,
    default_log_filter_string, default_log_format, default_reserved_namespaces,
    default_tenant_name, default_tenant_name_string,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration for the adaptation layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "TENANCY")]
pub struct Config {
    /// Module path prefixes owned by the trusted host runtime.
    ///
    /// Lifecycle components whose implementation type lives under one of
    /// these paths are left exactly as registered.
    #[serde(default = "default_reserved_namespaces")]
    pub reserved_namespaces: Vec<String>,
    /// Tenant name used by adapters resolved from a container without
    /// tenant settings.
    #[serde(default = "default_tenant_name_string")]
    pub default_tenant: String,
    /// Also adapt lifecycle components registered with a scoped lifetime.
    #[serde(default)]
    pub adapt_scoped: bool,
    /// Let stop phases on a never-activated adapter run the full activation
    /// first instead of doing nothing.
    #[serde(default)]
    pub complete_activation_on_stop: bool,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Output format for lifecycle diagnostics.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reserved_namespaces: default_reserved_namespaces(),
            default_tenant: default_tenant_name_string(),
            adapt_scoped: false,
            complete_activation_on_stop: false,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Reserved namespaces, in configuration order.
    #[must_use]
    pub fn reserved_namespaces(&self) -> &[String] {
        &self.reserved_namespaces
    }

    /// Tenant name used when a container carries no tenant settings.
    #[must_use]
    pub const fn default_tenant(&self) -> &str {
        self.default_tenant.as_str()
    }

    /// Whether scoped lifecycle components are adapted as well.
    #[must_use]
    pub const fn adapt_scoped(&self) -> bool {
        self.adapt_scoped
    }

    /// Whether stop phases complete a skipped activation.
    #[must_use]
    pub const fn complete_activation_on_stop(&self) -> bool {
        self.complete_activation_on_stop
    }

    /// Filter expression applied to the subscriber.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Selected log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

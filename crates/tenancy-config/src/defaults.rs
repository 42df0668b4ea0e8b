//! Built-in defaults applied when no layer supplies a value.

use crate::logging::LogFormat;

/// Module path owned by the adaptation layer itself.
///
/// Adapters live here, so anything registered from this namespace is already
/// tenant-aware and must never be wrapped again.
pub const TENANCY_NAMESPACE: &str = "tenancy";

/// Tenant name reported when a container carries no tenant settings.
pub const DEFAULT_TENANT_NAME: &str = "Default";

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default reserved namespaces whose components are never adapted.
#[must_use]
pub fn default_reserved_namespaces() -> Vec<String> {
    vec![TENANCY_NAMESPACE.to_owned()]
}

/// Default tenant name used for adapter diagnostics.
#[must_use]
pub const fn default_tenant_name() -> &'static str {
    DEFAULT_TENANT_NAME
}

/// Owned tenant name used where allocation is required (e.g. serde).
#[must_use]
pub fn default_tenant_name_string() -> String {
    DEFAULT_TENANT_NAME.to_owned()
}

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

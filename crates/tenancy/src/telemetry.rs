//! Structured telemetry initialisation for tenant lifecycle diagnostics.
//!
//! Adapter phases are emitted under the `tenancy::adapter` target with
//! `phase`, `component` and `tenant` fields; in the JSON format those fields
//! sit at the top level of each record. Component failures are logged there
//! at `warn`, and stay visible unless the configured filter says otherwise
//! about this crate.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use tenancy_config::{Config, LogFormat};

use crate::adapter::ADAPTER_TARGET;

static INSTALLED: OnceCell<TelemetryHandle> = OnceCell::new();

/// Settings of the subscriber that is in force.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
    filter: String,
}

impl TelemetryHandle {
    /// Output format of the installed subscriber.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }

    /// Filter expression applied, including the adapter directive when it
    /// was added.
    #[must_use]
    pub const fn filter(&self) -> &str {
        self.filter.as_str()
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global subscriber described by `config` on first use.
///
/// Later calls leave the global state alone and return the handle of the
/// subscriber installed first, so callers can tell when their configuration
/// was not applied.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the filter expression is invalid
/// and [`TelemetryError::Subscriber`] when another subscriber was installed
/// outside this function.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED
        .get_or_try_init(|| install_subscriber(config))
        .cloned()
}

fn install_subscriber(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    let expression = adapter_filter(config.log_filter());
    let filter = parse_filter(&expression)?;

    let builder = |env_filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = if config.log_format().is_structured() {
        Box::new(builder(filter).json().flatten_event(true).finish())
    } else {
        Box::new(builder(filter).compact().finish())
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)?;
    Ok(TelemetryHandle {
        format: config.log_format(),
        filter: expression,
    })
}

/// Appends a `warn` directive for the adapter target unless `expression`
/// already mentions this crate.
fn adapter_filter(expression: &str) -> String {
    let crate_name = env!("CARGO_PKG_NAME");
    let names_crate = expression
        .split(',')
        .filter_map(|directive| directive.split('=').next())
        .map(str::trim)
        .any(|target| {
            target == crate_name
                || target
                    .strip_prefix(crate_name)
                    .is_some_and(|rest| rest.starts_with("::"))
        });
    if names_crate {
        expression.to_owned()
    } else if expression.trim().is_empty() {
        format!("{ADAPTER_TARGET}=warn")
    } else {
        format!("{expression},{ADAPTER_TARGET}=warn")
    }
}

fn parse_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(expression).map_err(|error| TelemetryError::Filter(error.to_string()))
}

//! Recording components shared by unit and behaviour tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::component::{ComponentError, HostedLifecycleService, HostedService, Release};

/// Shared, ordered log of component calls.
#[derive(Clone, Debug, Default)]
pub(crate) struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub(crate) fn record(&self, entry: String) {
        self.calls.lock().expect("call log mutex poisoned").push(entry);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("call log mutex poisoned").clone()
    }

    pub(crate) fn count(&self, entry: &str) -> usize {
        self.calls().iter().filter(|call| *call == entry).count()
    }

    pub(crate) fn clear(&self) {
        self.calls.lock().expect("call log mutex poisoned").clear();
    }

    /// Makes the next call recorded as `entry` fail once.
    pub(crate) fn fail_next(&self, entry: &str) {
        self.failures
            .lock()
            .expect("failure list mutex poisoned")
            .push(entry.to_owned());
    }

    fn attempt(&self, entry: String) -> Result<(), ComponentError> {
        let mut failures = self.failures.lock().expect("failure list mutex poisoned");
        if let Some(position) = failures.iter().position(|failure| *failure == entry) {
            failures.remove(position);
            return Err(ComponentError::new(format!("{entry} failed")));
        }
        drop(failures);
        self.record(entry);
        Ok(())
    }
}

/// Component recording every call as `<label>:<operation>`.
#[derive(Clone, Debug)]
pub(crate) struct RecordingService {
    label: String,
    log: CallLog,
}

impl RecordingService {
    pub(crate) fn new(label: impl Into<String>, log: CallLog) -> Self {
        Self {
            label: label.into(),
            log,
        }
    }

    fn call(&self, operation: &str) -> Result<(), ComponentError> {
        self.log.attempt(format!("{}:{operation}", self.label))
    }
}

#[async_trait]
impl Release for RecordingService {
    fn release(&self) {
        self.log.record(format!("{}:release", self.label));
    }

    async fn release_async(&self) {
        self.log.record(format!("{}:release_async", self.label));
    }
}

#[async_trait]
impl HostedService for RecordingService {
    async fn start(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        self.call("start")
    }

    async fn stop(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        self.call("stop")
    }

    fn as_release(&self) -> Option<&dyn Release> {
        Some(self)
    }

    fn as_lifecycle(&self) -> Option<&dyn HostedLifecycleService> {
        Some(self)
    }
}

#[async_trait]
impl HostedLifecycleService for RecordingService {
    async fn starting(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        self.call("starting")
    }

    async fn started(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        self.call("started")
    }

    async fn stopping(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        self.call("stopping")
    }

    async fn stopped(&self, _cancellation: &CancellationToken) -> Result<(), ComponentError> {
        self.call("stopped")
    }
}

/// Builds the expected log entries for `label` and `operations`.
pub(crate) fn entries(label: &str, operations: &[&str]) -> Vec<String> {
    operations
        .iter()
        .map(|operation| format!("{label}:{operation}"))
        .collect()
}

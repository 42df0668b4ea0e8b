//! Adapter state and the policy applied to stop phases.

use std::fmt;

/// Position of an adapter within its activation cycle.
///
/// A cycle runs `Idle`, `Starting`, `Started`, `Stopping`, `Stopped`. A new
/// cycle may begin from `Stopped`. `Disposed` is terminal and reachable from
/// every other state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Never activated.
    #[default]
    Idle,
    /// Pre-start ran; native start has not completed.
    Starting,
    /// Native start completed.
    Started,
    /// Pre-stop ran; the cycle has not been closed yet.
    Stopping,
    /// The last cycle was closed.
    Stopped,
    /// Disposed; every further phase fails.
    Disposed,
}

impl LifecycleState {
    /// Returns `true` while a cycle is open.
    #[must_use]
    pub const fn in_cycle(self) -> bool {
        matches!(self, Self::Starting | Self::Started | Self::Stopping)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Started => "started",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Disposed => "disposed",
        };
        formatter.write_str(label)
    }
}

/// How stop phases treat an adapter that was never activated.
///
/// Selected from configuration by [`StopOrdering::from_flag`] with
/// `complete_activation_on_stop`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StopOrdering {
    /// Stop phases on an idle adapter do nothing.
    #[default]
    RequireActivation,
    /// Stop phases on an idle adapter first run the whole activation, so a
    /// lone post-stop drives every phase exactly once, in order.
    CompleteActivation,
}

impl StopOrdering {
    /// Maps the `complete_activation_on_stop` configuration flag.
    #[must_use]
    pub const fn from_flag(complete_activation: bool) -> Self {
        if complete_activation {
            Self::CompleteActivation
        } else {
            Self::RequireActivation
        }
    }

    pub(super) const fn admits(self, state: LifecycleState) -> bool {
        state.in_cycle() || matches!((self, state), (Self::CompleteActivation, LifecycleState::Idle))
    }
}

/// Mutable part of an adapter, guarded by its lock.
#[derive(Debug, Default)]
pub(super) struct Cycle {
    pub(super) state: LifecycleState,
    pub(super) post_started: bool,
    pub(super) halted: bool,
}

impl Cycle {
    pub(super) const fn close(&mut self) {
        self.state = LifecycleState::Stopped;
        self.post_started = false;
        self.halted = false;
    }

    pub(super) const fn open(&mut self) {
        self.state = LifecycleState::Starting;
        self.post_started = false;
        self.halted = false;
    }
}

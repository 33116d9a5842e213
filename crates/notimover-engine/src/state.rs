//! Monitoring lifecycle state machine.

use std::{fmt, mem};

use serde::{Deserialize, Serialize};

use crate::error::DetectionError;

/// Lifecycle state of the monitoring coordinator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitoringState {
    /// Constructed, never started.
    #[default]
    Initialized,
    /// Listening for triggers and running passes.
    Monitoring,
    /// Inside a pass that is repositioning windows.
    Positioning,
    /// Triggers are ignored until resumed.
    Paused,
    /// Shut down; no further passes are scheduled.
    Stopped,
    /// Halted on an unrecoverable failure.
    Error(String),
}

impl MonitoringState {
    /// Short label without the error reason.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Monitoring => "monitoring",
            Self::Positioning => "positioning",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Error(_) => "error",
        }
    }

    /// True while passes may run.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Monitoring | Self::Positioning)
    }

    /// Whether moving from `self` to `to` is permitted.
    ///
    /// `Stopped` and `Error` are reachable from anywhere. `Monitoring` is
    /// entered by start (from `Initialized`, `Stopped` or `Error`), by
    /// resume (from `Paused`) and after a positioning pass.
    #[must_use]
    pub fn can_transition(&self, to: &Self) -> bool {
        use MonitoringState::*;
        match (self, to) {
            (_, Stopped) | (_, Error(_)) => true,
            (Initialized | Stopped | Error(_), Monitoring) => true,
            (Monitoring, Positioning) | (Positioning, Monitoring) => true,
            (Monitoring, Paused) | (Paused, Monitoring) => true,
            _ => false,
        }
    }
}

impl fmt::Display for MonitoringState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(reason) => write!(f, "error({reason})"),
            other => f.write_str(other.label()),
        }
    }
}

/// Holder that applies only permitted transitions.
#[derive(Clone, Debug, Default)]
pub struct StateCell {
    /// Current state.
    current: MonitoringState,
}

impl StateCell {
    /// Start in [`MonitoringState::Initialized`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn get(&self) -> &MonitoringState {
        &self.current
    }

    /// Move to `to`, returning the previous state. The state is left unchanged
    /// on rejection.
    pub fn transition(&mut self, to: MonitoringState) -> Result<MonitoringState, DetectionError> {
        if !self.current.can_transition(&to) {
            return Err(DetectionError::InvalidTransition {
                from: self.current.clone(),
                to,
            });
        }
        Ok(mem::replace(&mut self.current, to))
    }
}

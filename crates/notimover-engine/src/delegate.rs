//! Callbacks from the monitor to the embedding application.

use crate::{error::DetectionError, model::TrackedWindow, state::MonitoringState};

/// Receives registry and lifecycle notifications.
///
/// Callbacks run on the monitor's task and must not block.
pub trait MonitorDelegate: Send + Sync {
    /// A window entered the registry.
    fn on_window_detected(&self, window: &TrackedWindow);

    /// A window left the registry.
    fn on_window_dismissed(&self, window: &TrackedWindow);

    /// A fatal error moved the monitor into its error state.
    fn on_error(&self, error: &DetectionError);

    /// The lifecycle state changed.
    fn on_state_changed(&self, _from: &MonitoringState, _to: &MonitoringState) {}
}

/// Delegate that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopDelegate;

impl MonitorDelegate for NoopDelegate {
    fn on_window_detected(&self, _window: &TrackedWindow) {}
    fn on_window_dismissed(&self, _window: &TrackedWindow) {}
    fn on_error(&self, _error: &DetectionError) {}
}

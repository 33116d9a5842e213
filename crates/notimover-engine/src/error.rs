//! Error types for the engine: per-element AX failures, window list
//! failures, and the pass-level [`DetectionError`].

use std::result::Result as StdResult;

use thiserror::Error;

use crate::{geom::Point, state::MonitoringState};

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, DetectionError>;

/// Failures reported by accessibility collaborators for a single element.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AxError {
    /// Accessibility permission is required but not granted.
    #[error("Accessibility permission missing")]
    Permission,

    /// The element became invalid (window closed, stale handle).
    #[error("AX element invalid (window gone)")]
    Gone,

    /// The attribute could not be read yet; usually layout has not settled.
    #[error("AX attribute not ready")]
    NotReady,

    /// An Accessibility API operation failed with the given error code.
    #[error("AX operation failed: code {0}")]
    Code(i32),
}

/// Result type for accessibility collaborator calls.
pub type AxResult<T> = StdResult<T, AxError>;

/// Failure of the window-listing collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    /// The window list could not be read because permission was revoked.
    #[error("window list unavailable: permission denied")]
    Permission,
    /// The window server returned nothing.
    #[error("window list unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by the detection engine.
///
/// Only [`DetectionError::PermissionDenied`] and a run of
/// [`DetectionError::EnumerationFailure`]s beyond the configured threshold
/// move the coordinator into its error state; everything else is absorbed
/// by the pass that hit it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    /// This process is not trusted for Accessibility.
    #[error("Accessibility permission denied")]
    PermissionDenied,

    /// The window list could not be read.
    #[error("window enumeration failed ({consecutive} consecutive): {reason}")]
    EnumerationFailure {
        /// Number of consecutive failed passes including this one.
        consecutive: u32,
        /// Collaborator-provided reason.
        reason: String,
    },

    /// No positionable content element was found; the window is not repositionable.
    #[error("no positionable element found")]
    ElementNotFound,

    /// The element's position attribute is not settable.
    #[error("position attribute not settable")]
    AttributeUnsettable,

    /// The position read back after a write did not match the target.
    #[error("verification mismatch: expected {expected} got {actual:?}")]
    VerificationMismatch {
        /// Position that was written.
        expected: Point,
        /// Position read back, if any.
        actual: Option<Point>,
    },

    /// Geometry reads kept failing after the retry budget.
    #[error("element geometry not ready")]
    NotReady,

    /// The element vanished between location and mutation.
    #[error("element gone")]
    WindowGone,

    /// Configuration could not be applied.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The coordinator task is no longer running.
    #[error("coordinator closed")]
    Closed,

    /// A state transition was rejected.
    #[error("invalid transition {from} -> {to}")]
    InvalidTransition {
        /// State at the time of the request.
        from: MonitoringState,
        /// Requested state.
        to: MonitoringState,
    },
}

impl DetectionError {
    /// True for the error classes that can move the coordinator into its
    /// error state.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied | Self::EnumerationFailure { .. }
        )
    }
}

impl From<AxError> for DetectionError {
    fn from(err: AxError) -> Self {
        match err {
            AxError::Permission => Self::PermissionDenied,
            AxError::Gone => Self::WindowGone,
            AxError::NotReady | AxError::Code(_) => Self::NotReady,
        }
    }
}

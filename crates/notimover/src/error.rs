//! Error handling for the notimover binary.

use std::{io, result};

use notimover_engine::{DetectionError, ListError};
use thiserror::Error;

/// Convenient result type for notimover commands.
pub type Result<T> = result::Result<T, Error>;

/// Errors that end a notimover command.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrapper for standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Settings file could not be loaded.
    #[error("{}", .0.pretty())]
    Config(#[from] config::Error),
    /// The platform layer could not be brought up.
    #[error("Platform error: {0}")]
    Platform(#[from] mac_notify_ax::Error),
    /// The monitor refused an operation or failed.
    #[error("Monitor error: {0}")]
    Detection(#[from] DetectionError),
    /// The window list could not be read.
    #[error("Window list error: {0}")]
    WindowList(#[from] ListError),
    /// JSON rendering failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Accessibility permission is missing.
    #[error("Accessibility permission is not granted; enable notimover in System Settings > Privacy & Security > Accessibility")]
    PermissionDenied,
}

use std::result::Result as StdResult;

use notimover_engine::AxError;
use thiserror::Error;

/// `kAXErrorInvalidUIElement`: the element is gone (window closed, stale reference).
pub const K_AX_ERROR_INVALID_UI_ELEMENT: i32 = -25202;
/// `kAXErrorCannotComplete`: the target did not answer in time.
pub const K_AX_ERROR_CANNOT_COMPLETE: i32 = -25204;
/// `kAXErrorAttributeUnsupported`.
pub const K_AX_ERROR_ATTRIBUTE_UNSUPPORTED: i32 = -25205;
/// `kAXErrorNotImplemented`.
pub const K_AX_ERROR_NOT_IMPLEMENTED: i32 = -25208;
/// `kAXErrorNotificationAlreadyRegistered`.
pub const K_AX_ERROR_NOTIFICATION_ALREADY_REGISTERED: i32 = -25209;
/// `kAXErrorAPIDisabled`: this process is not trusted.
pub const K_AX_ERROR_API_DISABLED: i32 = -25211;
/// `kAXErrorNoValue`.
pub const K_AX_ERROR_NO_VALUE: i32 = -25212;

/// Errors raised by the macOS collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Accessibility permission is required but not granted.
    #[error("Accessibility permission missing")]
    Permission,

    /// Failed to create an Accessibility API application element.
    #[error("Failed to create AX application element")]
    AppElement,

    /// An Accessibility API operation failed with the given error code.
    #[error("AX operation failed: code {0}")]
    AxCode(i32),

    /// The AX element became invalid (e.g., window closed) during the operation.
    #[error("AX element invalid (window gone)")]
    WindowGone,

    /// The attribute exists but its value could not be decoded.
    #[error("Unsupported attribute")]
    Unsupported,

    /// The observer host thread is not running.
    #[error("observer host unavailable: {0}")]
    ObserverHost(String),

    /// Accessibility is only available on macOS.
    #[error("not supported on this platform")]
    UnsupportedPlatform,
}

/// Result alias for this crate.
pub type Result<T> = StdResult<T, Error>;

/// Interpret an AX status code. `Ok(false)` means the attribute is absent.
pub fn ax_status(code: i32) -> Result<bool> {
    match code {
        0 => Ok(true),
        K_AX_ERROR_ATTRIBUTE_UNSUPPORTED | K_AX_ERROR_NO_VALUE | K_AX_ERROR_NOT_IMPLEMENTED => {
            Ok(false)
        }
        K_AX_ERROR_INVALID_UI_ELEMENT => Err(Error::WindowGone),
        K_AX_ERROR_API_DISABLED => Err(Error::Permission),
        e => Err(Error::AxCode(e)),
    }
}

impl From<Error> for AxError {
    fn from(err: Error) -> Self {
        match err {
            Error::Permission => Self::Permission,
            Error::WindowGone => Self::Gone,
            Error::Unsupported => Self::NotReady,
            Error::AxCode(K_AX_ERROR_CANNOT_COMPLETE) => Self::NotReady,
            Error::AxCode(c) => Self::Code(c),
            Error::AppElement | Error::ObserverHost(_) | Error::UnsupportedPlatform => {
                Self::Code(K_AX_ERROR_CANNOT_COMPLETE)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_engine_classes() {
        assert_eq!(ax_status(0), Ok(true));
        assert_eq!(ax_status(K_AX_ERROR_NO_VALUE), Ok(false));
        assert_eq!(ax_status(K_AX_ERROR_ATTRIBUTE_UNSUPPORTED), Ok(false));
        assert_eq!(
            ax_status(K_AX_ERROR_INVALID_UI_ELEMENT).map_err(AxError::from),
            Err(AxError::Gone)
        );
        assert_eq!(
            ax_status(K_AX_ERROR_API_DISABLED).map_err(AxError::from),
            Err(AxError::Permission)
        );
        assert_eq!(
            ax_status(K_AX_ERROR_CANNOT_COMPLETE).map_err(AxError::from),
            Err(AxError::NotReady)
        );
        assert_eq!(
            ax_status(-25200).map_err(AxError::from),
            Err(AxError::Code(-25200))
        );
    }
}

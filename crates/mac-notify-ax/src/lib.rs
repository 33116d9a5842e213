//! mac-notify-ax: macOS collaborators for the notimover engine.
//!
//! Implements the engine's platform traits against the real system:
//! - window list via `CGWindowListCopyWindowInfo`
//! - element reads and writes via the Accessibility API, behind a bounded
//!   handle table
//! - `AXObserver` notifications hosted on a dedicated run-loop thread
//! - screen geometry via AppKit, with a CoreGraphics fallback
//!
//! All operations except the window list require Accessibility permission.
//! On other targets only the error type and handle table are built, and
//! [`platform`] returns [`Error::UnsupportedPlatform`].

mod error;
mod handles;

#[cfg(target_os = "macos")]
mod access;
#[cfg(target_os = "macos")]
mod ax;
#[cfg(target_os = "macos")]
mod cfutil;
#[cfg(target_os = "macos")]
mod observer;
#[cfg(target_os = "macos")]
mod screen;
#[cfg(target_os = "macos")]
mod window;

#[cfg(target_os = "macos")]
pub use access::{MacAx, MacPermissions};
pub use error::{Error, Result};
pub use handles::{DEFAULT_HANDLE_CAPACITY, HandleTable};
use notimover_engine::Platform;
#[cfg(target_os = "macos")]
pub use observer::ObserverHost;
#[cfg(target_os = "macos")]
pub use screen::MacScreen;
#[cfg(target_os = "macos")]
pub use window::{CgWindowSource, list_windows};

/// Build the macOS collaborator bundle. Starts the observer host thread.
#[cfg(target_os = "macos")]
pub fn platform() -> Result<Platform> {
    use std::sync::Arc;

    let ax = Arc::new(MacAx::new());
    Ok(Platform {
        windows: Arc::new(CgWindowSource),
        query: ax.clone(),
        mutate: ax,
        events: Arc::new(ObserverHost::spawn()?),
        permissions: Arc::new(MacPermissions),
        screen: Arc::new(MacScreen::new()),
    })
}

/// Build the macOS collaborator bundle. Always fails off macOS.
#[cfg(not(target_os = "macos"))]
pub fn platform() -> Result<Platform> {
    Err(Error::UnsupportedPlatform)
}

//! macOS permission checks for notimover.
//!
//! Answers whether the process may use the Accessibility API (required to
//! read and move notification elements) and whether it holds Screen
//! Recording (without it, window titles are blank in the window list; the
//! engine does not need them). There is no prompting logic here: the host is
//! responsible for guiding the user to System Settings.
//!
//! On other targets every check reports `false`.
use serde::Serialize;

#[cfg(target_os = "macos")]
#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn AXIsProcessTrusted() -> bool;
    fn CGPreflightScreenCaptureAccess() -> bool;
}

/// Check if the process is trusted for Accessibility.
#[cfg(target_os = "macos")]
pub fn accessibility_ok() -> bool {
    unsafe { AXIsProcessTrusted() }
}

/// Check if the process is trusted for Accessibility.
#[cfg(not(target_os = "macos"))]
pub fn accessibility_ok() -> bool {
    false
}

/// Check if the application has the "Screen Recording" permission.
#[cfg(target_os = "macos")]
pub fn screen_recording_ok() -> bool {
    unsafe { CGPreflightScreenCaptureAccess() }
}

/// Check if the application has the "Screen Recording" permission.
#[cfg(not(target_os = "macos"))]
pub fn screen_recording_ok() -> bool {
    false
}

/// Current permission status for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionsStatus {
    /// Accessibility (AX) permission; `true` if granted.
    pub accessibility_ok: bool,
    /// Screen Recording permission; `true` if granted.
    pub screen_recording_ok: bool,
}

impl PermissionsStatus {
    /// True when everything notimover requires is granted.
    pub fn ready(&self) -> bool {
        self.accessibility_ok
    }
}

/// Query all checks. Performs no prompting and has no side effects.
pub fn check_permissions() -> PermissionsStatus {
    PermissionsStatus {
        accessibility_ok: accessibility_ok(),
        screen_recording_ok: screen_recording_ok(),
    }
}

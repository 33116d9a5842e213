//! Identifiers for windows and accessibility elements.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Alias for CoreGraphics CGWindowID (kCGWindowNumber).
pub type WindowNumber = u32;

/// Registry key for an on-screen window.
///
/// The key couples the owning process id and the window server's window
/// number. The window server reuses numbers over its lifetime, so a key only
/// identifies a window for as long as it stays on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowKey {
    /// Process identifier that owns the window.
    pid: i32,
    /// Window server number (`kCGWindowNumber`).
    number: WindowNumber,
}

impl WindowKey {
    /// Construct a new key from the owning process id and window number.
    #[must_use]
    pub const fn new(pid: i32, number: WindowNumber) -> Self {
        Self { pid, number }
    }

    /// Owning process id.
    #[must_use]
    pub const fn pid(self) -> i32 {
        self.pid
    }

    /// Window server number.
    #[must_use]
    pub const fn number(self) -> WindowNumber {
        self.number
    }
}

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pid, self.number)
    }
}

impl From<(i32, WindowNumber)> for WindowKey {
    fn from(value: (i32, WindowNumber)) -> Self {
        Self::new(value.0, value.1)
    }
}

/// Opaque handle to an OS-owned accessibility element.
///
/// Handles are minted by the [`AxQuery`](crate::AxQuery) implementation and
/// only mean something to it. They never keep the element alive: callers
/// must revalidate with [`AxQuery::is_alive`](crate::AxQuery::is_alive)
/// before mutating through one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ElementRef(u64);

impl ElementRef {
    /// Wrap a raw handle value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw handle value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "el#{}", self.0)
    }
}

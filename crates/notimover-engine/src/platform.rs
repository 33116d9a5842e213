//! Collaborator traits the engine is built against.
//!
//! Production implementations live in `mac-notify-ax`; in-memory fakes live in
//! [`crate::test_support`]. The engine only ever holds these behind
//! `Arc<dyn …>` inside a [`Platform`] bundle.

use std::{fmt, sync::Arc};

use tokio::sync::mpsc::UnboundedSender;

use crate::{
    error::{AxResult, ListError},
    geom::{Point, Size},
    ids::ElementRef,
    model::{ScreenGeometry, WindowDescriptor},
};

/// Read access to the OS window list.
pub trait WindowSource: Send + Sync {
    /// Return all on-screen windows (all layers, desktop elements excluded).
    fn list_windows(&self) -> Result<Vec<WindowDescriptor>, ListError>;
}

/// Read access to accessibility elements.
///
/// Absent or unsupported attributes read as `Ok(None)`; `Err` is reserved for
/// element-level failures such as an invalid handle.
pub trait AxQuery: Send + Sync {
    /// Root accessibility element for a listed window.
    fn window_element(&self, window: &WindowDescriptor) -> AxResult<Option<ElementRef>>;
    /// Direct children of `el`.
    fn children(&self, el: ElementRef) -> AxResult<Vec<ElementRef>>;
    /// `AXRole`.
    fn role(&self, el: ElementRef) -> AxResult<Option<String>>;
    /// `AXSubrole`.
    fn subrole(&self, el: ElementRef) -> AxResult<Option<String>>;
    /// `AXIdentifier`.
    fn identifier(&self, el: ElementRef) -> AxResult<Option<String>>;
    /// `AXPosition` in top-left coordinates.
    fn position(&self, el: ElementRef) -> AxResult<Option<Point>>;
    /// `AXSize`.
    fn size(&self, el: ElementRef) -> AxResult<Option<Size>>;
    /// Whether `AXPosition` is settable on `el`.
    fn is_position_settable(&self, el: ElementRef) -> AxResult<bool>;
    /// Whether the handle still refers to a live element.
    fn is_alive(&self, el: ElementRef) -> bool;
}

/// Write access to accessibility elements.
pub trait AxMutate: Send + Sync {
    /// Set `AXPosition` (top-left coordinates).
    fn set_position(&self, el: ElementRef, p: Point) -> AxResult<()>;
}

/// Notification delivered by an accessibility observer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AxSignal {
    /// A window was created in the observed process.
    WindowCreated {
        /// Observed process id.
        pid: i32,
    },
    /// An element in the observed process was destroyed.
    ElementDestroyed {
        /// Observed process id.
        pid: i32,
    },
}

/// Live observer registration; dropping it deregisters.
pub trait Subscription: Send {}

/// Registration for accessibility notifications.
pub trait AxEvents: Send + Sync {
    /// Observe window-created / element-destroyed notifications for `pid`.
    /// Signals are delivered on `sink` from an arbitrary thread.
    fn subscribe(
        &self,
        pid: i32,
        sink: UnboundedSender<AxSignal>,
    ) -> AxResult<Box<dyn Subscription>>;
}

/// Authorization check.
pub trait PermissionCheck: Send + Sync {
    /// True when this process may use the accessibility query and mutation APIs.
    fn accessibility_trusted(&self) -> bool;
}

/// Screen geometry provider.
pub trait ScreenSource: Send + Sync {
    /// Geometry of the screen notifications render on.
    fn notification_screen(&self) -> Option<ScreenGeometry>;
}

/// Bundle of collaborators injected into the monitor.
#[derive(Clone)]
pub struct Platform {
    /// Window listing.
    pub windows: Arc<dyn WindowSource>,
    /// Accessibility reads.
    pub query: Arc<dyn AxQuery>,
    /// Accessibility writes.
    pub mutate: Arc<dyn AxMutate>,
    /// Accessibility notifications.
    pub events: Arc<dyn AxEvents>,
    /// Permission check.
    pub permissions: Arc<dyn PermissionCheck>,
    /// Screen geometry.
    pub screen: Arc<dyn ScreenSource>,
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}

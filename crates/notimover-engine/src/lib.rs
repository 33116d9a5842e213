//! notimover engine
//!
//! Finds notification banners owned by the notification center, works out
//! where their content element lives in the accessibility tree, and moves
//! that element to one of nine screen anchors.
//!
//! The engine is written against the collaborator traits in [`platform`]; the
//! macOS implementations live in `mac-notify-ax`. The public surface is small:
//! - [`Monitor`]: registry, state machine and the detection pass
//! - [`Coordinator`] / [`CoordinatorHandle`]: async driver with polling,
//!   debounced observer events and lifecycle commands
//! - [`PositionCalculator`] and [`ElementLocator`]: usable on their own for
//!   one-shot tools
mod applier;
pub mod calculator;
mod config;
mod coordinator;
mod delegate;
mod enumerator;
mod error;
mod geom;
mod ids;
pub mod locator;
mod model;
mod monitor;
pub mod platform;
mod schedule;
mod state;
mod widget;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use applier::{PositionApplier, RetryPolicy};
pub use calculator::{PaddingConfig, PositionCalculator, calculate, is_valid};
pub use config::MonitorCfg;
pub use coordinator::{Coordinator, CoordinatorHandle};
pub use delegate::{MonitorDelegate, NoopDelegate};
pub use enumerator::{Diff, Enumerated, WindowEnumerator};
pub use error::{AxError, AxResult, DetectionError, ListError, Result};
pub use geom::{Point, Rect, Size, from_ax_origin, to_ax_origin};
pub use ids::{ElementRef, WindowKey, WindowNumber};
pub use locator::{ElementLocator, LocateReport, Located, LocatorCfg, Strategy};
pub use model::{
    Anchor, AnchorColumn, AnchorRow, DEFAULT_NOTIFICATION_OWNERS, FilterCriteria,
    NotificationKind, ParseAnchorError, ScreenGeometry, TrackedWindow, WindowDescriptor,
};
pub use monitor::{
    GeometryCache, Monitor, MonitorStatus, PassReport, SkipReason, Skipped, Trigger,
};
pub use platform::{
    AxEvents, AxMutate, AxQuery, AxSignal, PermissionCheck, Platform, ScreenSource,
    Subscription, WindowSource,
};
pub use schedule::{Debouncer, Throttle};
pub use state::{MonitoringState, StateCell};
pub use widget::{DEFAULT_WIDGET_PATTERN, PanelEvent, PanelScan, WidgetPanelWatcher};

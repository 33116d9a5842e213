//! Core data model: anchors, notification kinds, filters, and tracked windows.

use std::{collections::HashSet, fmt, str::FromStr, time::Instant};

use serde::{Deserialize, Serialize};

use crate::{
    geom::{Point, Rect, Size},
    ids::{ElementRef, WindowKey, WindowNumber},
    locator::Strategy,
};

/// Row of an [`Anchor`] on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnchorRow {
    /// Top edge.
    Top,
    /// Vertical middle.
    Middle,
    /// Bottom edge.
    Bottom,
}

/// Column of an [`Anchor`] on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnchorColumn {
    /// Left edge.
    Left,
    /// Horizontal center.
    Center,
    /// Right edge.
    Right,
}

/// One of nine screen placements for notification content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Anchor {
    /// Top-left corner.
    TopLeft,
    /// Middle of the top edge.
    TopMiddle,
    /// Top-right corner (the system default).
    TopRight,
    /// Middle of the left edge.
    MiddleLeft,
    /// Screen center.
    DeadCenter,
    /// Middle of the right edge.
    MiddleRight,
    /// Bottom-left corner.
    BottomLeft,
    /// Middle of the bottom edge.
    BottomMiddle,
    /// Bottom-right corner.
    #[default]
    BottomRight,
}

impl Anchor {
    /// All anchors in row-major order.
    pub const ALL: [Self; 9] = [
        Self::TopLeft,
        Self::TopMiddle,
        Self::TopRight,
        Self::MiddleLeft,
        Self::DeadCenter,
        Self::MiddleRight,
        Self::BottomLeft,
        Self::BottomMiddle,
        Self::BottomRight,
    ];

    /// Row this anchor sits in.
    #[must_use]
    pub const fn row(self) -> AnchorRow {
        match self {
            Self::TopLeft | Self::TopMiddle | Self::TopRight => AnchorRow::Top,
            Self::MiddleLeft | Self::DeadCenter | Self::MiddleRight => AnchorRow::Middle,
            Self::BottomLeft | Self::BottomMiddle | Self::BottomRight => AnchorRow::Bottom,
        }
    }

    /// Column this anchor sits in.
    #[must_use]
    pub const fn column(self) -> AnchorColumn {
        match self {
            Self::TopLeft | Self::MiddleLeft | Self::BottomLeft => AnchorColumn::Left,
            Self::TopMiddle | Self::DeadCenter | Self::BottomMiddle => AnchorColumn::Center,
            Self::TopRight | Self::MiddleRight | Self::BottomRight => AnchorColumn::Right,
        }
    }

    /// True for the edge midpoints and the center, which use center-class padding.
    #[must_use]
    pub const fn is_center_class(self) -> bool {
        matches!(self.column(), AnchorColumn::Center) || matches!(self.row(), AnchorRow::Middle)
    }

    /// Kebab-case name used on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopMiddle => "top-middle",
            Self::TopRight => "top-right",
            Self::MiddleLeft => "middle-left",
            Self::DeadCenter => "dead-center",
            Self::MiddleRight => "middle-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomMiddle => "bottom-middle",
            Self::BottomRight => "bottom-right",
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when an anchor name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown anchor '{0}' (expected one of top-left, top-middle, top-right, middle-left, dead-center, middle-right, bottom-left, bottom-middle, bottom-right)")]
pub struct ParseAnchorError(pub String);

impl FromStr for Anchor {
    type Err = ParseAnchorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let anchor = match norm.as_str() {
            "topleft" => Self::TopLeft,
            "topmiddle" | "topcenter" => Self::TopMiddle,
            "topright" => Self::TopRight,
            "middleleft" | "centerleft" => Self::MiddleLeft,
            "deadcenter" | "center" | "middle" => Self::DeadCenter,
            "middleright" | "centerright" => Self::MiddleRight,
            "bottomleft" => Self::BottomLeft,
            "bottommiddle" | "bottomcenter" => Self::BottomMiddle,
            "bottomright" => Self::BottomRight,
            _ => return Err(ParseAnchorError(s.to_string())),
        };
        Ok(anchor)
    }
}

/// Classification of a located notification surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    /// Short-lived, small banner.
    Banner,
    /// Persistent alert with action buttons.
    Alert,
    /// The notification center tray; never repositioned.
    CenterPanel,
    /// Could not be classified.
    Unknown,
}

impl NotificationKind {
    /// True for kinds the engine is allowed to move.
    #[must_use]
    pub const fn is_repositionable(self) -> bool {
        matches!(self, Self::Banner | Self::Alert)
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Banner => "banner",
            Self::Alert => "alert",
            Self::CenterPanel => "center-panel",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Default owners of notification surfaces on macOS.
pub const DEFAULT_NOTIFICATION_OWNERS: &[&str] = &[
    "NotificationCenter",
    "Notification Center",
    "UserNotificationCenter",
];

/// Criteria deciding which windows and elements are candidates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Minimum content width.
    pub min_width: f64,
    /// Maximum content width.
    pub max_width: f64,
    /// Minimum content height.
    pub min_height: f64,
    /// Maximum content height.
    pub max_height: f64,
    /// Kinds that may be repositioned.
    pub allowed_kinds: HashSet<NotificationKind>,
    /// When set, only these subroles count as exact subrole matches.
    pub allowed_subroles: Option<HashSet<String>>,
    /// Never reposition the notification center tray.
    pub exclude_center_panel: bool,
    /// Owning application names treated as notification producers. Empty
    /// means any owner.
    pub owners: Vec<String>,
    /// Also consider windows of other owners that sit above the normal
    /// application layer and fit the content bounds. These are kept only
    /// when the locator finds notification content by subrole or identifier.
    pub foreign_overlays: bool,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min_width: 100.0,
            max_width: 800.0,
            min_height: 30.0,
            max_height: 600.0,
            allowed_kinds: [NotificationKind::Banner, NotificationKind::Alert]
                .into_iter()
                .collect(),
            allowed_subroles: None,
            exclude_center_panel: true,
            owners: DEFAULT_NOTIFICATION_OWNERS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            foreign_overlays: true,
        }
    }
}

impl FilterCriteria {
    /// True when `size` lies inside the configured bounds (inclusive).
    #[must_use]
    pub fn size_within(&self, size: Size) -> bool {
        size.width >= self.min_width
            && size.width <= self.max_width
            && size.height >= self.min_height
            && size.height <= self.max_height
    }

    /// Coarse window-level check: only the minimum bounds apply, since
    /// notification hosts can be larger than the content they carry.
    #[must_use]
    pub fn window_passes(&self, bounds: &Rect) -> bool {
        bounds.w >= self.min_width && bounds.h >= self.min_height
    }

    /// True when `owner` is one of the configured notification owners.
    #[must_use]
    pub fn owner_matches(&self, owner: &str) -> bool {
        self.owners.is_empty() || self.owners.iter().any(|o| o == owner)
    }

    /// True when a window from a non-notification owner is worth locating:
    /// above layer 0 and inside the content bounds as a whole.
    #[must_use]
    pub fn overlay_passes(&self, w: &WindowDescriptor) -> bool {
        self.foreign_overlays && w.layer > 0 && self.size_within(w.bounds.size())
    }

    /// True when `kind` may be repositioned under these criteria.
    #[must_use]
    pub fn kind_allowed(&self, kind: NotificationKind) -> bool {
        if kind == NotificationKind::CenterPanel && self.exclude_center_panel {
            return false;
        }
        kind.is_repositionable() && self.allowed_kinds.contains(&kind)
    }
}

/// One entry of the OS window list.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowDescriptor {
    /// Window server number.
    pub id: WindowNumber,
    /// Owning process id.
    pub pid: i32,
    /// Owning application name.
    pub owner: String,
    /// Window bounds in AX (top-left) coordinates.
    pub bounds: Rect,
    /// Window layer; 0 is the normal application layer.
    pub layer: i32,
}

impl WindowDescriptor {
    /// Registry key for this window.
    #[must_use]
    pub const fn key(&self) -> WindowKey {
        WindowKey::new(self.pid, self.id)
    }
}

/// Geometry of the screen notifications render on, in bottom-left coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScreenGeometry {
    /// Full frame of the screen.
    pub frame: Rect,
    /// Frame excluding menu bar and Dock.
    pub visible: Rect,
    /// Height of the primary screen, used to convert to AX coordinates.
    pub primary_height: f64,
}

impl ScreenGeometry {
    /// A single screen at the origin with no Dock or menu bar.
    #[must_use]
    pub const fn simple(width: f64, height: f64) -> Self {
        let frame = Rect::new(0.0, 0.0, width, height);
        Self {
            frame,
            visible: frame,
            primary_height: height,
        }
    }

    /// Space reserved at the bottom of the screen (usually the Dock).
    #[must_use]
    pub fn dock_reservation(&self) -> f64 {
        (self.visible.y - self.frame.y).max(0.0)
    }
}

/// A notification window currently known to the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedWindow {
    /// Registry key.
    pub key: WindowKey,
    /// Located content element. Non-owning; revalidate before use.
    pub element: ElementRef,
    /// Last observed content position (AX top-left coordinates).
    pub position: Point,
    /// Last observed content size.
    pub size: Size,
    /// Owning process id.
    pub pid: i32,
    /// When the window was first detected.
    pub detected_at: Instant,
    /// When the entry was last refreshed.
    pub updated_at: Instant,
    /// Classification of the content.
    pub kind: NotificationKind,
    /// True once a reposition has been applied and verified.
    pub has_been_repositioned: bool,
    /// Position observed at detection time; never changes afterwards.
    initial_position: Point,
    /// Locator strategy that found the element.
    pub strategy: Strategy,
    /// Last target applied (AX coordinates), if any.
    pub target: Option<Point>,
}

impl TrackedWindow {
    /// Create a new entry for a freshly located window.
    #[must_use]
    pub fn new(
        key: WindowKey,
        element: ElementRef,
        frame: Rect,
        kind: NotificationKind,
        strategy: Strategy,
        now: Instant,
    ) -> Self {
        Self {
            key,
            element,
            position: frame.origin(),
            size: frame.size(),
            pid: key.pid(),
            detected_at: now,
            updated_at: now,
            kind,
            has_been_repositioned: false,
            initial_position: frame.origin(),
            strategy,
            target: None,
        }
    }

    /// Position observed when the window was detected.
    #[must_use]
    pub const fn initial_position(&self) -> Point {
        self.initial_position
    }

    /// Current frame in AX coordinates.
    #[must_use]
    pub const fn frame(&self) -> Rect {
        Rect::from_parts(self.position, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_parse_accepts_common_spellings() {
        assert_eq!("bottom-right".parse::<Anchor>(), Ok(Anchor::BottomRight));
        assert_eq!("BottomRight".parse::<Anchor>(), Ok(Anchor::BottomRight));
        assert_eq!("dead_center".parse::<Anchor>(), Ok(Anchor::DeadCenter));
        assert_eq!("top-center".parse::<Anchor>(), Ok(Anchor::TopMiddle));
        assert!("upper-left".parse::<Anchor>().is_err());
        for a in Anchor::ALL {
            assert_eq!(a.name().parse::<Anchor>(), Ok(a));
        }
    }

    #[test]
    fn center_class_covers_midpoints_only() {
        let center: Vec<Anchor> = Anchor::ALL
            .into_iter()
            .filter(|a| a.is_center_class())
            .collect();
        assert_eq!(
            center,
            vec![
                Anchor::TopMiddle,
                Anchor::MiddleLeft,
                Anchor::DeadCenter,
                Anchor::MiddleRight,
                Anchor::BottomMiddle,
            ]
        );
    }

    #[test]
    fn filter_excludes_center_panel_even_if_allowed() {
        let mut f = FilterCriteria::default();
        f.allowed_kinds.insert(NotificationKind::CenterPanel);
        assert!(!f.kind_allowed(NotificationKind::CenterPanel));
        assert!(f.kind_allowed(NotificationKind::Banner));
        assert!(!f.kind_allowed(NotificationKind::Unknown));
    }

    #[test]
    fn owner_list_empty_matches_anything() {
        let f = FilterCriteria {
            owners: Vec::new(),
            ..FilterCriteria::default()
        };
        assert!(f.owner_matches("Anything"));
        assert!(FilterCriteria::default().owner_matches("NotificationCenter"));
        assert!(!FilterCriteria::default().owner_matches("Safari"));
    }

    #[test]
    fn overlays_need_raised_layer_and_content_size() {
        let overlay = |layer: i32, w: f64, h: f64| WindowDescriptor {
            id: 1,
            pid: 900,
            owner: "Reminders".into(),
            bounds: Rect::new(1550.0, 30.0, w, h),
            layer,
        };
        let f = FilterCriteria::default();
        assert!(f.overlay_passes(&overlay(23, 320.0, 100.0)));
        assert!(!f.overlay_passes(&overlay(0, 320.0, 100.0)));
        assert!(!f.overlay_passes(&overlay(20, 1920.0, 70.0)));
        assert!(!f.overlay_passes(&overlay(25, 24.0, 22.0)));
        let off = FilterCriteria {
            foreign_overlays: false,
            ..FilterCriteria::default()
        };
        assert!(!off.overlay_passes(&overlay(23, 320.0, 100.0)));
    }

    #[test]
    fn dock_reservation_from_visible_frame() {
        let s = ScreenGeometry {
            frame: Rect::new(0.0, 0.0, 1920.0, 1080.0),
            visible: Rect::new(0.0, 70.0, 1920.0, 985.0),
            primary_height: 1080.0,
        };
        assert_eq!(s.dock_reservation(), 70.0);
        assert_eq!(ScreenGeometry::simple(800.0, 600.0).dock_reservation(), 0.0);
    }
}

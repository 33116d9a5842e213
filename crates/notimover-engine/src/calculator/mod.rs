//! Pure anchor → target point computation.
//!
//! All inputs and outputs use bottom-left-origin screen coordinates. Convert
//! with [`crate::geom::to_ax_origin`] before writing through the
//! accessibility API.

#[cfg(test)]
mod property_tests;

use serde::{Deserialize, Serialize};

use crate::{
    geom::{Point, Rect, Size},
    model::{Anchor, AnchorColumn, AnchorRow, ScreenGeometry},
};

/// Extra space added above the Dock for bottom anchors.
pub const DEFAULT_EXTRA_BOTTOM_PADDING: f64 = 30.0;

/// Inset applied by [`is_valid`].
pub const VALIDITY_MARGIN: f64 = 20.0;
/// Rounding allowance applied by [`is_valid`].
pub const VALIDITY_OVERFLOW: f64 = 20.0;

/// Float noise tolerated by [`is_valid`].
const VALIDITY_EPS: f64 = 1e-6;

/// Padding by anchor class.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaddingConfig {
    /// Padding for corner anchors.
    pub edge: f64,
    /// Padding for edge-midpoint and center anchors.
    pub center: f64,
}

impl Default for PaddingConfig {
    fn default() -> Self {
        Self {
            edge: 20.0,
            center: 40.0,
        }
    }
}

impl PaddingConfig {
    /// Padding that applies to `anchor`.
    #[must_use]
    pub fn for_anchor(&self, anchor: Anchor) -> f64 {
        if anchor.is_center_class() {
            self.center
        } else {
            self.edge
        }
    }
}

/// Compute where content of size `content` should go for `anchor`, with the
/// default extra bottom padding.
#[must_use]
pub fn calculate(
    content: Size,
    anchor: Anchor,
    screen: Rect,
    dock_reservation: f64,
    padding: f64,
) -> Point {
    calculate_with(
        content,
        anchor,
        screen,
        dock_reservation,
        padding,
        DEFAULT_EXTRA_BOTTOM_PADDING,
    )
}

/// [`calculate`] with an explicit extra bottom padding.
///
/// The result is offset by the screen origin and, whenever the content fits,
/// clamped so the content stays on `screen`.
#[must_use]
pub fn calculate_with(
    content: Size,
    anchor: Anchor,
    screen: Rect,
    dock_reservation: f64,
    padding: f64,
    extra_bottom: f64,
) -> Point {
    let (sw, sh) = (screen.w, screen.h);
    let (cw, ch) = (content.width, content.height);
    let x = match anchor.column() {
        AnchorColumn::Left => padding,
        AnchorColumn::Center => (sw - cw) / 2.0,
        AnchorColumn::Right => sw - cw - padding,
    };
    let y = match anchor.row() {
        AnchorRow::Top => sh - ch - padding,
        AnchorRow::Middle => (sh - ch) / 2.0,
        AnchorRow::Bottom => dock_reservation + padding + extra_bottom,
    };
    Point::new(
        screen.x + clamp_axis(x, sw - cw),
        screen.y + clamp_axis(y, sh - ch),
    )
}

/// Clamp into `[0, max]`; content larger than the screen pins to 0.
fn clamp_axis(v: f64, max: f64) -> f64 {
    if max <= 0.0 { 0.0 } else { v.clamp(0.0, max) }
}

/// True when content at `point` stays within `screen` inset by
/// [`VALIDITY_MARGIN`], allowing [`VALIDITY_OVERFLOW`] for edge rounding.
#[must_use]
pub fn is_valid(point: Point, content: Size, screen: Rect) -> bool {
    let slack = VALIDITY_MARGIN - VALIDITY_OVERFLOW - VALIDITY_EPS;
    point.x >= screen.left() + slack
        && point.y >= screen.bottom() + slack
        && point.x + content.width <= screen.right() - slack
        && point.y + content.height <= screen.top() - slack
}

/// Anchor and padding bundled with the screen-derived inputs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionCalculator {
    /// Padding by anchor class.
    pub padding: PaddingConfig,
    /// Extra bottom padding above the Dock.
    pub extra_bottom: f64,
}

impl Default for PositionCalculator {
    fn default() -> Self {
        Self {
            padding: PaddingConfig::default(),
            extra_bottom: DEFAULT_EXTRA_BOTTOM_PADDING,
        }
    }
}

impl PositionCalculator {
    /// Target for `content` on `screen`, in bottom-left coordinates.
    #[must_use]
    pub fn target(&self, content: Size, anchor: Anchor, screen: &ScreenGeometry) -> Point {
        calculate_with(
            content,
            anchor,
            screen.frame,
            screen.dock_reservation(),
            self.padding.for_anchor(anchor),
            self.extra_bottom,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Rect = Rect::new(0.0, 0.0, 1920.0, 1080.0);
    const BANNER: Size = Size::new(300.0, 80.0);

    #[test]
    fn bottom_right_with_edge_padding() {
        assert_eq!(
            calculate(BANNER, Anchor::BottomRight, SCREEN, 0.0, 20.0),
            Point::new(1600.0, 50.0)
        );
    }

    #[test]
    fn dead_center_ignores_padding() {
        assert_eq!(
            calculate(BANNER, Anchor::DeadCenter, SCREEN, 0.0, 20.0),
            Point::new(810.0, 500.0)
        );
    }

    #[test]
    fn top_left_and_top_right() {
        assert_eq!(
            calculate(BANNER, Anchor::TopLeft, SCREEN, 0.0, 20.0),
            Point::new(20.0, 980.0)
        );
        assert_eq!(
            calculate(BANNER, Anchor::TopRight, SCREEN, 0.0, 20.0),
            Point::new(1600.0, 980.0)
        );
    }

    #[test]
    fn bottom_anchors_clear_the_dock() {
        let p = calculate(BANNER, Anchor::BottomLeft, SCREEN, 70.0, 20.0);
        assert_eq!(p, Point::new(20.0, 120.0));
    }

    #[test]
    fn secondary_screen_origin_is_applied() {
        let screen = Rect::new(1920.0, -200.0, 1280.0, 800.0);
        let p = calculate(BANNER, Anchor::BottomRight, screen, 0.0, 20.0);
        assert_eq!(p, Point::new(1920.0 + 1280.0 - 300.0 - 20.0, -150.0));
    }

    #[test]
    fn oversized_content_pins_to_origin() {
        let p = calculate(
            Size::new(2000.0, 80.0),
            Anchor::BottomRight,
            SCREEN,
            0.0,
            20.0,
        );
        assert_eq!(p.x, 0.0);
    }

    #[test]
    fn padding_by_anchor_class() {
        let pad = PaddingConfig::default();
        assert_eq!(pad.for_anchor(Anchor::TopRight), 20.0);
        assert_eq!(pad.for_anchor(Anchor::TopMiddle), 40.0);
        assert_eq!(pad.for_anchor(Anchor::DeadCenter), 40.0);
    }

    #[test]
    fn calculator_uses_dock_and_padding() {
        let screen = ScreenGeometry {
            frame: SCREEN,
            visible: Rect::new(0.0, 70.0, 1920.0, 985.0),
            primary_height: 1080.0,
        };
        let calc = PositionCalculator::default();
        assert_eq!(
            calc.target(BANNER, Anchor::BottomRight, &screen),
            Point::new(1600.0, 120.0)
        );
        assert_eq!(
            calc.target(BANNER, Anchor::BottomMiddle, &screen),
            Point::new(810.0, 140.0)
        );
    }

    #[test]
    fn validity_rejects_offscreen_points() {
        assert!(is_valid(Point::new(1600.0, 50.0), BANNER, SCREEN));
        assert!(!is_valid(Point::new(1700.0, 50.0), BANNER, SCREEN));
        assert!(!is_valid(Point::new(-10.0, 50.0), BANNER, SCREEN));
    }
}

//! Size/position heuristics for notification kinds.

use crate::{
    geom::{Point, Size},
    model::{NotificationKind, ScreenGeometry},
};

/// Width above which content is treated as the center panel.
pub const CENTER_PANEL_MIN_WIDTH: f64 = 600.0;
/// Height above which content is treated as the center panel.
pub const CENTER_PANEL_MIN_HEIGHT: f64 = 300.0;
/// Banners are shorter than this.
pub const BANNER_MAX_HEIGHT: f64 = 100.0;

/// True when `size` is large enough to be the notification center tray.
#[inline]
pub fn is_center_panel_sized(size: Size) -> bool {
    size.width > CENTER_PANEL_MIN_WIDTH || size.height > CENTER_PANEL_MIN_HEIGHT
}

/// Classify located content from its size and AX (top-left) position.
///
/// Without screen geometry the position test is skipped and short content
/// counts as a banner.
pub fn classify(size: Size, ax_pos: Point, screen: Option<&ScreenGeometry>) -> NotificationKind {
    if !size.is_positive() {
        return NotificationKind::Unknown;
    }
    if is_center_panel_sized(size) {
        return NotificationKind::CenterPanel;
    }
    if size.height < BANNER_MAX_HEIGHT && in_upper_third(ax_pos, screen) {
        return NotificationKind::Banner;
    }
    NotificationKind::Alert
}

/// True when `ax_pos.y` lies in the upper third of the screen.
fn in_upper_third(ax_pos: Point, screen: Option<&ScreenGeometry>) -> bool {
    let Some(s) = screen else {
        return true;
    };
    let ax_top = s.primary_height - (s.frame.y + s.frame.h);
    ax_pos.y - ax_top < s.frame.h / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_content_is_center_panel() {
        let s = ScreenGeometry::simple(1920.0, 1080.0);
        assert_eq!(
            classify(Size::new(700.0, 80.0), Point::new(0.0, 0.0), Some(&s)),
            NotificationKind::CenterPanel
        );
        assert_eq!(
            classify(Size::new(350.0, 900.0), Point::new(0.0, 0.0), Some(&s)),
            NotificationKind::CenterPanel
        );
    }

    #[test]
    fn short_content_near_top_is_banner() {
        let s = ScreenGeometry::simple(1920.0, 1080.0);
        assert_eq!(
            classify(Size::new(344.0, 64.0), Point::new(1560.0, 40.0), Some(&s)),
            NotificationKind::Banner
        );
    }

    #[test]
    fn short_content_low_on_screen_is_alert() {
        let s = ScreenGeometry::simple(1920.0, 1080.0);
        assert_eq!(
            classify(Size::new(344.0, 64.0), Point::new(1560.0, 900.0), Some(&s)),
            NotificationKind::Alert
        );
    }

    #[test]
    fn tall_content_is_alert() {
        assert_eq!(
            classify(Size::new(344.0, 180.0), Point::new(0.0, 0.0), None),
            NotificationKind::Alert
        );
    }

    #[test]
    fn degenerate_size_is_unknown() {
        assert_eq!(
            classify(Size::new(0.0, 64.0), Point::new(0.0, 0.0), None),
            NotificationKind::Unknown
        );
    }
}

//! The `position` command: placement arithmetic without touching any window.

use notimover_engine::{
    PaddingConfig, Point, PositionCalculator, Rect, ScreenGeometry, Size, is_valid, to_ax_origin,
};

use crate::cli::PositionArgs;

/// Computed placement in both coordinate systems.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Origin with a bottom-left screen origin.
    pub origin: Point,
    /// Top-left corner in Accessibility (top-left origin) coordinates.
    pub ax: Point,
    /// Whether the content stays inside the screen margin.
    pub valid: bool,
}

/// Screen of `size` with `dock` reserved at the bottom.
fn screen_for(size: Size, dock: f64) -> ScreenGeometry {
    let dock = dock.clamp(0.0, size.height);
    ScreenGeometry {
        frame: Rect::new(0.0, 0.0, size.width, size.height),
        visible: Rect::new(0.0, dock, size.width, size.height - dock),
        primary_height: size.height,
    }
}

/// Compute the placement for `args`.
pub fn compute(args: &PositionArgs) -> Placement {
    let screen = screen_for(args.screen, args.dock);
    let mut calc = PositionCalculator::default();
    if let Some(p) = args.padding {
        calc.padding = PaddingConfig { edge: p, center: p };
    }
    let origin = calc.target(args.content, args.anchor, &screen);
    Placement {
        origin,
        ax: to_ax_origin(origin, args.content, screen.primary_height),
        valid: is_valid(origin, args.content, screen.frame),
    }
}

/// Print the placement for `args`.
pub fn run(args: &PositionArgs) {
    let p = compute(args);
    println!("anchor:  {}", args.anchor);
    println!("origin:  ({:.1}, {:.1})  (bottom-left origin)", p.origin.x, p.origin.y);
    println!("ax:      ({:.1}, {:.1})  (top-left origin)", p.ax.x, p.ax.y);
    if !p.valid {
        println!("warning: content does not fit inside the screen margin");
    }
}

#[cfg(test)]
mod tests {
    use notimover_engine::Anchor;

    use super::*;

    fn args(anchor: Anchor, padding: Option<f64>) -> PositionArgs {
        PositionArgs {
            anchor,
            screen: Size::new(1920.0, 1080.0),
            content: Size::new(300.0, 100.0),
            dock: 0.0,
            padding,
        }
    }

    #[test]
    fn top_right_default_padding() {
        let p = compute(&args(Anchor::TopRight, None));
        assert_eq!(p.origin, Point::new(1600.0, 960.0));
        assert_eq!(p.ax, Point::new(1600.0, 20.0));
        assert!(p.valid);
    }

    #[test]
    fn bottom_left_sits_above_dock() {
        let mut a = args(Anchor::BottomLeft, Some(10.0));
        a.dock = 70.0;
        let p = compute(&a);
        assert_eq!(p.origin, Point::new(10.0, 70.0 + 10.0 + 30.0));
    }

    #[test]
    fn dead_center_is_centered() {
        let p = compute(&args(Anchor::DeadCenter, None));
        assert_eq!(p.origin, Point::new(810.0, 490.0));
    }
}

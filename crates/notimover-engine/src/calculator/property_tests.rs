use proptest::prelude::*;

use super::{PaddingConfig, calculate, is_valid};
use crate::{
    geom::{Rect, Size},
    model::Anchor,
};

fn anchor_strategy() -> impl Strategy<Value = Anchor> {
    (0usize..Anchor::ALL.len()).prop_map(|i| Anchor::ALL[i])
}

fn screen_strategy() -> impl Strategy<Value = Rect> {
    (800.0f64..4000.0, 600.0f64..2500.0).prop_map(|(w, h)| Rect::new(0.0, 0.0, w, h))
}

proptest! {
    #[test]
    fn result_keeps_content_on_screen(
        screen in screen_strategy(),
        w_frac in 0.05f64..1.0,
        h_frac in 0.05f64..1.0,
        anchor in anchor_strategy(),
        dock in 0.0f64..150.0,
        padding in 0.0f64..60.0,
    ) {
        let content = Size::new(screen.w * w_frac, screen.h * h_frac);
        let p = calculate(content, anchor, screen, dock, padding);
        prop_assert!(p.x >= 0.0 && p.x <= screen.w - content.width);
        prop_assert!(p.y >= 0.0 && p.y <= screen.h - content.height);
        prop_assert!(is_valid(p, content, screen));
    }
}

proptest! {
    #[test]
    fn calculate_is_deterministic(
        screen in screen_strategy(),
        cw in 50.0f64..700.0,
        ch in 30.0f64..500.0,
        anchor in anchor_strategy(),
        dock in 0.0f64..150.0,
    ) {
        let content = Size::new(cw, ch);
        let padding = PaddingConfig::default().for_anchor(anchor);
        let a = calculate(content, anchor, screen, dock, padding);
        let b = calculate(content, anchor, screen, dock, padding);
        prop_assert_eq!(a, b);
    }
}

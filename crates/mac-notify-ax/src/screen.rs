//! Screen geometry for notification placement.
//!
//! Notifications render on the main screen. AppKit gives the full and
//! visible frames but only on the main thread; elsewhere the last AppKit
//! reading is reused, falling back to the CoreGraphics main display bounds
//! (no Dock information).

use core_graphics::display::CGDisplay;
use notimover_engine::{Rect, ScreenGeometry, ScreenSource};
use objc2_app_kit::NSScreen;
use objc2_foundation::{MainThreadMarker, NSRect};
use parking_lot::Mutex;
use tracing::{debug, trace};

fn rect(r: NSRect) -> Rect {
    Rect::new(r.origin.x, r.origin.y, r.size.width, r.size.height)
}

/// Main-screen geometry via AppKit.
fn appkit_geometry(mtm: MainThreadMarker) -> Option<ScreenGeometry> {
    let primary = NSScreen::screens(mtm).iter().next()?;
    let main = NSScreen::mainScreen(mtm).unwrap_or_else(|| primary.clone());
    Some(ScreenGeometry {
        frame: rect(main.frame()),
        visible: rect(main.visibleFrame()),
        primary_height: primary.frame().size.height,
    })
}

/// Main display bounds via CoreGraphics.
fn cg_geometry() -> Option<ScreenGeometry> {
    let b = CGDisplay::main().bounds();
    if b.size.width <= 0.0 || b.size.height <= 0.0 {
        return None;
    }
    Some(ScreenGeometry::simple(b.size.width, b.size.height))
}

/// [`ScreenSource`] for the main screen.
#[derive(Default)]
pub struct MacScreen {
    /// Last AppKit reading.
    last: Mutex<Option<ScreenGeometry>>,
}

impl MacScreen {
    /// New source with no cached reading.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScreenSource for MacScreen {
    fn notification_screen(&self) -> Option<ScreenGeometry> {
        if let Some(mtm) = MainThreadMarker::new() {
            let g = appkit_geometry(mtm);
            let mut last = self.last.lock();
            if *last != g {
                debug!(screen = ?g, "screen geometry");
            }
            *last = g;
            return g;
        }
        if let Some(g) = *self.last.lock() {
            return Some(g);
        }
        trace!("off main thread without AppKit reading; using CG display bounds");
        cg_geometry()
    }
}

//! Accessibility reads and writes behind engine handles.

use notimover_engine::{
    AxError, AxMutate, AxQuery, AxResult, ElementRef, PermissionCheck, Point, Size,
    WindowDescriptor,
};
use parking_lot::Mutex;
use tracing::trace;

use crate::{
    ax::{self, AXElem},
    handles::HandleTable,
};

/// [`AxQuery`] and [`AxMutate`] over live `AXUIElementRef`s.
#[derive(Default)]
pub struct MacAx {
    /// Retained elements by handle.
    handles: Mutex<HandleTable<AXElem>>,
}

impl MacAx {
    /// Empty handle table with the default capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live handles.
    pub fn live_handles(&self) -> usize {
        self.handles.lock().len()
    }

    fn elem(&self, el: ElementRef) -> AxResult<AXElem> {
        self.handles.lock().get(el).ok_or(AxError::Gone)
    }

    fn mint(&self, e: AXElem) -> ElementRef {
        self.handles.lock().insert(e)
    }

    fn string(&self, el: ElementRef, attr: &'static str) -> AxResult<Option<String>> {
        let e = self.elem(el)?;
        Ok(ax::get_string(&e, attr)?)
    }
}

impl AxQuery for MacAx {
    fn window_element(&self, window: &WindowDescriptor) -> AxResult<Option<ElementRef>> {
        let found = ax::window_for(window.pid, window.id, window.bounds)?;
        Ok(found.map(|e| {
            let el = self.mint(e);
            trace!(key = %window.key(), el = %el, "window element");
            el
        }))
    }

    fn children(&self, el: ElementRef) -> AxResult<Vec<ElementRef>> {
        let e = self.elem(el)?;
        let kids = ax::get_elements(&e, "AXChildren")?;
        Ok(kids.into_iter().map(|k| self.mint(k)).collect())
    }

    fn role(&self, el: ElementRef) -> AxResult<Option<String>> {
        self.string(el, "AXRole")
    }

    fn subrole(&self, el: ElementRef) -> AxResult<Option<String>> {
        self.string(el, "AXSubrole")
    }

    fn identifier(&self, el: ElementRef) -> AxResult<Option<String>> {
        self.string(el, "AXIdentifier")
    }

    fn position(&self, el: ElementRef) -> AxResult<Option<Point>> {
        let e = self.elem(el)?;
        Ok(ax::get_point(&e, "AXPosition")?)
    }

    fn size(&self, el: ElementRef) -> AxResult<Option<Size>> {
        let e = self.elem(el)?;
        Ok(ax::get_size(&e, "AXSize")?)
    }

    fn is_position_settable(&self, el: ElementRef) -> AxResult<bool> {
        let e = self.elem(el)?;
        Ok(ax::is_settable(&e, "AXPosition")?)
    }

    fn is_alive(&self, el: ElementRef) -> bool {
        let Ok(e) = self.elem(el) else {
            return false;
        };
        match ax::get_string(&e, "AXRole") {
            Ok(_) => true,
            Err(err) => {
                let gone = AxError::from(err) == AxError::Gone;
                if gone {
                    self.handles.lock().remove(el);
                }
                !gone
            }
        }
    }
}

impl AxMutate for MacAx {
    fn set_position(&self, el: ElementRef, p: Point) -> AxResult<()> {
        let e = self.elem(el)?;
        Ok(ax::set_point(&e, "AXPosition", p)?)
    }
}

/// [`PermissionCheck`] backed by `AXIsProcessTrusted`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MacPermissions;

impl PermissionCheck for MacPermissions {
    fn accessibility_trusted(&self) -> bool {
        permissions::accessibility_ok()
    }
}

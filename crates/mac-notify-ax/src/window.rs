//! CoreGraphics window list.

use std::ffi::c_void;

use core_foundation::{
    array::{CFArray, CFArrayGetCount, CFArrayGetValueAtIndex},
    base::{CFTypeRef, TCFType},
    dictionary::CFDictionaryRef,
};
use core_graphics::window as cgw;
use notimover_engine::{ListError, WindowDescriptor, WindowSource};
use tracing::{trace, warn};

use crate::cfutil::{dict_get_i32, dict_get_rect, dict_get_string};

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGWindowListCopyWindowInfo(option: u32, relativeToWindow: u32) -> CFTypeRef; // CFArrayRef
}

#[link(name = "CoreFoundation", kind = "framework")]
unsafe extern "C" {
    fn CFGetTypeID(cf: CFTypeRef) -> usize;
    fn CFDictionaryGetTypeID() -> usize;
}

const K_CG_WINDOW_LIST_OPTION_ON_SCREEN_ONLY: u32 = 1 << 0;
const K_CG_WINDOW_LIST_OPTION_EXCLUDE_DESKTOP_ELEMENTS: u32 = 1 << 4;

/// All on-screen windows, every layer, desktop elements excluded.
pub fn list_windows() -> Result<Vec<WindowDescriptor>, ListError> {
    trace!("list_windows");
    let mut out = Vec::new();
    unsafe {
        let arr_ref = CGWindowListCopyWindowInfo(
            K_CG_WINDOW_LIST_OPTION_ON_SCREEN_ONLY
                | K_CG_WINDOW_LIST_OPTION_EXCLUDE_DESKTOP_ELEMENTS,
            0,
        );
        if arr_ref.is_null() {
            warn!("CGWindowListCopyWindowInfo returned null");
            return Err(ListError::Unavailable(
                "CGWindowListCopyWindowInfo returned null".into(),
            ));
        }
        let arr: CFArray<*const c_void> = CFArray::wrap_under_create_rule(arr_ref as _);
        for i in 0..CFArrayGetCount(arr.as_concrete_TypeRef()) {
            let item = CFArrayGetValueAtIndex(arr.as_concrete_TypeRef(), i) as CFTypeRef;
            if item.is_null() || CFGetTypeID(item) != CFDictionaryGetTypeID() {
                continue;
            }
            let d = item as CFDictionaryRef;
            // Notification windows sit on non-zero layers; keep them all.
            let Some(pid) = dict_get_i32(d, cgw::kCGWindowOwnerPID) else {
                continue;
            };
            let id = match dict_get_i32(d, cgw::kCGWindowNumber).map(u32::try_from) {
                Some(Ok(n)) if n > 0 => n,
                _ => continue,
            };
            let Some(bounds) = dict_get_rect(d, cgw::kCGWindowBounds) else {
                continue;
            };
            out.push(WindowDescriptor {
                id,
                pid,
                owner: dict_get_string(d, cgw::kCGWindowOwnerName).unwrap_or_default(),
                bounds,
                layer: dict_get_i32(d, cgw::kCGWindowLayer).unwrap_or(0),
            });
        }
    }
    Ok(out)
}

/// [`WindowSource`] backed by `CGWindowListCopyWindowInfo`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CgWindowSource;

impl WindowSource for CgWindowSource {
    fn list_windows(&self) -> Result<Vec<WindowDescriptor>, ListError> {
        list_windows()
    }
}

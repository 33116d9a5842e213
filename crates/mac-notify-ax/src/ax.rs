use std::{cell::RefCell, collections::HashMap, ffi::c_void, ptr, thread_local};

use core_foundation::{
    array::{CFArray, CFArrayGetCount, CFArrayGetValueAtIndex},
    base::{CFRelease, CFRetain, CFTypeRef, TCFType},
    number::CFNumber,
    string::{CFString, CFStringRef},
};
use core_graphics::geometry::{CGPoint, CGSize};
use notimover_engine::{Point, Rect, Size, WindowNumber};
use tracing::trace;

use crate::error::{Error, Result, ax_status};

#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    pub fn AXUIElementCreateApplication(pid: i32) -> *mut c_void;
    fn AXUIElementCopyAttributeValue(
        element: *mut c_void,
        attr: CFStringRef,
        value: *mut CFTypeRef,
    ) -> i32;
    fn AXUIElementSetAttributeValue(element: *mut c_void, attr: CFStringRef, value: CFTypeRef)
    -> i32;
    fn AXUIElementIsAttributeSettable(
        element: *mut c_void,
        attr: CFStringRef,
        settable: *mut u8,
    ) -> i32;

    // AXValue helpers for CGPoint/CGSize
    fn AXValueCreate(theType: i32, valuePtr: *const c_void) -> CFTypeRef;
    fn AXValueGetValue(theValue: CFTypeRef, theType: i32, valuePtr: *mut c_void) -> bool;
}

// AXValue type constants (per Apple docs)
const K_AX_VALUE_CGPOINT_TYPE: i32 = 1;
const K_AX_VALUE_CGSIZE_TYPE: i32 = 2;

/// Frame tolerance when matching an AX window to a window-list entry.
const FRAME_MATCH_EPS: f64 = 2.0;

thread_local! {
    static ATTR_STRINGS: RefCell<HashMap<&'static str, CFString>> = RefCell::new(HashMap::new());
}

/// Stable CFStringRef for an attribute name, cached per thread.
pub fn cfstr(name: &'static str) -> CFStringRef {
    // Static CFStrings built from Rust literals can trip pointer
    // authentication when CoreFoundation bridges them to NSString.
    ATTR_STRINGS.with(|cell| {
        let mut m = cell.borrow_mut();
        let s = m.entry(name).or_insert_with(|| CFString::new(name));
        s.as_concrete_TypeRef()
    })
}

/// Retained `AXUIElementRef`.
pub struct AXElem(*mut c_void);

// SAFETY: AXUIElementRef is an immutable CoreFoundation object; the AX API
// accepts it from any thread.
unsafe impl Send for AXElem {}
// SAFETY: as above; no interior mutation through the reference.
unsafe impl Sync for AXElem {}

impl AXElem {
    /// Take ownership of a +1 reference.
    #[inline]
    pub fn from_create(ptr: *mut c_void) -> Option<Self> {
        if ptr.is_null() { None } else { Some(Self(ptr)) }
    }

    /// Retain a borrowed reference.
    #[inline]
    pub fn retain_from_borrowed(ptr: *mut c_void) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }
        unsafe { CFRetain(ptr as CFTypeRef) };
        Some(Self(ptr))
    }

    /// Application element for `pid`.
    pub fn application(pid: i32) -> Result<Self> {
        Self::from_create(unsafe { AXUIElementCreateApplication(pid) }).ok_or(Error::AppElement)
    }

    /// Raw pointer; valid while `self` lives.
    #[inline]
    pub fn as_ptr(&self) -> *mut c_void {
        self.0
    }
}

impl Clone for AXElem {
    fn clone(&self) -> Self {
        unsafe { CFRetain(self.0 as CFTypeRef) };
        Self(self.0)
    }
}

impl Drop for AXElem {
    fn drop(&mut self) {
        unsafe { CFRelease(self.0 as CFTypeRef) };
    }
}

/// Copy an attribute value (+1). `None` when the attribute is absent.
fn copy_attr(el: &AXElem, attr: &'static str) -> Result<Option<CFTypeRef>> {
    let mut v: CFTypeRef = ptr::null_mut();
    let err = unsafe { AXUIElementCopyAttributeValue(el.as_ptr(), cfstr(attr), &mut v) };
    if !ax_status(err)? || v.is_null() {
        return Ok(None);
    }
    Ok(Some(v))
}

/// String attribute.
pub fn get_string(el: &AXElem, attr: &'static str) -> Result<Option<String>> {
    let Some(v) = copy_attr(el, attr)? else {
        return Ok(None);
    };
    let s = unsafe { CFString::wrap_under_create_rule(v as CFStringRef) };
    Ok(Some(s.to_string()))
}

/// Integer attribute.
pub fn get_i64(el: &AXElem, attr: &'static str) -> Result<Option<i64>> {
    let Some(v) = copy_attr(el, attr)? else {
        return Ok(None);
    };
    let n = unsafe { CFNumber::wrap_under_create_rule(v as _) };
    Ok(n.to_i64())
}

/// `CGPoint` attribute (`AXPosition`).
pub fn get_point(el: &AXElem, attr: &'static str) -> Result<Option<Point>> {
    let Some(v) = copy_attr(el, attr)? else {
        return Ok(None);
    };
    let mut p = CGPoint::new(0.0, 0.0);
    let ok =
        unsafe { AXValueGetValue(v, K_AX_VALUE_CGPOINT_TYPE, &mut p as *mut _ as *mut c_void) };
    unsafe { CFRelease(v) };
    if !ok {
        return Err(Error::Unsupported);
    }
    Ok(Some(Point::new(p.x, p.y)))
}

/// `CGSize` attribute (`AXSize`).
pub fn get_size(el: &AXElem, attr: &'static str) -> Result<Option<Size>> {
    let Some(v) = copy_attr(el, attr)? else {
        return Ok(None);
    };
    let mut s = CGSize::new(0.0, 0.0);
    let ok = unsafe { AXValueGetValue(v, K_AX_VALUE_CGSIZE_TYPE, &mut s as *mut _ as *mut c_void) };
    unsafe { CFRelease(v) };
    if !ok {
        return Err(Error::Unsupported);
    }
    Ok(Some(Size::new(s.width, s.height)))
}

/// Element-array attribute (`AXChildren`, `AXWindows`).
pub fn get_elements(el: &AXElem, attr: &'static str) -> Result<Vec<AXElem>> {
    let Some(v) = copy_attr(el, attr)? else {
        return Ok(Vec::new());
    };
    let arr = unsafe { CFArray::<*const c_void>::wrap_under_create_rule(v as _) };
    let n = unsafe { CFArrayGetCount(arr.as_concrete_TypeRef()) };
    let mut out = Vec::with_capacity(usize::try_from(n).unwrap_or(0));
    for i in 0..n {
        let item = unsafe { CFArrayGetValueAtIndex(arr.as_concrete_TypeRef(), i) } as *mut c_void;
        if let Some(e) = AXElem::retain_from_borrowed(item) {
            out.push(e);
        }
    }
    Ok(out)
}

/// Whether `attr` accepts writes on `el`.
pub fn is_settable(el: &AXElem, attr: &'static str) -> Result<bool> {
    let mut settable: u8 = 0;
    let err = unsafe { AXUIElementIsAttributeSettable(el.as_ptr(), cfstr(attr), &mut settable) };
    Ok(ax_status(err)? && settable != 0)
}

/// Write a `CGPoint` attribute.
pub fn set_point(el: &AXElem, attr: &'static str, p: Point) -> Result<()> {
    let cg = CGPoint::new(p.x, p.y);
    let v = unsafe { AXValueCreate(K_AX_VALUE_CGPOINT_TYPE, &cg as *const _ as *const c_void) };
    if v.is_null() {
        return Err(Error::Unsupported);
    }
    let err = unsafe { AXUIElementSetAttributeValue(el.as_ptr(), cfstr(attr), v) };
    unsafe { CFRelease(v) };
    if ax_status(err)? {
        Ok(())
    } else {
        Err(Error::Unsupported)
    }
}

/// Resolve the AX window of `pid` that corresponds to window-list entry `id`.
///
/// Matches `AXWindowNumber` first, then the frame, then falls back to the
/// only window when the process has exactly one.
pub fn window_for(pid: i32, id: WindowNumber, bounds: Rect) -> Result<Option<AXElem>> {
    let app = AXElem::application(pid)?;
    let windows = get_elements(&app, "AXWindows")?;
    let mut by_frame = None;
    for w in &windows {
        if let Ok(Some(n)) = get_i64(w, "AXWindowNumber")
            && u32::try_from(n).ok() == Some(id)
        {
            return Ok(Some(w.clone()));
        }
        if by_frame.is_none() && frame_matches(w, bounds) {
            by_frame = Some(w.clone());
        }
    }
    if by_frame.is_some() {
        trace!(pid, id, "AX window matched by frame");
        return Ok(by_frame);
    }
    if windows.len() == 1 {
        trace!(pid, id, "AX window matched as sole window");
        return Ok(windows.into_iter().next());
    }
    Ok(None)
}

fn frame_matches(w: &AXElem, bounds: Rect) -> bool {
    let (Ok(Some(p)), Ok(Some(s))) = (get_point(w, "AXPosition"), get_size(w, "AXSize")) else {
        return false;
    };
    (p.x - bounds.x).abs() <= FRAME_MATCH_EPS
        && (p.y - bounds.y).abs() <= FRAME_MATCH_EPS
        && (s.width - bounds.w).abs() <= FRAME_MATCH_EPS
        && (s.height - bounds.h).abs() <= FRAME_MATCH_EPS
}

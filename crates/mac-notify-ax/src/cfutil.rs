use std::ffi::c_void;

use core_foundation::{
    base::TCFType,
    dictionary::{CFDictionaryGetValue, CFDictionaryRef},
    number::CFNumber,
    string::{CFString, CFStringRef},
};
use core_graphics::geometry::{CGPoint, CGRect, CGSize};
use notimover_engine::Rect;

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGRectMakeWithDictionaryRepresentation(dict: CFDictionaryRef, rect: *mut CGRect) -> bool;
}

/// Raw value for `key`, borrowed from `dict`.
fn dict_get(dict: CFDictionaryRef, key: CFStringRef) -> Option<*const c_void> {
    let value = unsafe { CFDictionaryGetValue(dict, key as *const c_void) };
    if value.is_null() { None } else { Some(value) }
}

/// Get a String value for the given CFDictionary key.
pub fn dict_get_string(dict: CFDictionaryRef, key: CFStringRef) -> Option<String> {
    let value = dict_get(dict, key)?;
    // SAFETY: borrowed from the dictionary; wrap under the get rule.
    let cf = unsafe { CFString::wrap_under_get_rule(value as CFStringRef) };
    Some(cf.to_string())
}

/// Get a 32-bit integer from CFDictionary for the given key.
pub fn dict_get_i32(dict: CFDictionaryRef, key: CFStringRef) -> Option<i32> {
    let value = dict_get(dict, key)?;
    let n = unsafe { CFNumber::wrap_under_get_rule(value as _) };
    n.to_i64().and_then(|v| i32::try_from(v).ok())
}

/// Decode a `kCGWindowBounds`-style rectangle dictionary.
pub fn dict_get_rect(dict: CFDictionaryRef, key: CFStringRef) -> Option<Rect> {
    let value = dict_get(dict, key)?;
    let mut r = CGRect::new(&CGPoint::new(0.0, 0.0), &CGSize::new(0.0, 0.0));
    let ok = unsafe { CGRectMakeWithDictionaryRepresentation(value as CFDictionaryRef, &mut r) };
    ok.then(|| Rect::new(r.origin.x, r.origin.y, r.size.width, r.size.height))
}

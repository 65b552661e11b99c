//! Thread-local raised error access

use core::ffi::c_char;
use std::ffi::CStr;

use crate::cast;
use crate::error::{set_raised, take_raised, Error, ErrorKind, ErrorObj};
use crate::object::{Object, ObjectRefType};

use super::TffiObjectHandle;

unsafe fn lossy(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

/// Raise an error of the named kind (`"TypeError"`, `"ValueError"`, ...)
///
/// # Safety
/// Both arguments must be null or NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn tffi_error_set_raised_from_cstr(kind: *const c_char, message: *const c_char) {
    let kind = lossy(kind);
    let kind = if kind.is_empty() {
        ErrorKind::RuntimeError
    } else {
        ErrorKind::from_name(&kind)
    };
    set_raised(Error::new(kind, lossy(message)));
}

/// Raise an existing error object; the caller keeps its reference
///
/// Handles that are not errors raise TypeError instead.
///
/// # Safety
/// `error` must be null or a live object handle.
#[no_mangle]
pub unsafe extern "C" fn tffi_error_set_raised(error: TffiObjectHandle) {
    let raised = if error.is_null() {
        Error::runtime_error("raised a null error object")
    } else {
        match cast::get_ref_from_raw::<ErrorObj>(error as *const Object) {
            Ok(obj) => obj.to_error(),
            Err(err) => err,
        }
    };
    set_raised(raised);
}

/// Move the raised error out as an owned `ffi.Error` handle, or null
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn tffi_error_move_from_raised(out: *mut TffiObjectHandle) {
    if out.is_null() {
        return;
    }
    *out = match take_raised() {
        Some(error) => ErrorObj::new(&error).into_object_ref().into_raw() as TffiObjectHandle,
        None => core::ptr::null_mut(),
    };
}

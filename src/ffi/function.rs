//! Function construction, the global table and invocation

use core::ffi::{c_char, c_void};

use crate::any::RawAny;
use crate::cast;
use crate::error::Error;
use crate::function::{self, Function, HandleDeleter, SafeCallType};
use crate::object::{Object, ObjectRefType};

use super::{c_str, handle_result, require_out, TffiObjectHandle};

unsafe fn function_from_handle(handle: TffiObjectHandle) -> crate::error::Result<Function> {
    if handle.is_null() {
        return Err(Error::value_error("function handle must not be null"));
    }
    cast::get_ref_from_raw::<Function>(handle as *const Object)
}

/// Wrap a foreign callable
///
/// The new function owns `self_handle` and releases it with `deleter`.
///
/// # Safety
/// `safe_call` must follow the packed convention for `self_handle`;
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn tffi_function_create(
    self_handle: *mut c_void,
    safe_call: Option<SafeCallType>,
    deleter: Option<HandleDeleter>,
    out: *mut TffiObjectHandle,
) -> i32 {
    handle_result("tffi_function_create", || {
        require_out(out, "out")?;
        let safe_call =
            safe_call.ok_or_else(|| Error::value_error("`safe_call` must not be null"))?;
        let f = Function::from_extern_c(self_handle, safe_call, deleter);
        *out = f.into_object_ref().into_raw() as TffiObjectHandle;
        Ok(())
    })
}

/// Register `func` under `name`
///
/// # Safety
/// `name` must be a NUL-terminated string and `func` a function handle.
#[no_mangle]
pub unsafe extern "C" fn tffi_function_set_global(
    name: *const c_char,
    func: TffiObjectHandle,
    can_override: i32,
) -> i32 {
    handle_result("tffi_function_set_global", || {
        let name = c_str(name, "name")?;
        let f = function_from_handle(func)?;
        function::register_global(name, f, can_override != 0)
    })
}

/// Fetch a global function; writes null when `name` is unregistered
///
/// # Safety
/// `name` must be a NUL-terminated string and `out` writable.
#[no_mangle]
pub unsafe extern "C" fn tffi_function_get_global(
    name: *const c_char,
    out: *mut TffiObjectHandle,
) -> i32 {
    handle_result("tffi_function_get_global", || {
        let name = c_str(name, "name")?;
        require_out(out, "out")?;
        *out = match function::get_global(name) {
            Some(f) => f.into_object_ref().into_raw() as TffiObjectHandle,
            None => core::ptr::null_mut(),
        };
        Ok(())
    })
}

/// Invoke `func` with packed arguments
///
/// # Safety
/// `func` must be a function handle, `args` must hold `num_args` values
/// and `result` must be writable.
#[no_mangle]
pub unsafe extern "C" fn tffi_function_call(
    func: TffiObjectHandle,
    args: *const RawAny,
    num_args: i32,
    result: *mut RawAny,
) -> i32 {
    let mut callee = None;
    let status = handle_result("tffi_function_call", || {
        require_out(result, "result")?;
        callee = Some(function_from_handle(func)?);
        Ok(())
    });
    match callee {
        Some(f) if status == 0 => f.safe_call(args, num_args, result),
        _ => status,
    }
}

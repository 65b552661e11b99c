//! Module lookup and host-environment registration

use core::ffi::{c_char, c_void};

use crate::cast;
use crate::error::Error;
use crate::interop::{self, Module};
use crate::object::{Object, ObjectRefType};

use super::{c_str, handle_result, require_out, TffiObjectHandle};

/// Resolve `func_name` through a module's imports and the global table
///
/// The handle written to `out` is borrowed: the module's cache keeps the
/// function alive for as long as the module lives.
///
/// # Safety
/// `module` must be a module handle, `func_name` a NUL-terminated string
/// and `out` writable.
#[no_mangle]
pub unsafe extern "C" fn tffi_env_lookup_from_imports(
    module: TffiObjectHandle,
    func_name: *const c_char,
    out: *mut TffiObjectHandle,
) -> i32 {
    handle_result("tffi_env_lookup_from_imports", || {
        if module.is_null() {
            return Err(Error::value_error("module handle must not be null"));
        }
        let name = c_str(func_name, "func_name")?;
        require_out(out, "out")?;
        let module = cast::get_ref_from_raw::<Module>(module as *const Object)?;
        let f = module.lookup_from_imports(name)?;
        *out = f.as_object_ref().as_ptr() as TffiObjectHandle;
        Ok(())
    })
}

/// Hand the process a host callback (`env.check_signals`, `env.gil_acquire`,
/// `env.gil_release`); other names raise ValueError
///
/// # Safety
/// `name` must be a NUL-terminated string; `symbol` must have the signature
/// that name expects and outlive its registration.
#[no_mangle]
pub unsafe extern "C" fn tffi_env_register_context_symbol(
    name: *const c_char,
    symbol: *mut c_void,
) -> i32 {
    handle_result("tffi_env_register_context_symbol", || {
        let name = c_str(name, "name")?;
        interop::register_context_symbol(name, symbol)
    })
}

/// Publish a symbol to the system-lib module
///
/// # Safety
/// `name` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn tffi_env_register_system_lib_symbol(
    name: *const c_char,
    symbol: *mut c_void,
) -> i32 {
    handle_result("tffi_env_register_system_lib_symbol", || {
        let name = c_str(name, "name")?;
        interop::register_system_lib_symbol(name, symbol);
        Ok(())
    })
}

/// Run the host signal check
///
/// Nonzero means abort; the host has already set its error.
#[no_mangle]
pub extern "C" fn tffi_env_check_signals() -> i32 {
    interop::check_signals_status()
}

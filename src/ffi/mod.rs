//! C ABI - stable entry points for other modules and host languages
//!
//! Design: Every entry point that can fail returns 0 on success and -1 on
//! failure. Before returning -1 the error is stored in the thread-local
//! raised slot, where `tffi_error_move_from_raised` picks it up. Panics never
//! cross the boundary; they are caught and raised as `InternalError`.
//!
//! Object handles are `*mut c_void` pointing at an object header. Handles
//! written to out-parameters are owned by the caller unless stated otherwise.

mod env;
mod error;
mod function;
mod object;


use core::ffi::{c_char, c_void};
use std::ffi::CStr;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::{set_raised, Error, ErrorKind, Result};
use crate::logging;

pub use env::{
    tffi_env_check_signals, tffi_env_lookup_from_imports, tffi_env_register_context_symbol,
    tffi_env_register_system_lib_symbol,
};
pub use error::{tffi_error_move_from_raised, tffi_error_set_raised, tffi_error_set_raised_from_cstr};
pub use function::{
    tffi_function_call, tffi_function_create, tffi_function_get_global,
    tffi_function_set_global,
};
pub use object::{
    tffi_any_view_to_owned_any, tffi_object_dec_ref, tffi_object_inc_ref, tffi_object_use_count,
    tffi_type_index_is_instance, tffi_type_key_to_index,
};

/// Opaque object handle on the C side
pub type TffiObjectHandle = *mut c_void;

/// Run `body` and translate its outcome into a status code
pub(crate) fn handle_result(entry: &'static str, body: impl FnOnce() -> Result<()>) -> i32 {
    logging::log_ffi_call(entry, 0);
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => 0,
        Ok(Err(error)) => {
            logging::log_ffi_error(entry, error.message());
            set_raised(error);
            -1
        }
        Err(panic) => {
            let message = if let Some(message) = panic.downcast_ref::<&str>() {
                (*message).to_string()
            } else if let Some(message) = panic.downcast_ref::<String>() {
                message.clone()
            } else {
                format!("panic in `{}`", entry)
            };
            logging::log_ffi_error(entry, &message);
            set_raised(Error::new(ErrorKind::InternalError, message));
            -1
        }
    }
}

/// Borrow a NUL-terminated UTF-8 argument
pub(crate) unsafe fn c_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(Error::value_error(format!("`{}` must not be null", what)));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| Error::value_error(format!("`{}` is not valid UTF-8", what)))
}

/// Fail with ValueError when an out-parameter is null
pub(crate) fn require_out<T>(ptr: *mut T, what: &str) -> Result<()> {
    if ptr.is_null() {
        return Err(Error::value_error(format!("out-parameter `{}` must not be null", what)));
    }
    Ok(())
}

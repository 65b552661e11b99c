//! Object lifecycle and type queries

use core::ffi::c_char;

use crate::any::{AnyView, RawAny};
use crate::error::Error;
use crate::object::Object;
use crate::registry::{self, type_index};

use super::{c_str, handle_result, require_out, TffiObjectHandle};

/// Increment the reference count of `obj`
///
/// # Safety
/// `obj` must be null or a live object handle.
#[no_mangle]
pub unsafe extern "C" fn tffi_object_inc_ref(obj: TffiObjectHandle) -> i32 {
    Object::inc_ref(obj as *const Object);
    0
}

/// Decrement the reference count of `obj`, destroying it at zero
///
/// # Safety
/// `obj` must be null or a live handle whose reference the caller owns.
#[no_mangle]
pub unsafe extern "C" fn tffi_object_dec_ref(obj: TffiObjectHandle) -> i32 {
    Object::dec_ref(obj as *const Object);
    0
}

/// Current strong count, 0 for null
///
/// # Safety
/// `obj` must be null or a live object handle.
#[no_mangle]
pub unsafe extern "C" fn tffi_object_use_count(obj: TffiObjectHandle) -> u64 {
    if obj.is_null() {
        return 0;
    }
    (*(obj as *const Object)).use_count()
}

/// Resolve a type key to its runtime index
///
/// Unknown keys raise ValueError.
///
/// # Safety
/// `type_key` must be a NUL-terminated string and `out_index` writable.
#[no_mangle]
pub unsafe extern "C" fn tffi_type_key_to_index(type_key: *const c_char, out_index: *mut i32) -> i32 {
    handle_result("tffi_type_key_to_index", || {
        let key = c_str(type_key, "type_key")?;
        require_out(out_index, "out_index")?;
        let index = registry::type_key_to_index(key)
            .ok_or_else(|| Error::value_error(format!("Cannot find type `{}`", key)))?;
        *out_index = index;
        Ok(())
    })
}

/// 1 when `object_index` is `target_index` or derives from it, else 0
#[no_mangle]
pub extern "C" fn tffi_type_index_is_instance(object_index: i32, target_index: i32) -> i32 {
    if object_index == target_index {
        return 1;
    }
    if target_index == type_index::OBJECT {
        return type_index::is_object(object_index) as i32;
    }
    let table = registry::global();
    match (table.info(object_index), table.info(target_index)) {
        (Some(_), Some(target)) => {
            table.has_ancestor_at(object_index, target.type_depth, target_index) as i32
        }
        _ => 0,
    }
}

/// Promote a borrowed value to an owning one
///
/// Objects gain a reference; borrowed strings and byte buffers are copied.
///
/// # Safety
/// `view` must point to a valid value and `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn tffi_any_view_to_owned_any(view: *const RawAny, out: *mut RawAny) -> i32 {
    handle_result("tffi_any_view_to_owned_any", || {
        if view.is_null() {
            return Err(Error::value_error("`view` must not be null"));
        }
        require_out(out, "out")?;
        let view = &*(view as *const AnyView<'_>);
        *out = view.to_owned_any().into_raw();
        Ok(())
    })
}

//! Checked conversions between raw pointers, object pointers and reference types


use crate::any::{Any, FromAny};
use crate::error::{Error, Result};
use crate::object::{is_instance, Object, ObjectPtr, ObjectRef, ObjectRefType, ObjectType};

fn container_key<R: ObjectRefType>() -> &'static str {
    <R::ContainerType as ObjectType>::TYPE_KEY
}

/// Wrap a raw node pointer into a reference type, taking a new reference
///
/// Halts when `ptr` is null and `R` is not nullable.
///
/// # Safety
/// `ptr` must be null or point to a live `R::ContainerType`.
pub unsafe fn get_ref<R: ObjectRefType>(ptr: *const R::ContainerType) -> R {
    if ptr.is_null() && !R::NULLABLE {
        crate::fatal!("get_ref: null pointer for non-nullable `{}`", container_key::<R>());
    }
    R::from_object_ref_unchecked(ObjectRef::from_borrowed(ptr as *const Object))
}

/// Wrap an untyped header pointer, checking its dynamic type
///
/// # Safety
/// `ptr` must be null or point to a live object.
pub unsafe fn get_ref_from_raw<R: ObjectRefType>(ptr: *const Object) -> Result<R> {
    downcast(ObjectRef::from_borrowed(ptr))
}

/// Wrap an owning pointer into its reference type
pub fn from_ptr<R: ObjectRefType>(ptr: ObjectPtr<R::ContainerType>) -> R {
    unsafe { R::from_object_ref_unchecked(ObjectRef::from_ptr(ptr)) }
}

/// Narrow `base` to `R`
///
/// TypeError when the dynamic type is not an `R::ContainerType`, or when
/// `base` is undefined and `R` is not nullable.
pub fn downcast<R: ObjectRefType, B: ObjectRefType>(base: B) -> Result<R> {
    if !base.defined() {
        if R::NULLABLE {
            return Ok(unsafe { R::from_object_ref_unchecked(ObjectRef::null()) });
        }
        return Err(Error::type_error(format!(
            "Downcast from undefined(null) to `{}` is not allowed. Use `downcast_optional` instead.",
            container_key::<R>()
        )));
    }
    if is_instance::<R::ContainerType>(base.type_index()) {
        return Ok(unsafe { R::from_object_ref_unchecked(base.into_object_ref()) });
    }
    Err(Error::type_error(format!(
        "Downcast from {} to {} failed.",
        base.type_key(),
        container_key::<R>()
    )))
}

/// `downcast` that maps an undefined base to `None`
pub fn downcast_optional<R: ObjectRefType, B: ObjectRefType>(base: B) -> Result<Option<R>> {
    if !base.defined() {
        return Ok(None);
    }
    downcast(base).map(Some)
}

/// `downcast` without an error: `None` on mismatch or undefined base
pub fn try_downcast<R: ObjectRefType, B: ObjectRefType>(base: &B) -> Option<R> {
    if base.defined() && is_instance::<R::ContainerType>(base.type_index()) {
        Some(unsafe { R::from_object_ref_unchecked(base.as_object_ref().clone()) })
    } else {
        None
    }
}

/// Downcast out of a tagged value; `T = Any` passes the value through
pub fn downcast_any<T: FromAny>(value: &Any) -> Result<T> {
    value.cast()
}

/// Upcast to the untyped reference
pub fn upcast<B: ObjectRefType>(value: B) -> ObjectRef {
    value.into_object_ref()
}

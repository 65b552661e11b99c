//! Tagged values - the 16-byte ABI struct and its owning / borrowing wrappers
//!
//! Design: `RawAny` is the wire layout shared with every module that links
//! the runtime: a 32-bit type tag, 32 bits of zero padding and an 8-byte
//! payload. `Any` owns whatever object the payload references (clone
//! increments, drop decrements). `AnyView<'a>` borrows and never touches the
//! count; it is what packed functions receive as arguments.
//!
//! Conversions go through three traits:
//! - `IntoAny` - move a Rust value into a raw tagged value
//! - `ToAnyView` - describe a borrowed Rust value as a raw tagged value
//! - `FromAny` - strict tag check, unchecked extraction, coercive try-cast

mod convert;
mod dtype;
mod hash;

#[cfg(test)]
mod tests;

use core::ffi::{c_char, c_void};
use core::fmt;
use core::marker::PhantomData;

use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use crate::registry::{self, type_index};

pub use convert::ByteArray;
pub use dtype::{device_type, dtype_code, DataType, Device};
pub use hash::{any_equal, any_hash, AnyEqual, AnyHash};
pub(crate) use hash::AnyKey;

/// Payload of a tagged value
#[repr(C)]
#[derive(Clone, Copy)]
pub union RawPayload {
    pub v_int64: i64,
    pub v_uint64: u64,
    pub v_float64: f64,
    pub v_ptr: *mut c_void,
    pub v_c_str: *const c_char,
    pub v_obj: *mut Object,
    pub v_dtype: DataType,
    pub v_device: Device,
}

/// ABI layout of a tagged value
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RawAny {
    pub type_index: i32,
    /// Always zero so payload comparisons can work on raw bits
    pub zero_padding: u32,
    pub payload: RawPayload,
}

const _: () = assert!(core::mem::size_of::<RawAny>() == 16);

impl RawAny {
    pub const NONE: RawAny = RawAny {
        type_index: type_index::NONE,
        zero_padding: 0,
        payload: RawPayload { v_uint64: 0 },
    };

    #[inline]
    fn with_bits(type_index: i32, bits: u64) -> Self {
        RawAny {
            type_index,
            zero_padding: 0,
            payload: RawPayload { v_uint64: bits },
        }
    }

    pub fn from_int(value: i64) -> Self {
        Self::with_bits(type_index::INT, value as u64)
    }

    pub fn from_bool(value: bool) -> Self {
        Self::with_bits(type_index::BOOL, value as u64)
    }

    pub fn from_float(value: f64) -> Self {
        Self::with_bits(type_index::FLOAT, value.to_bits())
    }

    pub fn from_opaque_ptr(ptr: *mut c_void) -> Self {
        if ptr.is_null() {
            return Self::NONE;
        }
        Self::with_bits(type_index::OPAQUE_PTR, ptr as usize as u64)
    }

    /// Unused payload bytes are zeroed before the descriptor is written
    pub fn from_dtype(dtype: DataType) -> Self {
        let mut raw = Self::with_bits(type_index::DATA_TYPE, 0);
        raw.payload.v_dtype = dtype;
        raw
    }

    pub fn from_device(device: Device) -> Self {
        let mut raw = Self::with_bits(type_index::DEVICE, 0);
        raw.payload.v_device = device;
        raw
    }

    pub fn from_c_str(ptr: *const c_char) -> Self {
        if ptr.is_null() {
            return Self::NONE;
        }
        Self::with_bits(type_index::RAW_STR, ptr as usize as u64)
    }

    /// Tag an object pointer with its dynamic type (no count change)
    ///
    /// # Safety
    /// `ptr` must be null or point to a live object.
    pub unsafe fn from_object_ptr(ptr: *mut Object) -> Self {
        if ptr.is_null() {
            return Self::NONE;
        }
        Self::with_bits((*ptr).type_index(), ptr as usize as u64)
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.type_index == type_index::NONE
    }

    #[inline]
    pub fn is_object(&self) -> bool {
        type_index::is_object(self.type_index)
    }

    /// Raw payload bits
    #[inline]
    pub fn bits(&self) -> u64 {
        unsafe { self.payload.v_uint64 }
    }

    /// Object pointer, null for non-object tags
    #[inline]
    pub fn object_ptr(&self) -> *mut Object {
        if self.is_object() {
            unsafe { self.payload.v_obj }
        } else {
            core::ptr::null_mut()
        }
    }

    /// Human-readable type name of the tag
    pub fn type_key(&self) -> String {
        registry::type_index_to_key(self.type_index)
    }
}

/// Move a value into a raw tagged value
pub trait IntoAny {
    /// The returned value owns one reference to any object it points at
    fn into_raw_any(self) -> RawAny;
}

/// Describe a borrowed value as a raw tagged value without taking a reference
pub trait ToAnyView {
    fn to_raw_view(&self) -> RawAny;
}

/// Extract a Rust value from a raw tagged value
pub trait FromAny: Sized {
    /// Exact tag check, no coercion
    fn check_raw_strict(raw: &RawAny) -> bool;

    /// Copy out (incrementing any object reference)
    ///
    /// # Safety
    /// `check_raw_strict(raw)` must have returned true and any referenced
    /// object must be alive.
    unsafe fn copy_from_raw_after_check(raw: &RawAny) -> Self;

    /// Best-effort conversion that allows coercions between kinds
    fn try_cast_from_raw(raw: &RawAny) -> Option<Self> {
        if Self::check_raw_strict(raw) {
            Some(unsafe { Self::copy_from_raw_after_check(raw) })
        } else {
            None
        }
    }

    /// Name used in conversion error messages
    fn type_str() -> String;

    /// Exact static type index, `type_index::ANY` when it is not fixed
    fn static_type_index() -> i32 {
        type_index::ANY
    }
}

#[inline]
fn cast_raw<T: FromAny>(raw: &RawAny) -> Result<T> {
    T::try_cast_from_raw(raw).ok_or_else(|| cast_error::<T>(raw))
}

#[cold]
fn cast_error<T: FromAny>(raw: &RawAny) -> Error {
    let target = T::static_type_index();
    if target != type_index::ANY && raw.type_index == target {
        // Right kind, value does not fit the narrower Rust type
        return Error::out_of_range(
            &ShowRaw(raw).to_string(),
            &raw.type_key(),
            core::any::type_name::<T>(),
        );
    }
    Error::type_mismatch(&raw.type_key(), &T::type_str())
}

#[inline]
fn as_raw<T: FromAny>(raw: &RawAny) -> Option<T> {
    if T::check_raw_strict(raw) {
        Some(unsafe { T::copy_from_raw_after_check(raw) })
    } else {
        None
    }
}

/// Owning tagged value
#[repr(transparent)]
pub struct Any {
    raw: RawAny,
}

impl Any {
    pub const fn none() -> Self {
        Self { raw: RawAny::NONE }
    }

    pub fn new<T: IntoAny>(value: T) -> Self {
        Self {
            raw: value.into_raw_any(),
        }
    }

    /// Take ownership of a raw value
    ///
    /// # Safety
    /// `raw` must own one reference to any object it points at.
    #[inline]
    pub unsafe fn from_raw(raw: RawAny) -> Self {
        Self { raw }
    }

    /// Give up ownership without releasing the referenced object
    #[inline]
    pub fn into_raw(self) -> RawAny {
        let raw = self.raw;
        core::mem::forget(self);
        raw
    }

    #[inline]
    pub fn as_raw(&self) -> &RawAny {
        &self.raw
    }

    #[inline]
    pub fn view(&self) -> AnyView<'_> {
        AnyView {
            raw: self.raw,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn type_index(&self) -> i32 {
        self.raw.type_index
    }

    pub fn type_key(&self) -> String {
        self.raw.type_key()
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.raw.is_none()
    }

    /// Convert, coercing where allowed; TypeError names both types on failure
    pub fn cast<T: FromAny>(&self) -> Result<T> {
        cast_raw(&self.raw)
    }

    /// Exact-tag extraction
    pub fn as_<T: FromAny>(&self) -> Option<T> {
        as_raw(&self.raw)
    }

    /// Coercive extraction without an error
    pub fn try_cast<T: FromAny>(&self) -> Option<T> {
        T::try_cast_from_raw(&self.raw)
    }

    /// Move the value out, leaving `None` behind
    pub fn take(&mut self) -> Any {
        core::mem::take(self)
    }

    /// Same tag and same payload bits (object identity for objects)
    pub fn same_as(&self, other: &Any) -> bool {
        self.raw.type_index == other.raw.type_index && self.raw.bits() == other.raw.bits()
    }

    /// New reference to the contained object, `None` for non-objects
    pub fn as_object_ref(&self) -> Option<ObjectRef> {
        if self.raw.is_object() {
            Some(unsafe { ObjectRef::from_borrowed(self.raw.object_ptr()) })
        } else {
            None
        }
    }
}

impl Clone for Any {
    #[inline]
    fn clone(&self) -> Self {
        unsafe { Object::inc_ref(self.raw.object_ptr()) };
        Self { raw: self.raw }
    }
}

impl Drop for Any {
    #[inline]
    fn drop(&mut self) {
        unsafe { Object::dec_ref(self.raw.object_ptr()) };
    }
}

impl Default for Any {
    fn default() -> Self {
        Self::none()
    }
}

impl PartialEq for Any {
    fn eq(&self, other: &Self) -> bool {
        any_equal(&self.raw, &other.raw)
    }
}

impl fmt::Debug for Any {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_raw(&self.raw, f)
    }
}

// Objects are shared across threads through their atomic count; raw
// pointers and strings only appear in views.
unsafe impl Send for Any {}
unsafe impl Sync for Any {}

/// Borrowing tagged value, valid while its source lives
#[repr(transparent)]
#[derive(Clone, Copy)]
pub struct AnyView<'a> {
    raw: RawAny,
    _marker: PhantomData<&'a ()>,
}

impl<'a> AnyView<'a> {
    pub fn new<T: ToAnyView + ?Sized>(value: &'a T) -> Self {
        Self {
            raw: value.to_raw_view(),
            _marker: PhantomData,
        }
    }

    pub const fn none() -> Self {
        Self {
            raw: RawAny::NONE,
            _marker: PhantomData,
        }
    }

    /// # Safety
    /// Whatever `raw` references must outlive `'a`.
    #[inline]
    pub unsafe fn from_raw(raw: RawAny) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn as_raw(&self) -> &RawAny {
        &self.raw
    }

    #[inline]
    pub fn type_index(&self) -> i32 {
        self.raw.type_index
    }

    pub fn type_key(&self) -> String {
        self.raw.type_key()
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.raw.is_none()
    }

    pub fn cast<T: FromAny>(&self) -> Result<T> {
        cast_raw(&self.raw)
    }

    pub fn as_<T: FromAny>(&self) -> Option<T> {
        as_raw(&self.raw)
    }

    pub fn try_cast<T: FromAny>(&self) -> Option<T> {
        T::try_cast_from_raw(&self.raw)
    }

    /// Promote to an owning value
    ///
    /// Objects gain a reference; borrowed strings and byte buffers are
    /// copied into `ffi.String` / `ffi.Bytes` objects.
    pub fn to_owned_any(&self) -> Any {
        match self.raw.type_index {
            type_index::RAW_STR => {
                let text = unsafe { core::ffi::CStr::from_ptr(self.raw.payload.v_c_str) };
                Any::new(crate::containers::Str::new(&text.to_string_lossy()))
            }
            type_index::BYTE_ARRAY_PTR => {
                let bytes = unsafe { convert::byte_array_slice(&self.raw) };
                Any::new(crate::containers::Bytes::new(bytes))
            }
            _ => {
                unsafe { Object::inc_ref(self.raw.object_ptr()) };
                Any { raw: self.raw }
            }
        }
    }
}

impl fmt::Debug for AnyView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_raw(&self.raw, f)
    }
}

impl Default for AnyView<'_> {
    fn default() -> Self {
        Self::none()
    }
}

fn fmt_raw(raw: &RawAny, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    unsafe {
        match raw.type_index {
            type_index::NONE => f.write_str("None"),
            type_index::INT => write!(f, "{}", raw.payload.v_int64),
            type_index::BOOL => write!(f, "{}", raw.payload.v_int64 != 0),
            type_index::FLOAT => write!(f, "{:?}", raw.payload.v_float64),
            type_index::OPAQUE_PTR => write!(f, "{:p}", raw.payload.v_ptr),
            type_index::DATA_TYPE => write!(f, "{}", raw.payload.v_dtype),
            type_index::DEVICE => write!(f, "{}", raw.payload.v_device),
            type_index::RAW_STR => {
                let text = core::ffi::CStr::from_ptr(raw.payload.v_c_str);
                write!(f, "{:?}", text.to_string_lossy())
            }
            type_index::STR => match crate::containers::Str::try_cast_from_raw(raw) {
                Some(text) => write!(f, "{:?}", text.as_str()),
                None => f.write_str("<str>"),
            },
            _ if raw.is_object() => write!(f, "{}({:p})", raw.type_key(), raw.payload.v_obj),
            other => write!(f, "<type_index {}>", other),
        }
    }
}

struct ShowRaw<'a>(&'a RawAny);

impl fmt::Display for ShowRaw<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_raw(self.0, f)
    }
}

impl fmt::Display for Any {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_raw(&self.raw, f)
    }
}

/// Implement the `Any` traits for a reference type generated by `object_ref!`
#[doc(hidden)]
#[macro_export]
macro_rules! __impl_any_for_ref {
    ($name:ident) => {
        impl $crate::any::IntoAny for $name {
            fn into_raw_any(self) -> $crate::any::RawAny {
                let ptr = $crate::object::ObjectRefType::into_object_ref(self).into_raw();
                unsafe { $crate::any::RawAny::from_object_ptr(ptr) }
            }
        }

        impl $crate::any::ToAnyView for $name {
            fn to_raw_view(&self) -> $crate::any::RawAny {
                let ptr = $crate::object::ObjectRefType::as_object_ref(self).as_ptr();
                unsafe { $crate::any::RawAny::from_object_ptr(ptr as *mut $crate::object::Object) }
            }
        }

        impl $crate::any::FromAny for $name {
            fn check_raw_strict(raw: &$crate::any::RawAny) -> bool {
                $crate::object::ref_accepts_tag::<$name>(raw.type_index)
            }

            unsafe fn copy_from_raw_after_check(raw: &$crate::any::RawAny) -> Self {
                <$name as $crate::object::ObjectRefType>::from_object_ref_unchecked(
                    $crate::object::ObjectRef::from_borrowed(raw.object_ptr()),
                )
            }

            fn try_cast_from_raw(raw: &$crate::any::RawAny) -> ::core::option::Option<Self> {
                if <Self as $crate::any::FromAny>::check_raw_strict(raw) {
                    Some(unsafe { <Self as $crate::any::FromAny>::copy_from_raw_after_check(raw) })
                } else {
                    <$name as $crate::object::ObjectRefType>::coerce_from_raw(raw)
                }
            }

            fn type_str() -> ::std::string::String {
                <<$name as $crate::object::ObjectRefType>::ContainerType as $crate::object::ObjectType>::TYPE_KEY
                    .to_string()
            }

            fn static_type_index() -> i32 {
                <<$name as $crate::object::ObjectRefType>::ContainerType as $crate::object::ObjectType>::type_index()
            }
        }

        impl ::core::convert::From<$name> for $crate::any::Any {
            fn from(value: $name) -> Self {
                $crate::any::Any::new(value)
            }
        }
    };
}

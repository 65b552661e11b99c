//! Conversion table between Rust values and tagged values
//!
//! Strict checks accept exactly one tag. Try-casts allow the coercions the
//! runtime has always accepted: bool <-> int, int/bool -> float, strings ->
//! DataType, none -> null pointer.

use core::ffi::{c_void, CStr};

use crate::containers::Str;
use crate::object::{ref_accepts_tag, ObjectRef};
use crate::registry::type_index;

use super::{Any, AnyView, DataType, Device, FromAny, IntoAny, RawAny, ToAnyView};

/// Borrowed byte buffer passed by pointer inside a view
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ByteArray {
    pub data: *const u8,
    pub size: usize,
}

impl ByteArray {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            data: bytes.as_ptr(),
            size: bytes.len(),
        }
    }
}

impl ToAnyView for ByteArray {
    fn to_raw_view(&self) -> RawAny {
        let mut raw = RawAny::NONE;
        raw.type_index = type_index::BYTE_ARRAY_PTR;
        raw.payload.v_ptr = self as *const ByteArray as *mut c_void;
        raw
    }
}

/// # Safety
/// `raw` must be tagged `BYTE_ARRAY_PTR` and its buffer must be alive.
pub(crate) unsafe fn byte_array_slice<'a>(raw: &RawAny) -> &'a [u8] {
    let array = &*(raw.payload.v_ptr as *const ByteArray);
    if array.data.is_null() {
        return &[];
    }
    core::slice::from_raw_parts(array.data, array.size)
}

// ============================================================================
// None
// ============================================================================

impl IntoAny for () {
    fn into_raw_any(self) -> RawAny {
        RawAny::NONE
    }
}

impl ToAnyView for () {
    fn to_raw_view(&self) -> RawAny {
        RawAny::NONE
    }
}

impl FromAny for () {
    fn check_raw_strict(raw: &RawAny) -> bool {
        raw.is_none()
    }

    unsafe fn copy_from_raw_after_check(_raw: &RawAny) -> Self {}

    fn type_str() -> String {
        "None".to_string()
    }

    fn static_type_index() -> i32 {
        type_index::NONE
    }
}

// ============================================================================
// bool
// ============================================================================

impl IntoAny for bool {
    fn into_raw_any(self) -> RawAny {
        RawAny::from_bool(self)
    }
}

impl ToAnyView for bool {
    fn to_raw_view(&self) -> RawAny {
        RawAny::from_bool(*self)
    }
}

impl FromAny for bool {
    fn check_raw_strict(raw: &RawAny) -> bool {
        raw.type_index == type_index::BOOL
    }

    unsafe fn copy_from_raw_after_check(raw: &RawAny) -> Self {
        raw.payload.v_int64 != 0
    }

    fn try_cast_from_raw(raw: &RawAny) -> Option<Self> {
        match raw.type_index {
            type_index::BOOL | type_index::INT => Some(unsafe { raw.payload.v_int64 != 0 }),
            _ => None,
        }
    }

    fn type_str() -> String {
        "bool".to_string()
    }

    fn static_type_index() -> i32 {
        type_index::BOOL
    }
}

// ============================================================================
// Integers
// ============================================================================

/// Recover an integer from the `int` payload
trait FromInt64: Sized {
    fn from_int64(value: i64) -> Option<Self>;
}

macro_rules! from_int64_checked {
    ($($ty:ty),*) => {$(
        impl FromInt64 for $ty {
            fn from_int64(value: i64) -> Option<Self> {
                <$ty>::try_from(value).ok()
            }
        }
    )*};
}

// Stored as `self as i64`, so the payload bits are the value
macro_rules! from_int64_bits {
    ($($ty:ty),*) => {$(
        impl FromInt64 for $ty {
            fn from_int64(value: i64) -> Option<Self> {
                Some(value as u64 as $ty)
            }
        }
    )*};
}

from_int64_checked!(i8, i16, i32, i64, isize, u8, u16, u32);
from_int64_bits!(u64, usize);

macro_rules! impl_int {
    ($($ty:ty),*) => {$(
        impl IntoAny for $ty {
            fn into_raw_any(self) -> RawAny {
                RawAny::from_int(self as i64)
            }
        }

        impl ToAnyView for $ty {
            fn to_raw_view(&self) -> RawAny {
                RawAny::from_int(*self as i64)
            }
        }

        impl FromAny for $ty {
            fn check_raw_strict(raw: &RawAny) -> bool {
                raw.type_index == type_index::INT
                    && <$ty>::from_int64(unsafe { raw.payload.v_int64 }).is_some()
            }

            unsafe fn copy_from_raw_after_check(raw: &RawAny) -> Self {
                raw.payload.v_int64 as $ty
            }

            fn try_cast_from_raw(raw: &RawAny) -> Option<Self> {
                match raw.type_index {
                    type_index::INT | type_index::BOOL => {
                        <$ty>::from_int64(unsafe { raw.payload.v_int64 })
                    }
                    _ => None,
                }
            }

            fn type_str() -> String {
                "int".to_string()
            }

            fn static_type_index() -> i32 {
                type_index::INT
            }
        }

        impl From<$ty> for Any {
            fn from(value: $ty) -> Self {
                Any::new(value)
            }
        }
    )*};
}

impl_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

// ============================================================================
// Floats
// ============================================================================

macro_rules! impl_float {
    ($($ty:ty),*) => {$(
        impl IntoAny for $ty {
            fn into_raw_any(self) -> RawAny {
                RawAny::from_float(self as f64)
            }
        }

        impl ToAnyView for $ty {
            fn to_raw_view(&self) -> RawAny {
                RawAny::from_float(*self as f64)
            }
        }

        impl FromAny for $ty {
            fn check_raw_strict(raw: &RawAny) -> bool {
                raw.type_index == type_index::FLOAT
            }

            unsafe fn copy_from_raw_after_check(raw: &RawAny) -> Self {
                raw.payload.v_float64 as $ty
            }

            fn try_cast_from_raw(raw: &RawAny) -> Option<Self> {
                unsafe {
                    match raw.type_index {
                        type_index::FLOAT => Some(raw.payload.v_float64 as $ty),
                        type_index::INT | type_index::BOOL => Some(raw.payload.v_int64 as $ty),
                        _ => None,
                    }
                }
            }

            fn type_str() -> String {
                "float".to_string()
            }

            fn static_type_index() -> i32 {
                type_index::FLOAT
            }
        }

        impl From<$ty> for Any {
            fn from(value: $ty) -> Self {
                Any::new(value)
            }
        }
    )*};
}

impl_float!(f32, f64);

// ============================================================================
// Opaque pointers, DataType, Device
// ============================================================================

impl IntoAny for *mut c_void {
    fn into_raw_any(self) -> RawAny {
        RawAny::from_opaque_ptr(self)
    }
}

impl ToAnyView for *mut c_void {
    fn to_raw_view(&self) -> RawAny {
        RawAny::from_opaque_ptr(*self)
    }
}

impl FromAny for *mut c_void {
    fn check_raw_strict(raw: &RawAny) -> bool {
        raw.type_index == type_index::OPAQUE_PTR
    }

    unsafe fn copy_from_raw_after_check(raw: &RawAny) -> Self {
        raw.payload.v_ptr
    }

    fn try_cast_from_raw(raw: &RawAny) -> Option<Self> {
        match raw.type_index {
            type_index::OPAQUE_PTR => Some(unsafe { raw.payload.v_ptr }),
            type_index::NONE => Some(core::ptr::null_mut()),
            _ => None,
        }
    }

    fn type_str() -> String {
        "void*".to_string()
    }

    fn static_type_index() -> i32 {
        type_index::OPAQUE_PTR
    }
}

impl IntoAny for DataType {
    fn into_raw_any(self) -> RawAny {
        RawAny::from_dtype(self)
    }
}

impl ToAnyView for DataType {
    fn to_raw_view(&self) -> RawAny {
        RawAny::from_dtype(*self)
    }
}

impl FromAny for DataType {
    fn check_raw_strict(raw: &RawAny) -> bool {
        raw.type_index == type_index::DATA_TYPE
    }

    unsafe fn copy_from_raw_after_check(raw: &RawAny) -> Self {
        raw.payload.v_dtype
    }

    fn try_cast_from_raw(raw: &RawAny) -> Option<Self> {
        match raw.type_index {
            type_index::DATA_TYPE => Some(unsafe { raw.payload.v_dtype }),
            type_index::RAW_STR => {
                let text = unsafe { CStr::from_ptr(raw.payload.v_c_str) };
                DataType::parse(text.to_str().ok()?).ok()
            }
            type_index::STR => {
                let text = Str::try_cast_from_raw(raw)?;
                DataType::parse(text.as_str()).ok()
            }
            _ => None,
        }
    }

    fn type_str() -> String {
        "DataType".to_string()
    }

    fn static_type_index() -> i32 {
        type_index::DATA_TYPE
    }
}

impl From<DataType> for Any {
    fn from(value: DataType) -> Self {
        Any::new(value)
    }
}

impl IntoAny for Device {
    fn into_raw_any(self) -> RawAny {
        RawAny::from_device(self)
    }
}

impl ToAnyView for Device {
    fn to_raw_view(&self) -> RawAny {
        RawAny::from_device(*self)
    }
}

impl FromAny for Device {
    fn check_raw_strict(raw: &RawAny) -> bool {
        raw.type_index == type_index::DEVICE
    }

    unsafe fn copy_from_raw_after_check(raw: &RawAny) -> Self {
        raw.payload.v_device
    }

    fn type_str() -> String {
        "Device".to_string()
    }

    fn static_type_index() -> i32 {
        type_index::DEVICE
    }
}

impl From<Device> for Any {
    fn from(value: Device) -> Self {
        Any::new(value)
    }
}

// ============================================================================
// Strings
// ============================================================================

impl IntoAny for &str {
    fn into_raw_any(self) -> RawAny {
        Str::new(self).into_raw_any()
    }
}

impl IntoAny for String {
    fn into_raw_any(self) -> RawAny {
        Str::from(self).into_raw_any()
    }
}

/// Borrowed C strings travel as `RAW_STR` views
impl ToAnyView for CStr {
    fn to_raw_view(&self) -> RawAny {
        RawAny::from_c_str(self.as_ptr())
    }
}

impl FromAny for String {
    fn check_raw_strict(raw: &RawAny) -> bool {
        raw.type_index == type_index::STR
    }

    unsafe fn copy_from_raw_after_check(raw: &RawAny) -> Self {
        Str::copy_from_raw_after_check(raw).as_str().to_string()
    }

    fn try_cast_from_raw(raw: &RawAny) -> Option<Self> {
        match raw.type_index {
            type_index::STR => Some(unsafe { Self::copy_from_raw_after_check(raw) }),
            type_index::RAW_STR => {
                let text = unsafe { CStr::from_ptr(raw.payload.v_c_str) };
                Some(text.to_string_lossy().into_owned())
            }
            _ => None,
        }
    }

    fn type_str() -> String {
        "str".to_string()
    }

    fn static_type_index() -> i32 {
        type_index::STR
    }
}

impl From<&str> for Any {
    fn from(value: &str) -> Self {
        Any::new(value)
    }
}

impl From<String> for Any {
    fn from(value: String) -> Self {
        Any::new(value)
    }
}

// ============================================================================
// Option, Any, ObjectRef
// ============================================================================

impl<T: IntoAny> IntoAny for Option<T> {
    fn into_raw_any(self) -> RawAny {
        match self {
            Some(value) => value.into_raw_any(),
            None => RawAny::NONE,
        }
    }
}

impl<T: ToAnyView> ToAnyView for Option<T> {
    fn to_raw_view(&self) -> RawAny {
        match self {
            Some(value) => value.to_raw_view(),
            None => RawAny::NONE,
        }
    }
}

impl<T: FromAny> FromAny for Option<T> {
    fn check_raw_strict(raw: &RawAny) -> bool {
        raw.is_none() || T::check_raw_strict(raw)
    }

    unsafe fn copy_from_raw_after_check(raw: &RawAny) -> Self {
        if raw.is_none() {
            None
        } else {
            Some(T::copy_from_raw_after_check(raw))
        }
    }

    fn try_cast_from_raw(raw: &RawAny) -> Option<Self> {
        if raw.is_none() {
            Some(None)
        } else {
            T::try_cast_from_raw(raw).map(Some)
        }
    }

    fn type_str() -> String {
        format!("Optional[{}]", T::type_str())
    }
}

impl IntoAny for Any {
    fn into_raw_any(self) -> RawAny {
        self.into_raw()
    }
}

impl ToAnyView for Any {
    fn to_raw_view(&self) -> RawAny {
        *self.as_raw()
    }
}

impl FromAny for Any {
    fn check_raw_strict(_raw: &RawAny) -> bool {
        true
    }

    unsafe fn copy_from_raw_after_check(raw: &RawAny) -> Self {
        AnyView::from_raw(*raw).to_owned_any()
    }

    fn type_str() -> String {
        "Any".to_string()
    }
}

impl ToAnyView for AnyView<'_> {
    fn to_raw_view(&self) -> RawAny {
        *self.as_raw()
    }
}

impl IntoAny for ObjectRef {
    fn into_raw_any(self) -> RawAny {
        unsafe { RawAny::from_object_ptr(self.into_raw()) }
    }
}

impl ToAnyView for ObjectRef {
    fn to_raw_view(&self) -> RawAny {
        unsafe { RawAny::from_object_ptr(self.as_ptr() as *mut _) }
    }
}

impl FromAny for ObjectRef {
    fn check_raw_strict(raw: &RawAny) -> bool {
        ref_accepts_tag::<ObjectRef>(raw.type_index)
    }

    unsafe fn copy_from_raw_after_check(raw: &RawAny) -> Self {
        ObjectRef::from_borrowed(raw.object_ptr())
    }

    fn type_str() -> String {
        "ffi.Object".to_string()
    }
}

impl From<ObjectRef> for Any {
    fn from(value: ObjectRef) -> Self {
        Any::new(value)
    }
}

impl From<bool> for Any {
    fn from(value: bool) -> Self {
        Any::new(value)
    }
}

impl From<()> for Any {
    fn from(_: ()) -> Self {
        Any::none()
    }
}

//! Tests for tagged values, conversions and dtype/device descriptors

use std::ffi::CString;

use super::*;
use crate::containers::{Array, Str};
use crate::error::ErrorKind;
use crate::object::ObjectRefType;

#[test]
fn test_layout_is_sixteen_bytes() {
    assert_eq!(core::mem::size_of::<RawAny>(), 16);
    assert_eq!(core::mem::size_of::<Any>(), 16);
    assert_eq!(core::mem::size_of::<AnyView<'_>>(), 16);
    assert_eq!(RawAny::NONE.bits(), 0);
}

#[test]
fn test_primitive_round_trips() {
    assert_eq!(Any::new(42i64).cast::<i64>().unwrap(), 42);
    assert_eq!(Any::new(-7i32).cast::<i32>().unwrap(), -7);
    assert!(Any::new(true).cast::<bool>().unwrap());
    assert_eq!(Any::new(2.5f64).cast::<f64>().unwrap(), 2.5);
    assert_eq!(Any::new("text").cast::<String>().unwrap(), "text");
    assert_eq!(Any::new(DataType::float(16)).cast::<DataType>().unwrap(), DataType::float(16));
    assert_eq!(Any::new(Device::cuda(1)).cast::<Device>().unwrap(), Device::cuda(1));
    assert!(Any::new(()).is_none());
    assert_eq!(Any::new(Some(3i64)).cast::<Option<i64>>().unwrap(), Some(3));
    assert_eq!(Any::none().cast::<Option<i64>>().unwrap(), None);
}

#[test]
fn test_cast_coerces_as_strict() {
    let int = Any::new(3i64);
    assert_eq!(int.cast::<f64>().unwrap(), 3.0);
    assert!(int.cast::<bool>().unwrap());
    assert_eq!(int.as_::<f64>(), None);
    assert_eq!(int.as_::<i64>(), Some(3));

    // Out-of-range narrowing is a mismatch, not a wrap
    assert!(Any::new(300i64).cast::<u8>().is_err());
    assert!(Any::new(-1i64).try_cast::<u32>().is_none());
}

#[test]
fn test_unsigned_64_bit_round_trips() {
    for value in [u64::MAX, i64::MAX as u64 + 1, 0, 7] {
        let any = Any::new(value);
        assert_eq!(any.type_index(), type_index::INT);
        assert_eq!(any.cast::<u64>().unwrap(), value);
        assert_eq!(any.as_::<u64>(), Some(value));
    }
    assert_eq!(Any::new(usize::MAX).cast::<usize>().unwrap(), usize::MAX);
    let max = u64::MAX;
    assert_eq!(AnyView::new(&max).cast::<u64>().unwrap(), u64::MAX);

    // The payload is the same 64 bits either way
    assert_eq!(Any::new(u64::MAX).cast::<i64>().unwrap(), -1);
}

#[test]
fn test_out_of_range_error_names_value_and_target() {
    let err = Any::new(300i64).cast::<i8>().unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::TypeError);
    assert_eq!(err.message(), "Value `300` of type `int` is out of range for `i8`");

    // A different kind is still a plain mismatch
    let err = Any::new(1.5f64).cast::<i8>().unwrap_err();
    assert_eq!(err.message(), "Cannot convert from type `float` to `int`");
}

#[test]
fn test_cast_error_names_both_types() {
    let err = Any::new("abc").cast::<i64>().unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::TypeError);
    assert!(err.message().contains("ffi.String"), "{}", err.message());
    assert!(err.message().contains("int"), "{}", err.message());

    let err = Any::new(1.5f64).cast::<Array>().unwrap_err();
    assert!(err.message().contains("float"));
    assert!(err.message().contains("ffi.Array"));
}

#[test]
fn test_clone_and_drop_manage_object_count() {
    let s = Str::new("shared");
    let a = Any::new(s.clone());
    assert_eq!(s.use_count(), 2);
    let b = a.clone();
    assert_eq!(s.use_count(), 3);
    drop(a);
    let view = b.view();
    assert_eq!(s.use_count(), 2);
    let owned = view.to_owned_any();
    assert_eq!(s.use_count(), 3);
    drop(owned);
    drop(b);
    assert_eq!(s.use_count(), 1);
}

#[test]
fn test_into_raw_and_from_raw_transfer_ownership() {
    let s = Str::new("moved");
    let raw = Any::new(s.clone()).into_raw();
    assert_eq!(s.use_count(), 2);
    let back = unsafe { Any::from_raw(raw) };
    assert!(back.same_as(&Any::new(s.clone())));
    drop(back);
    assert_eq!(s.use_count(), 1);
}

#[test]
fn test_take_leaves_none() {
    let mut value = Any::new(5i64);
    let taken = value.take();
    assert!(value.is_none());
    assert_eq!(taken.cast::<i64>().unwrap(), 5);
}

#[test]
fn test_views_of_borrowed_strings() {
    let text = CString::new("view me").unwrap();
    let view = AnyView::new(text.as_c_str());
    assert_eq!(view.type_index(), type_index::RAW_STR);
    assert_eq!(view.cast::<String>().unwrap(), "view me");
    assert!(view.as_::<String>().is_none());

    let owned = view.to_owned_any();
    assert_eq!(owned.type_index(), type_index::STR);
    drop(text);
    assert_eq!(owned.cast::<String>().unwrap(), "view me");
}

#[test]
fn test_equality_and_hash_functors() {
    let a = Any::new("key");
    let b = Any::new("key");
    assert!(!a.same_as(&b));
    assert!(AnyEqual.equal(&a, &b));
    assert_eq!(AnyHash.hash(&a), AnyHash.hash(&b));
    assert_eq!(a, b);

    let one = Any::new(1i64);
    assert_ne!(one, Any::new(1.0f64));
    assert_ne!(one, Any::new(true));
    assert_eq!(AnyHash.hash(&one), AnyHash.hash(&Any::new(1i64)));

    // Other objects compare by identity
    let x = Any::new(Array::from_iter([1i64]));
    let y = Any::new(Array::from_iter([1i64]));
    assert_ne!(x, y);
    assert_eq!(x, x.clone());
}

#[test]
fn test_display() {
    assert_eq!(Any::none().to_string(), "None");
    assert_eq!(Any::new(3i64).to_string(), "3");
    assert_eq!(Any::new(1.5f64).to_string(), "1.5");
    assert_eq!(Any::new(false).to_string(), "false");
    assert_eq!(Any::new("q").to_string(), "\"q\"");
    assert_eq!(Any::new(DataType::int(32)).to_string(), "int32");
    assert_eq!(Any::new(Device::cpu(0)).to_string(), "cpu:0");
}

#[test]
fn test_dtype_strings() {
    for text in ["int32", "uint8", "float16x4", "bfloat16", "bool", "handle", "int64x2", "void"] {
        let dtype = DataType::parse(text).unwrap();
        assert_eq!(dtype.to_str().unwrap(), text);
    }
    assert_eq!(DataType::parse("float").unwrap(), DataType::float(32));
    assert_eq!(DataType::parse("int8x16").unwrap().bytes(), 16);
    assert!(DataType::bool().is_bool());
    assert_eq!("uint1".parse::<DataType>().unwrap().to_str().unwrap(), "bool");

    for bad in ["", "float32x", "int999", "quux16", "int32x0"] {
        let err = DataType::parse(bad).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ValueError, "{}", bad);
    }

    let err = DataType::new(42, 8, 1).to_str().unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ValueError);
    assert!(DataType::new(42, 8, 1).to_string().starts_with("DataType(code=42"));
}

#[test]
fn test_dtype_coerces_from_strings() {
    assert_eq!(Any::new("float32").cast::<DataType>().unwrap(), DataType::float(32));
    assert!(Any::new("nonsense").cast::<DataType>().is_err());
}

#[test]
fn test_device_names() {
    assert_eq!(Device::cuda(2).to_string(), "cuda:2");
    assert_eq!(Device::new(device_type::METAL, 0).device_type_name(), "metal");
    assert_eq!(Device::new(99, 0).device_type_name(), "unknown");
}

#[test]
fn test_dtype_payload_padding_is_zeroed() {
    let raw = RawAny::from_dtype(DataType::int(8));
    let again = RawAny::from_dtype(DataType::int(8));
    assert_eq!(raw.bits(), again.bits());
    assert_eq!(raw.zero_padding, 0);
    assert!(any_equal(&raw, &again));
}

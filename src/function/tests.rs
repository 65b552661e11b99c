//! Tests for packed and typed functions and the global table

use super::*;
use crate::containers::Str;
use crate::object::ObjectRefType;

#[test]
fn test_packed_call_sums_arguments() {
    let sum = Function::from_packed(|args: &[AnyView<'_>]| {
        let mut total = 0i64;
        for arg in args {
            total += arg.cast::<i64>()?;
        }
        Ok(Any::new(total))
    });
    let result = sum.invoke(&[Any::new(1i64), Any::new(2i64), Any::new(3i64)]).unwrap();
    assert_eq!(result.cast::<i64>().unwrap(), 6);
}

#[test]
fn test_typed_call_converts_arguments() {
    let add = Function::from_typed("test.add", |a: i64, b: f64| a as f64 + b);
    let value: f64 = add.invoke_as(&[Any::new(2i64), Any::new(0.5f64)]).unwrap();
    assert_eq!(value, 2.5);
    // int coerces to float
    let value: f64 = add.invoke_as(&[Any::new(2i64), Any::new(3i64)]).unwrap();
    assert_eq!(value, 5.0);
}

#[test]
fn test_typed_argument_mismatch_names_position() {
    let add = Function::from_typed("test.add", |a: i64, b: i64| a + b);
    let err = add.invoke(&[Any::new(1i64), Any::new("x")]).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::TypeError);
    assert!(err.message().starts_with("Mismatched type on argument #1 when calling: `test.add"));
}

#[test]
fn test_typed_arity_mismatch() {
    let neg = Function::from_typed("test.neg", |a: i64| -a);
    let err = neg.invoke(&[]).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::TypeError);
    assert!(err.message().contains("Expected 1 but got 0"));
}

#[test]
fn test_fallible_typed_function_propagates() {
    let checked = Function::from_typed("test.checked", |a: i64| -> Result<i64> {
        if a < 0 {
            Err(Error::value_error("negative"))
        } else {
            Ok(a * 2)
        }
    });
    assert_eq!(checked.invoke_as::<i64>(&[Any::new(4i64)]).unwrap(), 8);
    let err = checked.invoke(&[Any::new(-1i64)]).unwrap_err();
    assert_eq!(err.message(), "negative");
}

#[test]
fn test_object_arguments_and_results() {
    let shout = Function::from_typed("test.shout", |s: Str| Str::new(&s.as_str().to_uppercase()));
    let out: Str = shout.invoke_as(&[Any::new("hi")]).unwrap();
    assert_eq!(out, "HI");
}

unsafe extern "C" fn double_first(
    _handle: *mut c_void,
    args: *const RawAny,
    num_args: i32,
    result: *mut RawAny,
) -> i32 {
    if num_args != 1 {
        set_raised(Error::type_error("expected one argument"));
        return -1;
    }
    let value = (*args).payload.v_int64;
    *result = RawAny::from_int(value * 2);
    0
}

#[test]
fn test_extern_function_roundtrip() {
    let f = unsafe { Function::from_extern_c(core::ptr::null_mut(), double_first, None) };
    assert!(f.is_extern());
    assert_eq!(f.invoke_as::<i64>(&[Any::new(21i64)]).unwrap(), 42);
    let err = f.invoke(&[]).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::TypeError);
    assert_eq!(err.message(), "expected one argument");
}

#[test]
fn test_safe_call_sets_raised_on_error() {
    let fails = Function::from_typed("test.fails", || -> Result<i64> {
        Err(Error::key_error("missing"))
    });
    let mut result = RawAny::NONE;
    let status = unsafe { fails.safe_call(core::ptr::null(), 0, &mut result) };
    assert_eq!(status, -1);
    let err = take_raised().unwrap();
    assert_eq!(err.kind(), &ErrorKind::KeyError);
}

#[test]
fn test_safe_call_catches_panics() {
    let boom = Function::from_typed("test.boom", || -> i64 { panic!("kaboom") });
    let mut result = RawAny::NONE;
    let status = unsafe { boom.safe_call(core::ptr::null(), 0, &mut result) };
    assert_eq!(status, -1);
    let err = take_raised().unwrap();
    assert_eq!(err.kind(), &ErrorKind::InternalError);
    assert_eq!(err.message(), "kaboom");
}

#[test]
fn test_undefined_function_call_is_runtime_error() {
    let f = Function::try_null().unwrap();
    let err = f.invoke(&[]).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::RuntimeError);
}

#[test]
fn test_global_registration_and_override() {
    let name = "test.function.global_one";
    let first = Function::from_typed(name, || 1i64);
    register_global(name, first, false).unwrap();

    let second = Function::from_typed(name, || 2i64);
    let err = register_global(name, second.clone(), false).unwrap_err();
    assert_eq!(err.message(), format!("Global Function `{}` is already registered", name));

    register_global(name, second, true).unwrap();
    let found = get_global(name).unwrap();
    assert_eq!(found.invoke_as::<i64>(&[]).unwrap(), 2);

    assert!(list_global_names().iter().any(|n| n == name));
    assert!(remove_global(name));
    assert!(get_global(name).is_none());
    assert!(!remove_global(name));
}

#[test]
fn test_global_def_builder() {
    let name = "test.function.global_def";
    GlobalDef::new(name).typed(|a: i64| a + 1).unwrap();
    assert!(GlobalDef::new(name).typed(|a: i64| a + 2).is_err());
    GlobalDef::new(name)
        .allow_override(true)
        .typed(|a: i64| a + 3)
        .unwrap();
    let f = get_global(name).unwrap();
    assert_eq!(f.invoke_as::<i64>(&[Any::new(1i64)]).unwrap(), 4);
    remove_global(name);
}

#[test]
fn test_function_in_any() {
    let f = Function::from_typed("test.in_any", || 7i64);
    let value = Any::new(f.clone());
    assert_eq!(value.type_index(), type_index::FUNCTION);
    let back: Function = value.cast().unwrap();
    assert!(back.same_as(&f));
}

//! Packed functions crossing the C ABI, the global table and module lookup

use std::ffi::{c_void, CString};

use tensor_ffi::error::{set_raised, take_raised};
use tensor_ffi::ffi::*;
use tensor_ffi::function::{get_global, list_global_names, register_global};
use tensor_ffi::interop::Module;
use tensor_ffi::{Any, AnyView, ErrorKind, Function, ObjectRef, ObjectRefType, RawAny};

fn handle_of(f: &Function) -> TffiObjectHandle {
    f.as_object_ref().as_ptr() as TffiObjectHandle
}

/// Call through the C entry point and take ownership of the result
fn call_raw(handle: TffiObjectHandle, args: &[Any]) -> tensor_ffi::Result<Any> {
    let raw: Vec<RawAny> = args.iter().map(|arg| *arg.as_raw()).collect();
    let mut result = RawAny::NONE;
    let status = unsafe { tffi_function_call(handle, raw.as_ptr(), raw.len() as i32, &mut result) };
    if status != 0 {
        return Err(take_raised().expect("failed call raises"));
    }
    Ok(unsafe { Any::from_raw(result) })
}

fn concat(args: &[RawAny]) -> tensor_ffi::Result<String> {
    let [a, b] = args else {
        return Err(tensor_ffi::Error::type_error("concat takes two arguments"));
    };
    let a = unsafe { AnyView::from_raw(*a) }.cast::<String>()?;
    let b = unsafe { AnyView::from_raw(*b) }.cast::<String>()?;
    Ok(a + &b)
}

/// Joins two strings the way a separately compiled module would
unsafe extern "C" fn concat_call(
    _handle: *mut c_void,
    args: *const RawAny,
    num_args: i32,
    result: *mut RawAny,
) -> i32 {
    let args = if num_args == 0 {
        &[][..]
    } else {
        std::slice::from_raw_parts(args, num_args as usize)
    };
    match concat(args) {
        Ok(text) => {
            *result = Any::new(text).into_raw();
            0
        }
        Err(err) => {
            set_raised(err);
            -1
        }
    }
}

#[test]
fn test_global_function_scenario() {
    tensor_ffi::tffi_runtime_init();
    let name = CString::new("ns.fn").unwrap();
    let original = Function::from_typed("ns.fn", |a: i64, b: String| format!("{}:{}", b, a));

    assert_eq!(unsafe { tffi_function_set_global(name.as_ptr(), handle_of(&original), 0) }, 0);
    assert!(list_global_names().iter().any(|n| n == "ns.fn"));

    let mut fetched: TffiObjectHandle = std::ptr::null_mut();
    assert_eq!(unsafe { tffi_function_get_global(name.as_ptr(), &mut fetched) }, 0);
    let out = call_raw(fetched, &[Any::new(7i64), Any::new("k")]).unwrap();
    assert_eq!(out.cast::<String>().unwrap(), "k:7");
    assert_eq!(
        original.invoke_as::<String>(&[Any::new(7i64), Any::new("k")]).unwrap(),
        "k:7"
    );

    // Same name without override is rejected
    let replacement = Function::from_typed("ns.fn", |a: i64, _: String| a * 2);
    assert_eq!(
        unsafe { tffi_function_set_global(name.as_ptr(), handle_of(&replacement), 0) },
        -1
    );
    assert_eq!(take_raised().unwrap().kind(), &ErrorKind::RuntimeError);

    // Override replaces the entry; the fetched handle still runs the original
    register_global("ns.fn", replacement, true).unwrap();
    let old = call_raw(fetched, &[Any::new(1i64), Any::new("x")]).unwrap();
    assert_eq!(old.cast::<String>().unwrap(), "x:1");
    let new = get_global("ns.fn").unwrap();
    assert_eq!(new.invoke_as::<i64>(&[Any::new(1i64), Any::new("x")]).unwrap(), 2);
    unsafe { tffi_object_dec_ref(fetched) };
}

#[test]
fn test_extern_function_through_rust_api() {
    let mut handle: TffiObjectHandle = std::ptr::null_mut();
    let status = unsafe {
        tffi_function_create(std::ptr::null_mut(), Some(concat_call), None, &mut handle)
    };
    assert_eq!(status, 0);
    let f: Function = tensor_ffi::cast::downcast(unsafe { ObjectRef::from_raw(handle as *mut _) })
        .unwrap();

    assert_eq!(
        f.invoke_as::<String>(&[Any::new("ab"), Any::new("cd")]).unwrap(),
        "abcd"
    );
    let err = f.invoke(&[Any::new("ab"), Any::new(1i64)]).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::TypeError);
    assert!(err.message().contains("Cannot convert"), "{}", err.message());
    let err = f.invoke(&[]).unwrap_err();
    assert_eq!(err.message(), "concat takes two arguments");
    assert!(take_raised().is_none());
}

#[test]
fn test_rust_function_through_c_api() {
    let f = Function::from_typed("test.abi.div", |a: i64, b: i64| {
        if b == 0 {
            return Err(tensor_ffi::Error::value_error("division by zero"));
        }
        Ok(a / b)
    });
    let handle = handle_of(&f);
    assert_eq!(
        call_raw(handle, &[Any::new(9i64), Any::new(3i64)])
            .unwrap()
            .cast::<i64>()
            .unwrap(),
        3
    );
    let err = call_raw(handle, &[Any::new(9i64), Any::new(0i64)]).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ValueError);
    assert_eq!(err.message(), "division by zero");

    let err = call_raw(handle, &[Any::new(9i64)]).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::TypeError);
    assert!(err.message().contains("Expected 2 but got 1"), "{}", err.message());
}

#[test]
fn test_functions_as_values() {
    let apply = Function::from_typed("test.abi.apply", |f: Function, x: i64| {
        f.invoke_as::<i64>(&[Any::new(x)])
    });
    let square = Function::from_typed("test.abi.square", |x: i64| x * x);
    assert_eq!(
        apply
            .invoke_as::<i64>(&[Any::new(square.clone()), Any::new(6i64)])
            .unwrap(),
        36
    );
    assert_eq!(square.use_count(), 1);
    assert!(apply.invoke(&[Any::new(3i64), Any::new(6i64)]).is_err());
}

#[test]
fn test_module_resolution_through_system_lib() {
    let symbol = CString::new("__tffi_test_abi_concat").unwrap();
    assert_eq!(
        unsafe { tffi_env_register_system_lib_symbol(symbol.as_ptr(), concat_call as *mut c_void) },
        0
    );

    let app = Module::new("test.abi.app");
    app.import_module(Module::system_lib());
    let f = app.get_function("test_abi_concat", true).unwrap();
    assert_eq!(
        f.invoke_as::<String>(&[Any::new("x"), Any::new("y")]).unwrap(),
        "xy"
    );
    assert!(app.get_function("test_abi_concat", false).is_none());

    let name = CString::new("test_abi_concat").unwrap();
    let mut out: TffiObjectHandle = std::ptr::null_mut();
    assert_eq!(
        unsafe { tffi_env_lookup_from_imports(handle_of_module(&app), name.as_ptr(), &mut out) },
        0
    );
    let again = call_raw(out, &[Any::new("1"), Any::new("2")]).unwrap();
    assert_eq!(again.cast::<String>().unwrap(), "12");
}

fn handle_of_module(module: &Module) -> TffiObjectHandle {
    module.as_object_ref().as_ptr() as TffiObjectHandle
}

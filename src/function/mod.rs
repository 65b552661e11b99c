//! `ffi.Function` - type-erased callable with a single packed entry point
//!
//! Design: Every function, whatever produced it, is invoked as
//! `(handle, args, num_args, result) -> status`. Rust closures are stored
//! boxed and called directly; foreign functions keep their handle, the
//! `safe_call` pointer and an optional handle deleter. A nonzero status means
//! the callee left an error in the thread-local raised slot.
//!
//! Typed closures (`Fn(i64, Str) -> f64` and friends) are wrapped by
//! [`Function::from_typed`], which unpacks each argument with `FromAny` and
//! reports mismatches as `TypeError`.

mod global;
mod typed;

#[cfg(test)]
mod tests;

use core::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::any::{Any, AnyView, RawAny};
use crate::error::{set_raised, take_raised, Error, ErrorKind, Result};
use crate::logging::{self, trace};
use crate::object::{make_object, Object};
use crate::registry::{type_index, StructuralKind};

pub use global::{get_global, list_global_names, register_global, remove_global, GlobalDef};
pub use typed::{Fallible, Plain, TypedFunction};

/// Packed calling convention shared with foreign modules
///
/// Returns 0 on success, nonzero after setting the raised error.
pub type SafeCallType = unsafe extern "C" fn(
    handle: *mut c_void,
    args: *const RawAny,
    num_args: i32,
    result: *mut RawAny,
) -> i32;

/// Releases a foreign function handle
pub type HandleDeleter = unsafe extern "C" fn(handle: *mut c_void);

type PackedFn = dyn Fn(&[AnyView<'_>]) -> Result<Any> + Send + Sync;

enum Callable {
    Packed(Box<PackedFn>),
    Extern {
        handle: *mut c_void,
        safe_call: SafeCallType,
        deleter: Option<HandleDeleter>,
    },
}

#[repr(C)]
pub struct FunctionNode {
    base: Object,
    name: String,
    callable: Callable,
}

// The foreign handle is owned by the node and only touched through
// `safe_call`, which the foreign side guarantees to be thread safe.
unsafe impl Send for FunctionNode {}
unsafe impl Sync for FunctionNode {}

impl Drop for FunctionNode {
    fn drop(&mut self) {
        if let Callable::Extern {
            handle,
            deleter: Some(deleter),
            ..
        } = self.callable
        {
            unsafe { deleter(handle) };
        }
    }
}

crate::object_type! {
    FunctionNode: "ffi.Function" extends Object {
        const STATIC_TYPE_INDEX: i32 = type_index::FUNCTION;
        const TYPE_FINAL: bool = true;
        const STRUCTURAL_KIND: StructuralKind = StructuralKind::UniqueInstance;
    }
}

crate::object_ref! {
    /// Reference to a callable
    pub struct Function(FunctionNode);
}

impl FunctionNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_extern(&self) -> bool {
        matches!(self.callable, Callable::Extern { .. })
    }

    fn invoke(&self, args: &[AnyView<'_>]) -> Result<Any> {
        match &self.callable {
            Callable::Packed(f) => f(args),
            Callable::Extern {
                handle, safe_call, ..
            } => {
                let mut result = RawAny::NONE;
                let status = unsafe {
                    safe_call(
                        *handle,
                        args.as_ptr() as *const RawAny,
                        args.len() as i32,
                        &mut result,
                    )
                };
                if status != 0 {
                    return Err(take_raised().unwrap_or_else(|| {
                        Error::runtime_error(format!(
                            "`{}` failed with status {} without raising an error",
                            self.name, status
                        ))
                    }));
                }
                Ok(unsafe { Any::from_raw(result) })
            }
        }
    }
}

impl Function {
    /// Wrap a closure over borrowed arguments
    pub fn from_packed<F>(f: F) -> Self
    where
        F: Fn(&[AnyView<'_>]) -> Result<Any> + Send + Sync + 'static,
    {
        Self::from_packed_named("<anonymous>", f)
    }

    pub fn from_packed_named<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[AnyView<'_>]) -> Result<Any> + Send + Sync + 'static,
    {
        Self::from_callable(name.into(), Callable::Packed(Box::new(f)))
    }

    /// Wrap a closure with typed arguments
    ///
    /// ```ignore
    /// let add = Function::from_typed("math.add", |a: i64, b: i64| a + b);
    /// ```
    pub fn from_typed<M, F>(name: impl Into<String>, f: F) -> Self
    where
        F: TypedFunction<M>,
    {
        let name = name.into();
        let label = name.clone();
        Self::from_callable(
            name,
            Callable::Packed(Box::new(move |args: &[AnyView<'_>]| {
                f.call_unpacked(&label, args)
            })),
        )
    }

    /// Wrap a foreign entry point
    ///
    /// # Safety
    /// `safe_call` must follow the packed convention for `handle`, and
    /// `deleter` (when given) must release `handle` exactly once.
    pub unsafe fn from_extern_c(
        handle: *mut c_void,
        safe_call: SafeCallType,
        deleter: Option<HandleDeleter>,
    ) -> Self {
        Self::from_extern_c_named("<extern>", handle, safe_call, deleter)
    }

    /// [`Function::from_extern_c`] with a name for diagnostics
    ///
    /// # Safety
    /// Same contract as [`Function::from_extern_c`].
    pub unsafe fn from_extern_c_named(
        name: impl Into<String>,
        handle: *mut c_void,
        safe_call: SafeCallType,
        deleter: Option<HandleDeleter>,
    ) -> Self {
        Self::from_callable(
            name.into(),
            Callable::Extern {
                handle,
                safe_call,
                deleter,
            },
        )
    }

    fn from_callable(name: String, callable: Callable) -> Self {
        Self::from_ptr(make_object(FunctionNode {
            base: Object::new(),
            name,
            callable,
        }))
    }

    /// Call with borrowed arguments
    ///
    /// Calling an undefined function is a `RuntimeError`.
    pub fn call_packed(&self, args: &[AnyView<'_>]) -> Result<Any> {
        match self.get() {
            Some(node) => {
                trace!(function = node.name(), args = args.len(), "call");
                node.invoke(args)
            }
            None => Err(Error::runtime_error("calling an undefined Function")),
        }
    }

    /// Call with owned arguments
    pub fn invoke(&self, args: &[Any]) -> Result<Any> {
        let views: Vec<AnyView<'_>> = args.iter().map(Any::view).collect();
        self.call_packed(&views)
    }

    /// Call and convert the result
    pub fn invoke_as<T: crate::any::FromAny>(&self, args: &[Any]) -> Result<T> {
        self.invoke(args)?.cast()
    }

    /// Packed entry point for foreign callers
    ///
    /// Panics are caught and surfaced as `InternalError`.
    ///
    /// # Safety
    /// `args` must point to `num_args` valid values and `result` must be
    /// writable.
    pub unsafe fn safe_call(&self, args: *const RawAny, num_args: i32, result: *mut RawAny) -> i32 {
        let args: &[AnyView<'_>] = if num_args <= 0 || args.is_null() {
            &[]
        } else {
            core::slice::from_raw_parts(args as *const AnyView<'_>, num_args as usize)
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| self.call_packed(args)));
        match outcome {
            Ok(Ok(value)) => {
                *result = value.into_raw();
                0
            }
            Ok(Err(error)) => {
                logging::log_ffi_error(self.name(), error.message());
                set_raised(error);
                -1
            }
            Err(panic) => {
                let message = panic_message(&*panic);
                set_raised(Error::new(ErrorKind::InternalError, message));
                -1
            }
        }
    }

    /// Name given at construction, empty when undefined
    pub fn name(&self) -> &str {
        self.get().map_or("", FunctionNode::name)
    }
}

fn panic_message(panic: &(dyn core::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

/// `safe_call` for a function handle that is itself a `FunctionNode`
///
/// # Safety
/// `handle` must point to a live `FunctionNode`.
pub unsafe extern "C" fn function_safe_call(
    handle: *mut c_void,
    args: *const RawAny,
    num_args: i32,
    result: *mut RawAny,
) -> i32 {
    let function: Function = crate::cast::get_ref(handle as *const FunctionNode);
    function.safe_call(args, num_args, result)
}

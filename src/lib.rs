//! tensor-ffi - ABI-stable value and object runtime
//!
//! This crate provides the value representation, object model and structural
//! comparison machinery shared by native code, dynamically loaded modules and
//! managed-language front ends of a tensor compiler.
//!
//! Layers, leaves first:
//! - `registry` - process-wide type table (type keys, indices, ancestors)
//! - `object` - intrusive refcounted object header, `ObjectPtr`, `ObjectRef`
//! - `any` - the 16-byte tagged value (`Any` / `AnyView`) and conversions
//! - `cast` - checked downcasts between reference types
//! - `containers` - strings, arrays, maps, shapes and boxed primitives
//! - `function` - packed functions and the global function table
//! - `reflection` - per-type field and method descriptors
//! - `structural` - structural equality and hashing with path tracing
//! - `interop` / `ffi` - modules, environment hooks and the C ABI

pub mod logging;
pub mod config;
pub mod error;
pub mod registry;
pub mod object;
pub mod any;
pub mod cast;
pub mod containers;
pub mod function;
pub mod reflection;
pub mod structural;
pub mod interop;
pub mod ffi;

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::OnceCell;
}

// Re-export core types
pub use any::{Any, AnyView, DataType, Device, FromAny, IntoAny, RawAny, ToAnyView};
pub use cast::{downcast, downcast_optional, get_ref, get_ref_from_raw, try_downcast};
pub use config::RuntimeConfig;
pub use containers::{Array, BoxBool, BoxFloat, BoxInt, Bytes, Map, Shape, Str};
pub use error::{Error, ErrorKind, Result};
pub use function::Function;
pub use object::{make_object, Object, ObjectPtr, ObjectRef, ObjectRefType, ObjectType};
pub use registry::{type_index, StructuralKind, TypeInfo};
pub use structural::{
    structural_equal, structural_hash, ObjectPath, ObjectPathPair, StructuralEqual,
    StructuralHash,
};

/// Runtime initialization
///
/// Installs logging from the environment, forces the type table and registers
/// reflection for the built-in types. Safe to call more than once.
#[no_mangle]
pub extern "C" fn tffi_runtime_init() {
    logging::init();
    registry::init();
    reflection::init_builtin();
    logging::log_runtime_init();
}

/// Runtime cleanup
#[no_mangle]
pub extern "C" fn tffi_runtime_cleanup() {
    interop::clear_system_lib();
    logging::log_runtime_shutdown();
}

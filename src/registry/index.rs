//! Fixed type indices shared across every module that links the runtime
//!
//! Indices below `STATIC_OBJECT_BEGIN` are value kinds stored inline in an
//! `Any` payload. Indices in `[STATIC_OBJECT_BEGIN, DYN_OBJECT_BEGIN)` are
//! object types with compiled-in indices. Everything else is handed out at
//! first registration.

/// Sentinel meaning "any type" in signatures and static-index queries
pub const ANY: i32 = -1;

pub const NONE: i32 = 0;
pub const INT: i32 = 1;
pub const BOOL: i32 = 2;
pub const FLOAT: i32 = 3;
pub const OPAQUE_PTR: i32 = 4;
pub const DATA_TYPE: i32 = 5;
pub const DEVICE: i32 = 6;
/// Borrowed NUL-terminated string, only valid inside a view
pub const RAW_STR: i32 = 7;
/// Borrowed byte buffer, only valid inside a view
pub const BYTE_ARRAY_PTR: i32 = 8;

pub const STATIC_OBJECT_BEGIN: i32 = 64;
pub const OBJECT: i32 = 64;
pub const STR: i32 = 65;
pub const BYTES: i32 = 66;
pub const ERROR: i32 = 67;
pub const FUNCTION: i32 = 68;
pub const SHAPE: i32 = 69;
pub const ARRAY: i32 = 70;
pub const MAP: i32 = 71;
pub const MODULE: i32 = 72;
pub const OBJECT_PATH: i32 = 73;
pub const BOX_INT: i32 = 74;
pub const BOX_FLOAT: i32 = 75;
pub const BOX_BOOL: i32 = 76;

pub const DYN_OBJECT_BEGIN: i32 = 128;

/// Whether a tag denotes a refcounted object payload
#[inline]
pub const fn is_object(index: i32) -> bool {
    index >= STATIC_OBJECT_BEGIN
}

/// Keys of the inline value kinds, in index order
pub(crate) const POD_KEYS: [(i32, &str); 9] = [
    (NONE, "None"),
    (INT, "int"),
    (BOOL, "bool"),
    (FLOAT, "float"),
    (OPAQUE_PTR, "void*"),
    (DATA_TYPE, "DataType"),
    (DEVICE, "Device"),
    (RAW_STR, "const char*"),
    (BYTE_ARRAY_PTR, "ByteArray*"),
];

//! `ffi.String` and `ffi.Bytes` - immutable byte sequences owned by objects

use core::fmt;
use std::ffi::CStr;
use std::hash::{Hash, Hasher};

use crate::any::{Any, RawAny};
use crate::object::{make_object, Object};
use crate::registry::{type_index, StructuralKind};

#[repr(C)]
pub struct StrNode {
    base: Object,
    data: Box<str>,
}

crate::object_type! {
    StrNode: "ffi.String" extends Object {
        const STATIC_TYPE_INDEX: i32 = type_index::STR;
        const TYPE_FINAL: bool = true;
        const STRUCTURAL_KIND: StructuralKind = StructuralKind::TreeNode;
    }
}

crate::object_ref! {
    /// Immutable UTF-8 string object
    pub struct Str(StrNode) {
        const NULLABLE: bool = false;

        fn coerce_from_raw(raw: &RawAny) -> Option<Self> {
            if raw.type_index != type_index::RAW_STR {
                return None;
            }
            let text = unsafe { CStr::from_ptr(raw.payload.v_c_str) };
            Some(Str::new(&text.to_string_lossy()))
        }
    }
}

impl StrNode {
    pub fn as_str(&self) -> &str {
        &self.data
    }
}

impl Str {
    pub fn new(text: &str) -> Self {
        Self::from_ptr(make_object(StrNode {
            base: Object::new(),
            data: text.into(),
        }))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<String> for Str {
    fn from(text: String) -> Self {
        Self::from_ptr(make_object(StrNode {
            base: Object::new(),
            data: text.into_boxed_str(),
        }))
    }
}

impl From<&str> for Str {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl PartialEq for Str {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Str {}

impl PartialEq<str> for Str {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Str {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl Hash for Str {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Display for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[repr(C)]
pub struct BytesNode {
    base: Object,
    data: Box<[u8]>,
}

crate::object_type! {
    BytesNode: "ffi.Bytes" extends Object {
        const STATIC_TYPE_INDEX: i32 = type_index::BYTES;
        const TYPE_FINAL: bool = true;
        const STRUCTURAL_KIND: StructuralKind = StructuralKind::TreeNode;
    }
}

crate::object_ref! {
    /// Immutable byte buffer object
    pub struct Bytes(BytesNode) {
        const NULLABLE: bool = false;
    }
}

impl BytesNode {
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Bytes {
    pub fn new(bytes: &[u8]) -> Self {
        Self::from_ptr(make_object(BytesNode {
            base: Object::new(),
            data: bytes.into(),
        }))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_ptr(make_object(BytesNode {
            base: Object::new(),
            data: bytes.into_boxed_slice(),
        }))
    }
}

impl PartialEq for Bytes {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Bytes {}

impl From<&[u8]> for Any {
    fn from(bytes: &[u8]) -> Self {
        Any::new(Bytes::new(bytes))
    }
}

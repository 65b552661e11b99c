//! Boxed primitives - an int, float or bool wrapped as an object
//!
//! Used where an object is required (map values compared structurally,
//! reflection fields of object type). Each exposes one readonly field,
//! `value`.

use crate::object::{make_object, Object};
use crate::registry::{type_index, StructuralKind};

macro_rules! boxed_primitive {
    ($(#[$meta:meta])* $name:ident, $node:ident, $key:literal, $index:expr, $ty:ty) => {
        #[repr(C)]
        pub struct $node {
            base: Object,
            pub value: $ty,
        }

        crate::object_type! {
            $node: $key extends Object {
                const STATIC_TYPE_INDEX: i32 = $index;
                const TYPE_FINAL: bool = true;
                const STRUCTURAL_KIND: StructuralKind = StructuralKind::TreeNode;
            }
        }

        crate::object_ref! {
            $(#[$meta])*
            pub struct $name($node) {
                const NULLABLE: bool = false;
            }
        }

        impl $name {
            pub fn new(value: $ty) -> Self {
                Self::from_ptr(make_object($node {
                    base: Object::new(),
                    value,
                }))
            }

            pub fn value(&self) -> $ty {
                self.get().map_or(<$ty>::default(), |node| node.value)
            }
        }
    };
}

boxed_primitive!(
    /// Integer object
    BoxInt, BoxIntNode, "ffi.BoxInt", type_index::BOX_INT, i64
);
boxed_primitive!(
    /// Float object
    BoxFloat, BoxFloatNode, "ffi.BoxFloat", type_index::BOX_FLOAT, f64
);
boxed_primitive!(
    /// Bool object
    BoxBool, BoxBoolNode, "ffi.BoxBool", type_index::BOX_BOOL, bool
);

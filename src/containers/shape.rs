//! `ffi.Shape` - immutable tensor shape

use core::fmt;

use crate::object::{make_object, Object};
use crate::registry::{type_index, StructuralKind};

#[repr(C)]
pub struct ShapeNode {
    base: Object,
    dims: Box<[i64]>,
}

crate::object_type! {
    ShapeNode: "ffi.Shape" extends Object {
        const STATIC_TYPE_INDEX: i32 = type_index::SHAPE;
        const TYPE_FINAL: bool = true;
        const STRUCTURAL_KIND: StructuralKind = StructuralKind::TreeNode;
    }
}

crate::object_ref! {
    /// Sequence of dimension extents
    pub struct Shape(ShapeNode) {
        const NULLABLE: bool = false;
    }
}

impl ShapeNode {
    pub fn dims(&self) -> &[i64] {
        &self.dims
    }
}

impl Shape {
    pub fn new(dims: impl Into<Vec<i64>>) -> Self {
        Self::from_ptr(make_object(ShapeNode {
            base: Object::new(),
            dims: dims.into().into_boxed_slice(),
        }))
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Number of elements, 1 for a scalar shape
    pub fn numel(&self) -> i64 {
        self.dims.iter().product()
    }
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        self.dims() == other.dims()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, dim) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", dim)?;
        }
        if self.dims.len() == 1 {
            write!(f, ",")?;
        }
        write!(f, ")")
    }
}

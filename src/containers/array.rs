//! `ffi.Array` - ordered, copy-on-write sequence of tagged values
//!
//! Elements live in the same block as the header (see `InplaceArray`).
//! Mutation writes in place while the handle is the only owner and copies
//! into a fresh block otherwise.

use core::fmt;

use crate::any::Any;
use crate::error::Result;
use crate::object::{
    inplace_at, inplace_elements, inplace_slice, make_inplace_object, InplaceArray, Object,
    ObjectRefType,
};
use crate::registry::{type_index, StructuralKind};

#[repr(C)]
pub struct ArrayNode {
    base: Object,
    len: usize,
    capacity: usize,
}

crate::object_type! {
    ArrayNode: "ffi.Array" extends Object {
        const STATIC_TYPE_INDEX: i32 = type_index::ARRAY;
        const TYPE_FINAL: bool = true;
        const STRUCTURAL_KIND: StructuralKind = StructuralKind::TreeNode;
    }
}

unsafe impl InplaceArray for ArrayNode {
    type Element = Any;

    fn inplace_len(&self) -> usize {
        self.len
    }

    fn inplace_capacity(&self) -> usize {
        self.capacity
    }

    unsafe fn set_inplace_len(&mut self, len: usize) {
        self.len = len;
    }
}

crate::object_ref! {
    /// Ordered sequence of values
    pub struct Array(ArrayNode) {
        const NULLABLE: bool = false;
    }
}

const MIN_CAPACITY: usize = 4;

impl Array {
    pub fn new() -> Self {
        Self::with_capacity(Vec::new(), 0)
    }

    /// Build from values, reserving room for `capacity` elements
    pub fn with_capacity(values: Vec<Any>, capacity: usize) -> Self {
        let len = values.len();
        let header = ArrayNode {
            base: Object::new(),
            len,
            capacity: capacity.max(len),
        };
        Self::from_ptr(make_inplace_object(header, values))
    }

    pub fn from_values<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Any>,
    {
        let values: Vec<Any> = values.into_iter().map(Into::into).collect();
        let capacity = values.len();
        Self::with_capacity(values, capacity)
    }

    fn node_ptr(&self) -> *const ArrayNode {
        self.as_object_ref().as_ptr() as *const ArrayNode
    }

    pub fn as_slice(&self) -> &[Any] {
        unsafe { inplace_slice(self.node_ptr()) }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Element at `index` (IndexError when out of range)
    pub fn at(&self, index: i64) -> Result<Any> {
        unsafe { inplace_at(self.node_ptr(), index) }.cloned()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Any> {
        self.as_slice().iter()
    }

    pub fn to_vec(&self) -> Vec<Any> {
        self.as_slice().to_vec()
    }

    /// Append, reusing spare capacity when this handle is the only owner
    pub fn push(&mut self, value: impl Into<Any>) {
        let value = value.into();
        let len = self.len();
        if self.use_count() == 1 && len < self.capacity() {
            unsafe {
                let node = self.node_ptr() as *mut ArrayNode;
                inplace_elements(node).add(len).write(value);
                (*node).set_inplace_len(len + 1);
            }
            return;
        }
        let mut values = Vec::with_capacity(len + 1);
        values.extend_from_slice(self.as_slice());
        values.push(value);
        let capacity = (len * 2).max(MIN_CAPACITY);
        *self = Self::with_capacity(values, capacity);
    }

    /// Replace the element at `index` (IndexError when out of range)
    pub fn set(&mut self, index: i64, value: impl Into<Any>) -> Result<()> {
        unsafe { inplace_at(self.node_ptr(), index) }?;
        let slot = index as usize;
        let value = value.into();
        if self.use_count() == 1 {
            unsafe {
                let node = self.node_ptr() as *mut ArrayNode;
                *inplace_elements(node).add(slot) = value;
            }
        } else {
            let mut values = self.to_vec();
            values[slot] = value;
            let capacity = self.capacity();
            *self = Self::with_capacity(values, capacity);
        }
        Ok(())
    }
}

impl Default for Array {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Into<Any>> FromIterator<T> for Array {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_values(iter)
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Any;
    type IntoIter = std::slice::Iter<'a, Any>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Build an `Array` from values convertible to `Any`
#[macro_export]
macro_rules! array {
    ($($value:expr),* $(,)?) => {
        $crate::containers::Array::from_values(
            ::std::vec![$($crate::any::Any::from($value)),*]
        )
    };
}

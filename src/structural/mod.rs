//! Structural equality and hashing over object graphs
//!
//! Design: Both engines walk the graph with an explicit task stack, never
//! native recursion, so arbitrarily deep trees cannot overflow the call
//! stack. Each object is dispatched on its type:
//! - built-in containers (`Str`, `Bytes`, `Shape`, boxed primitives,
//!   `Array`, `Map`) have fixed rules
//! - every other type follows the `StructuralKind` recorded in its
//!   `TypeInfo` and compares its reflected fields in declared order,
//!   skipping fields flagged `sequal_ignore`
//!
//! Free variables and DAG nodes are graph nodes: equality pairs them one to
//! one across the two graphs, hashing numbers them by first occurrence when
//! free variables are mapped.

mod equal;
mod hash;
mod path;
mod printer;


use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::any::Any;
use crate::cast::try_downcast;
use crate::containers::{
    Array, BoxBoolNode, BoxFloatNode, BoxIntNode, BytesNode, Map, ShapeNode, StrNode,
};
use crate::error::{Error, Result};
use crate::object::ObjectRef;
use crate::reflection::{self, FieldInfo};
use crate::registry::{self, type_index, StructuralKind};

pub use equal::StructuralEqual;
pub use hash::StructuralHash;
pub use path::{ObjectPath, ObjectPathNode, ObjectPathPair, PathKind};
pub use printer::render_with_underline;

/// Structural equality with default options
pub fn structural_equal(lhs: &Any, rhs: &Any, map_free_vars: bool) -> Result<bool> {
    StructuralEqual::new().map_free_vars(map_free_vars).equal(lhs, rhs)
}

/// Structural hash with default options
pub fn structural_hash(value: &Any, map_free_vars: bool) -> Result<u64> {
    StructuralHash::new().map_free_vars(map_free_vars).hash(value)
}

/// How one object is compared and hashed
pub(crate) enum Node<'a> {
    Str(&'a str),
    Bytes(&'a [u8]),
    Shape(&'a [i64]),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Array),
    Map(Map),
    Reflected(StructuralKind),
}

pub(crate) fn classify(object: &ObjectRef) -> Node<'_> {
    let node = match object.type_index() {
        type_index::STR => object.as_::<StrNode>().map(|n| Node::Str(n.as_str())),
        type_index::BYTES => object.as_::<BytesNode>().map(|n| Node::Bytes(n.as_bytes())),
        type_index::SHAPE => object.as_::<ShapeNode>().map(|n| Node::Shape(n.dims())),
        type_index::BOX_INT => object.as_::<BoxIntNode>().map(|n| Node::Int(n.value)),
        type_index::BOX_FLOAT => object.as_::<BoxFloatNode>().map(|n| Node::Float(n.value)),
        type_index::BOX_BOOL => object.as_::<BoxBoolNode>().map(|n| Node::Bool(n.value)),
        type_index::ARRAY => try_downcast::<Array, _>(object).map(Node::Array),
        type_index::MAP => try_downcast::<Map, _>(object).map(Node::Map),
        _ => None,
    };
    node.unwrap_or_else(|| {
        let kind = registry::global()
            .expect_info(object.type_index())
            .structural_kind;
        Node::Reflected(kind)
    })
}

pub(crate) fn unsupported(object: &ObjectRef) -> Error {
    Error::type_error(format!(
        "`{}` does not support structural equality and hashing",
        object.type_key()
    ))
}

/// Absolute-epsilon float comparison, NaN equal to NaN
pub(crate) fn float_equal(lhs: f64, rhs: f64) -> bool {
    lhs == rhs || (lhs.is_nan() && rhs.is_nan()) || (lhs - rhs).abs() < f64::EPSILON
}

/// Reflected fields per type for the duration of one traversal
#[derive(Default)]
pub(crate) struct FieldCache {
    fields: HashMap<i32, Rc<[Arc<FieldInfo>]>>,
}

impl FieldCache {
    pub(crate) fn get(&mut self, type_index: i32) -> Rc<[Arc<FieldInfo>]> {
        self.fields
            .entry(type_index)
            .or_insert_with(|| reflection::fields_of(type_index).into())
            .clone()
    }
}

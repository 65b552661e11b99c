//! Built-in containers with fixed type indices
//!
//! Strings, byte buffers, arrays, maps, shapes and boxed primitives. All are
//! final types; arrays and maps mutate copy-on-write.

mod array;
mod boxed;
mod map;
mod shape;
mod string;

#[cfg(test)]
mod tests;

pub use array::{Array, ArrayNode};
pub use boxed::{BoxBool, BoxBoolNode, BoxFloat, BoxFloatNode, BoxInt, BoxIntNode};
pub use map::{Map, MapNode};
pub use shape::{Shape, ShapeNode};
pub use string::{Bytes, BytesNode, Str, StrNode};

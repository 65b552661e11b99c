//! `ObjectPath` - location of a sub-value inside an object tree
//!
//! A path is an immutable linked list of steps from a root (`<root>`)
//! through attributes, array indices and map keys. Paths share their
//! prefixes, so extending one is a single allocation.

use core::fmt;

use crate::any::{any_equal, Any};
use crate::containers::Str;
use crate::error::{Error, Result};
use crate::object::{make_object, Object};
use crate::registry::type_index;

/// One step of a path
#[derive(Clone, Debug)]
pub enum PathKind {
    Root(Option<String>),
    Attribute(String),
    ArrayIndex(i64),
    /// Index present on the other side only
    MissingArrayElement(i64),
    MapValue(Any),
    /// Key present on the other side only
    MissingMapEntry,
}

impl PartialEq for PathKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PathKind::Root(a), PathKind::Root(b)) => a == b,
            (PathKind::Attribute(a), PathKind::Attribute(b)) => a == b,
            (PathKind::ArrayIndex(a), PathKind::ArrayIndex(b)) => a == b,
            (PathKind::MissingArrayElement(a), PathKind::MissingArrayElement(b)) => a == b,
            (PathKind::MapValue(a), PathKind::MapValue(b)) => any_equal(a.as_raw(), b.as_raw()),
            (PathKind::MissingMapEntry, PathKind::MissingMapEntry) => true,
            _ => false,
        }
    }
}

#[repr(C)]
pub struct ObjectPathNode {
    base: Object,
    parent: Option<ObjectPath>,
    kind: PathKind,
    length: usize,
}

crate::object_type! {
    ObjectPathNode: "ffi.reflection.ObjectPath" extends Object {
        const STATIC_TYPE_INDEX: i32 = type_index::OBJECT_PATH;
        const TYPE_FINAL: bool = true;
    }
}

crate::object_ref! {
    /// Path from a root to a sub-value
    pub struct ObjectPath(ObjectPathNode) {
        const NULLABLE: bool = false;
    }
}

impl ObjectPathNode {
    pub fn kind(&self) -> &PathKind {
        &self.kind
    }
}

impl ObjectPath {
    pub fn root() -> Self {
        Self::make(None, PathKind::Root(None))
    }

    pub fn root_named(name: impl Into<String>) -> Self {
        Self::make(None, PathKind::Root(Some(name.into())))
    }

    fn make(parent: Option<ObjectPath>, kind: PathKind) -> Self {
        let length = parent.as_ref().map_or(0, ObjectPath::len) + 1;
        Self::from_ptr(make_object(ObjectPathNode {
            base: Object::new(),
            parent,
            kind,
            length,
        }))
    }

    fn extend(&self, kind: PathKind) -> Self {
        Self::make(Some(self.clone()), kind)
    }

    pub fn attr(&self, name: impl Into<String>) -> Self {
        self.extend(PathKind::Attribute(name.into()))
    }

    pub fn array_index(&self, index: i64) -> Self {
        self.extend(PathKind::ArrayIndex(index))
    }

    pub fn missing_array_element(&self, index: i64) -> Self {
        self.extend(PathKind::MissingArrayElement(index))
    }

    pub fn map_value(&self, key: Any) -> Self {
        self.extend(PathKind::MapValue(key))
    }

    pub fn missing_map_entry(&self) -> Self {
        self.extend(PathKind::MissingMapEntry)
    }

    /// Number of steps, the root included
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn parent(&self) -> Option<ObjectPath> {
        self.parent.clone()
    }

    /// The first `length` steps
    ///
    /// IndexError when `length` is zero or longer than the path.
    pub fn prefix(&self, length: usize) -> Result<ObjectPath> {
        if length == 0 || length > self.len() {
            return Err(Error::index_error(format!(
                "prefix length {} out of range for a path of length {}",
                length,
                self.len()
            )));
        }
        let mut current = self.clone();
        while current.len() > length {
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Ok(current)
    }

    /// Whether `other` starts with all of this path's steps
    pub fn is_prefix_of(&self, other: &ObjectPath) -> bool {
        if self.len() > other.len() {
            return false;
        }
        other.prefix(self.len()).is_ok_and(|prefix| prefix == *self)
    }

    /// Steps from the root to this path's end
    pub fn steps(&self) -> Vec<PathKind> {
        let mut steps = Vec::with_capacity(self.len());
        let mut current = Some(self.clone());
        while let Some(path) = current {
            steps.push(path.kind.clone());
            current = path.parent();
        }
        steps.reverse();
        steps
    }
}

impl PartialEq for ObjectPath {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mut lhs = Some(self.clone());
        let mut rhs = Some(other.clone());
        while let (Some(a), Some(b)) = (lhs, rhs) {
            if a.same_as_path(&b) {
                return true;
            }
            if a.kind != b.kind {
                return false;
            }
            lhs = a.parent();
            rhs = b.parent();
        }
        true
    }
}

impl ObjectPath {
    fn same_as_path(&self, other: &ObjectPath) -> bool {
        self.0.same_as(&other.0)
    }
}

fn fmt_key(key: &Any, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match key.as_::<Str>() {
        Some(text) => write!(f, "{:?}", text.as_str()),
        None => write!(f, "{}", key),
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in self.steps() {
            match step {
                PathKind::Root(None) => f.write_str("<root>")?,
                PathKind::Root(Some(name)) => f.write_str(&name)?,
                PathKind::Attribute(name) => write!(f, ".{}", name)?,
                PathKind::ArrayIndex(index) => write!(f, "[{}]", index)?,
                PathKind::MissingArrayElement(index) => {
                    write!(f, "[<missing element #{}>]", index)?
                }
                PathKind::MapValue(key) => {
                    f.write_str("[")?;
                    fmt_key(&key, f)?;
                    f.write_str("]")?
                }
                PathKind::MissingMapEntry => f.write_str("[<missing entry>]")?,
            }
        }
        Ok(())
    }
}

/// A pair of paths into the two sides of a comparison
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectPathPair {
    pub lhs: ObjectPath,
    pub rhs: ObjectPath,
}

impl ObjectPathPair {
    pub fn new(lhs: ObjectPath, rhs: ObjectPath) -> Self {
        Self { lhs, rhs }
    }

    pub fn root() -> Self {
        Self::new(ObjectPath::root(), ObjectPath::root())
    }

    pub fn attr(&self, name: &str) -> Self {
        Self::new(self.lhs.attr(name), self.rhs.attr(name))
    }

    pub fn array_index(&self, index: i64) -> Self {
        Self::new(self.lhs.array_index(index), self.rhs.array_index(index))
    }
}

impl fmt::Display for ObjectPathPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lhs, self.rhs)
    }
}

//! `ffi.Map` - insertion-ordered, copy-on-write hash map of tagged values
//!
//! Keys hash with `any_hash` and compare with `any_equal`: strings by
//! content, everything else by tag and payload (objects by identity).

use std::collections::HashMap;

use core::fmt;

use crate::any::{Any, AnyKey};
use crate::error::{Error, Result};
use crate::object::{make_object, Object, ObjectRefType};
use crate::registry::{type_index, StructuralKind};

#[repr(C)]
pub struct MapNode {
    base: Object,
    entries: Vec<(Any, Any)>,
    index: HashMap<AnyKey, usize>,
}

crate::object_type! {
    MapNode: "ffi.Map" extends Object {
        const STATIC_TYPE_INDEX: i32 = type_index::MAP;
        const TYPE_FINAL: bool = true;
        const STRUCTURAL_KIND: StructuralKind = StructuralKind::TreeNode;
    }
}

crate::object_ref! {
    /// Key-value mapping that remembers insertion order
    pub struct Map(MapNode) {
        const NULLABLE: bool = false;
    }
}

impl MapNode {
    fn from_entries(entries: Vec<(Any, Any)>) -> Self {
        let mut node = Self {
            base: Object::new(),
            entries: Vec::with_capacity(entries.len()),
            index: HashMap::with_capacity(entries.len()),
        };
        for (key, value) in entries {
            node.insert(key, value);
        }
        node
    }

    fn insert(&mut self, key: Any, value: Any) {
        match self.index.get(&AnyKey(key.clone())) {
            Some(&slot) => self.entries[slot].1 = value,
            None => {
                self.index.insert(AnyKey(key.clone()), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    fn remove(&mut self, key: &Any) -> bool {
        let Some(slot) = self.index.remove(&AnyKey(key.clone())) else {
            return false;
        };
        self.entries.remove(slot);
        for position in self.index.values_mut() {
            if *position > slot {
                *position -= 1;
            }
        }
        true
    }

    fn lookup(&self, key: &Any) -> Option<&Any> {
        let slot = *self.index.get(&AnyKey(key.clone()))?;
        Some(&self.entries[slot].1)
    }

    pub fn entries(&self) -> &[(Any, Any)] {
        &self.entries
    }
}

impl Map {
    pub fn new() -> Self {
        Self::from_ptr(make_object(MapNode::from_entries(Vec::new())))
    }

    /// Build from pairs; later duplicates overwrite earlier values in place
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Any>,
        V: Into<Any>,
    {
        let entries = pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self::from_ptr(make_object(MapNode::from_entries(entries)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: impl Into<Any>) -> bool {
        self.lookup(&key.into()).is_some()
    }

    /// Value stored under `key`
    pub fn find(&self, key: impl Into<Any>) -> Option<Any> {
        self.lookup(&key.into()).cloned()
    }

    /// Value stored under `key` (KeyError when absent)
    pub fn at(&self, key: impl Into<Any>) -> Result<Any> {
        let key = key.into();
        self.lookup(&key)
            .cloned()
            .ok_or_else(|| Error::key_error(format!("key {:?} not found in map", key)))
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&Any, &Any)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Any> {
        self.entries.iter().map(|(key, _)| key)
    }

    fn node_mut(&mut self) -> &mut MapNode {
        if self.use_count() != 1 {
            let copy = MapNode::from_entries(self.entries.clone());
            *self = Self::from_ptr(make_object(copy));
        }
        let ptr = self.as_object_ref().as_ptr() as *mut MapNode;
        unsafe { &mut *ptr }
    }

    /// Insert or overwrite, copying the node first if it is shared
    pub fn set(&mut self, key: impl Into<Any>, value: impl Into<Any>) {
        self.node_mut().insert(key.into(), value.into());
    }

    /// Remove `key`; returns whether it was present
    pub fn erase(&mut self, key: impl Into<Any>) -> bool {
        let key = key.into();
        if self.lookup(&key).is_none() {
            return false;
        }
        self.node_mut().remove(&key)
    }
}

impl Default for Map {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Build a `Map` from `key => value` pairs
#[macro_export]
macro_rules! map {
    ($($key:expr => $value:expr),* $(,)?) => {
        $crate::containers::Map::from_pairs(::std::vec![
            $(($crate::any::Any::from($key), $crate::any::Any::from($value))),*
        ])
    };
}

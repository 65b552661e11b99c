//! Type registry - process-wide table of type keys, indices and ancestry
//!
//! Design: One `RwLock`-guarded table, written on first touch of a type and
//! read everywhere else. Each object type reserves a contiguous pool of
//! `child_slots` indices right after its own index so that most subtype tests
//! are a range check; types registered after the pool is exhausted fall back
//! to the global counter and are found through the ancestor array instead.
//!
//! `TypeInfo` records are immutable once published. Reflection metadata is
//! attached by swapping in an updated copy (`update_type_info`).

pub mod index;


use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::config;
use crate::logging;
use crate::reflection::{FieldInfo, MethodInfo};

pub use index as type_index;

static REGISTRY: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::new);

/// How a type participates in structural equality and hashing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StructuralKind {
    /// Comparing or hashing instances is an error
    #[default]
    Unsupported,
    /// Compared field by field, no identity
    TreeNode,
    /// Variable-like node: equal only to itself unless free variables are mapped
    FreeVar,
    /// Field-compared node whose pairing must be one to one across the graphs
    DagNode,
    /// Tree node that may short-circuit on pointer identity
    ConstTreeNode,
    /// Equal only to itself
    UniqueInstance,
}

/// Runtime type information for one registered type
#[derive(Clone)]
pub struct TypeInfo {
    pub type_index: i32,
    pub type_key: String,
    pub type_key_hash: u64,
    /// `-1` for roots (inline value kinds and `ffi.Object`)
    pub parent_type_index: i32,
    pub type_depth: i32,
    /// Ancestor indices, `type_ancestors[d]` is the ancestor at depth `d`
    pub type_ancestors: Vec<i32>,
    pub child_slots: u32,
    pub child_slots_can_overflow: bool,
    pub structural_kind: StructuralKind,
    pub fields: Vec<Arc<FieldInfo>>,
    pub methods: Vec<Arc<MethodInfo>>,
}

impl std::fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeInfo")
            .field("type_index", &self.type_index)
            .field("type_key", &self.type_key)
            .field("parent_type_index", &self.parent_type_index)
            .field("type_depth", &self.type_depth)
            .field("type_ancestors", &self.type_ancestors)
            .field("child_slots", &self.child_slots)
            .field("structural_kind", &self.structural_kind)
            .field("fields", &self.fields.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Registration request for one type
#[derive(Debug, Clone)]
pub struct TypeSpec<'a> {
    pub type_key: &'a str,
    /// Compiled-in index, or `-1` to allocate one
    pub static_index: i32,
    /// Expected depth; checked against the parent chain
    pub type_depth: i32,
    pub child_slots: u32,
    pub child_slots_can_overflow: bool,
    /// `-1` for roots
    pub parent_index: i32,
    pub structural_kind: StructuralKind,
}

struct TypeTable {
    entries: Vec<Option<Arc<TypeInfo>>>,
    by_key: HashMap<String, i32>,
    /// Slots of each type's child pool already handed out (the type itself counts as one)
    allocated_slots: HashMap<i32, u32>,
    next_dyn_index: i32,
}

/// Process-wide type table
pub struct TypeRegistry {
    table: RwLock<TypeTable>,
}

impl TypeRegistry {
    fn new() -> Self {
        let capacity = config::current().types.initial_capacity;
        let registry = Self {
            table: RwLock::new(TypeTable {
                entries: Vec::with_capacity(capacity),
                by_key: HashMap::with_capacity(capacity),
                allocated_slots: HashMap::new(),
                next_dyn_index: type_index::DYN_OBJECT_BEGIN,
            }),
        };

        for (index, key) in type_index::POD_KEYS {
            registry.get_or_alloc_index(&TypeSpec {
                type_key: key,
                static_index: index,
                type_depth: 0,
                child_slots: 0,
                child_slots_can_overflow: false,
                parent_index: -1,
                structural_kind: StructuralKind::Unsupported,
            });
        }

        registry.get_or_alloc_index(&TypeSpec {
            type_key: "ffi.Object",
            static_index: type_index::OBJECT,
            type_depth: 0,
            child_slots: 0,
            child_slots_can_overflow: true,
            parent_index: -1,
            structural_kind: StructuralKind::Unsupported,
        });

        registry
    }

    /// Return the index for `spec.type_key`, allocating one on first call
    ///
    /// Repeated calls with the same key return the first index and leave the
    /// recorded ancestry untouched.
    pub fn get_or_alloc_index(&self, spec: &TypeSpec<'_>) -> i32 {
        if let Some(&index) = self.table.read().by_key.get(spec.type_key) {
            return index;
        }

        let mut table = self.table.write();
        if let Some(&index) = table.by_key.get(spec.type_key) {
            return index;
        }

        let (ancestors, parent_slots) = if spec.parent_index >= 0 {
            let parent = table.info(spec.parent_index).unwrap_or_else(|| {
                crate::fatal!(
                    "parent index {} of `{}` is not registered",
                    spec.parent_index,
                    spec.type_key
                )
            });
            let mut ancestors = parent.type_ancestors.clone();
            ancestors.push(parent.type_index);
            (ancestors, Some((parent.child_slots, parent.child_slots_can_overflow)))
        } else {
            (Vec::new(), None)
        };

        crate::ensure_internal!(
            ancestors.len() as i32 == spec.type_depth,
            "type `{}` declares depth {} but its parent chain has depth {}",
            spec.type_key,
            spec.type_depth,
            ancestors.len()
        );

        let num_slots = spec.child_slots + 1;
        let allocated = if spec.static_index >= 0 {
            spec.static_index
        } else {
            let (parent_child_slots, parent_can_overflow) = parent_slots.unwrap_or((0, true));
            let parent_index = spec.parent_index;
            let used = table.allocated_slots.get(&parent_index).copied().unwrap_or(1);
            if parent_index >= 0 && used + num_slots <= parent_child_slots + 1 {
                table.allocated_slots.insert(parent_index, used + num_slots);
                parent_index + used as i32
            } else {
                crate::ensure_internal!(
                    parent_can_overflow,
                    "type `{}` overflows the {} child slots of its parent",
                    spec.type_key,
                    parent_child_slots
                );
                let index = table.next_dyn_index;
                table.next_dyn_index += num_slots as i32;
                index
            }
        };

        let info = TypeInfo {
            type_index: allocated,
            type_key: spec.type_key.to_string(),
            type_key_hash: key_hash(spec.type_key),
            parent_type_index: spec.parent_index,
            type_depth: spec.type_depth,
            type_ancestors: ancestors,
            child_slots: spec.child_slots,
            child_slots_can_overflow: spec.child_slots_can_overflow,
            structural_kind: spec.structural_kind,
            fields: Vec::new(),
            methods: Vec::new(),
        };

        let slot = allocated as usize;
        if table.entries.len() <= slot {
            table.entries.resize(slot + 1, None);
        }
        crate::ensure_internal!(
            table.entries[slot].is_none(),
            "type index {} requested by `{}` is already taken",
            allocated,
            spec.type_key
        );
        table.entries[slot] = Some(Arc::new(info));
        table.by_key.insert(spec.type_key.to_string(), allocated);
        drop(table);

        if config::current().types.log_registrations {
            logging::log_type_registered(spec.type_key, allocated, spec.parent_index);
        }
        allocated
    }

    /// Type info for an index, `None` if nothing was registered there
    pub fn info(&self, index: i32) -> Option<Arc<TypeInfo>> {
        self.table.read().info(index)
    }

    /// Type info for an index that must be registered
    pub fn expect_info(&self, index: i32) -> Arc<TypeInfo> {
        match self.info(index) {
            Some(info) => info,
            None => crate::fatal!("Cannot find type info for type index {}", index),
        }
    }

    pub fn lookup_key(&self, type_key: &str) -> Option<i32> {
        self.table.read().by_key.get(type_key).copied()
    }

    /// Type key of a registered index
    pub fn type_key(&self, index: i32) -> String {
        self.expect_info(index).type_key.clone()
    }

    /// O(1) ancestor test used once the range check fails
    pub fn has_ancestor_at(&self, candidate: i32, depth: i32, target: i32) -> bool {
        let info = self.expect_info(candidate);
        usize::try_from(depth)
            .ok()
            .and_then(|depth| info.type_ancestors.get(depth))
            .is_some_and(|&ancestor| ancestor == target)
    }

    /// Replace the published info of `index` with an edited copy
    pub fn update_type_info(&self, index: i32, edit: impl FnOnce(&mut TypeInfo)) {
        let mut table = self.table.write();
        let slot = match usize::try_from(index).ok().filter(|&s| s < table.entries.len()) {
            Some(slot) => slot,
            None => crate::fatal!("Cannot find type info for type index {}", index),
        };
        let Some(current) = table.entries[slot].as_ref() else {
            crate::fatal!("Cannot find type info for type index {}", index)
        };
        let mut updated = TypeInfo::clone(current);
        edit(&mut updated);
        table.entries[slot] = Some(Arc::new(updated));
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.table.read().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered keys, sorted
    pub fn type_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.table.read().by_key.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl TypeTable {
    fn info(&self, index: i32) -> Option<Arc<TypeInfo>> {
        let slot = usize::try_from(index).ok()?;
        self.entries.get(slot)?.clone()
    }
}

/// Stable 64-bit hash of a type key
pub fn key_hash(type_key: &str) -> u64 {
    let digest = blake3::hash(type_key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

/// The process-wide registry
pub fn global() -> &'static TypeRegistry {
    &REGISTRY
}

/// Force construction of the registry and its built-in entries
pub fn init() {
    Lazy::force(&REGISTRY);
}

/// Type key of an index, for error messages
pub fn type_index_to_key(index: i32) -> String {
    global().type_key(index)
}

pub fn type_key_to_index(type_key: &str) -> Option<i32> {
    global().lookup_key(type_key)
}

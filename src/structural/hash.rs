//! Structural hashing - the equality engine's dispatch, combined into a u64
//!
//! Frames are expanded once into a list of parts: leaf hashes computed in
//! place and child placeholders. Children are pushed in reverse so they
//! finish in declared order and leave their hashes on the result stack;
//! when the parent surfaces again it drains exactly its children's hashes
//! and combines them with its leaves.
//!
//! Arrays combine in order; map entries are summed so insertion order does
//! not matter. Free variables hash by identity unless free variables are
//! mapped, in which case they are numbered by first occurrence.

use std::collections::HashMap;

use crate::any::{Any, RawAny};
use crate::error::Result;
use crate::object::ObjectRef;
use crate::registry::{self, type_index, StructuralKind};

use super::{classify, unsupported, FieldCache, Node};

/// Structural hash options
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralHash {
    map_free_vars: bool,
}

impl StructuralHash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_free_vars(mut self, enabled: bool) -> Self {
        self.map_free_vars = enabled;
        self
    }

    pub fn hash(&self, value: &Any) -> Result<u64> {
        match value.as_object_ref() {
            Some(object) => Hasher::new(self.map_free_vars).run(object),
            None => Ok(leaf_hash(value.as_raw())),
        }
    }
}

/// Mix `value` into `key`
#[inline]
pub fn hash_combine(key: u64, value: u64) -> u64 {
    key ^ value
        .wrapping_add(0x9e37_79b9)
        .wrapping_add(key << 6)
        .wrapping_add(key >> 2)
}

fn bytes_hash(bytes: &[u8]) -> u64 {
    let digest = blake3::hash(bytes);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(head)
}

/// NaNs collapse to one value, `-0.0` to `0.0`
fn float_bits(value: f64) -> u64 {
    if value.is_nan() {
        f64::NAN.to_bits()
    } else if value == 0.0 {
        0
    } else {
        value.to_bits()
    }
}

fn leaf_hash(raw: &RawAny) -> u64 {
    let bits = if raw.type_index == type_index::FLOAT {
        float_bits(unsafe { raw.payload.v_float64 })
    } else {
        raw.bits()
    };
    hash_combine(raw.type_index as u64, bits)
}

enum Part {
    Leaf(u64),
    Child,
}

enum Finish {
    /// Order-dependent fold
    Sequence,
    /// Parts are key/value pairs folded order-independently
    Entries,
}

struct Frame {
    object: ObjectRef,
    map_free_vars: bool,
    expanded: bool,
    init: u64,
    parts: Vec<Part>,
    finish: Finish,
    /// Remember the result under this address
    memo: Option<usize>,
}

enum Expanded {
    Done(u64),
    Parts {
        parts: Vec<Part>,
        children: Vec<(ObjectRef, bool)>,
        finish: Finish,
        memo: Option<usize>,
    },
}

struct Hasher {
    map_free_vars: bool,
    free_var_ids: HashMap<usize, u64>,
    memo: HashMap<(usize, bool), u64>,
    stack: Vec<Frame>,
    results: Vec<u64>,
    fields: FieldCache,
}

fn address(object: &ObjectRef) -> usize {
    object.as_ptr() as usize
}

impl Hasher {
    fn new(map_free_vars: bool) -> Self {
        Self {
            map_free_vars,
            free_var_ids: HashMap::new(),
            memo: HashMap::new(),
            stack: Vec::new(),
            results: Vec::new(),
            fields: FieldCache::default(),
        }
    }

    fn push(&mut self, object: ObjectRef, map_free_vars: bool) {
        self.stack.push(Frame {
            object,
            map_free_vars,
            expanded: false,
            init: 0,
            parts: Vec::new(),
            finish: Finish::Sequence,
            memo: None,
        });
    }

    fn run(mut self, root: ObjectRef) -> Result<u64> {
        self.push(root, self.map_free_vars);

        while let Some(frame) = self.stack.last_mut() {
            if frame.expanded {
                let Some(frame) = self.stack.pop() else { break };
                let hash = self.finish(frame);
                self.results.push(hash);
                continue;
            }

            frame.expanded = true;
            let object = frame.object.clone();
            let map_free_vars = frame.map_free_vars;
            let init = registry::global()
                .expect_info(object.type_index())
                .type_key_hash;

            match self.expand(&object, init, map_free_vars)? {
                Expanded::Done(hash) => {
                    self.stack.pop();
                    self.results.push(hash);
                }
                Expanded::Parts {
                    parts,
                    children,
                    finish,
                    memo,
                } => {
                    if let Some(frame) = self.stack.last_mut() {
                        frame.init = init;
                        frame.parts = parts;
                        frame.finish = finish;
                        frame.memo = memo;
                    }
                    for (child, map_free_vars) in children.into_iter().rev() {
                        self.push(child, map_free_vars);
                    }
                }
            }
        }
        Ok(self.results.pop().unwrap_or_default())
    }

    fn finish(&mut self, frame: Frame) -> u64 {
        let num_children = frame
            .parts
            .iter()
            .filter(|part| matches!(part, Part::Child))
            .count();
        let mut children = self
            .results
            .split_off(self.results.len().saturating_sub(num_children))
            .into_iter();
        let values: Vec<u64> = frame
            .parts
            .iter()
            .map(|part| match part {
                Part::Leaf(hash) => *hash,
                Part::Child => children.next().unwrap_or_default(),
            })
            .collect();

        let hash = match frame.finish {
            Finish::Sequence => {
                let folded = values.iter().fold(frame.init, |acc, &v| hash_combine(acc, v));
                hash_combine(folded, values.len() as u64)
            }
            Finish::Entries => {
                let sum = values
                    .chunks(2)
                    .map(|pair| hash_combine(pair[0], pair.get(1).copied().unwrap_or_default()))
                    .fold(0u64, u64::wrapping_add);
                hash_combine(hash_combine(frame.init, sum), (values.len() / 2) as u64)
            }
        };
        if let Some(addr) = frame.memo {
            self.memo.insert((addr, frame.map_free_vars), hash);
        }
        hash
    }

    fn value_part(
        value: &Any,
        map_free_vars: bool,
        parts: &mut Vec<Part>,
        children: &mut Vec<(ObjectRef, bool)>,
    ) {
        match value.as_object_ref() {
            Some(object) => {
                parts.push(Part::Child);
                children.push((object, map_free_vars));
            }
            None => parts.push(Part::Leaf(leaf_hash(value.as_raw()))),
        }
    }

    fn expand(&mut self, object: &ObjectRef, init: u64, map_free_vars: bool) -> Result<Expanded> {
        let addr = address(object);
        let mut parts = Vec::new();
        let mut children = Vec::new();

        let finish = match classify(object) {
            Node::Str(text) => return Ok(Expanded::Done(hash_combine(init, bytes_hash(text.as_bytes())))),
            Node::Bytes(bytes) => return Ok(Expanded::Done(hash_combine(init, bytes_hash(bytes)))),
            Node::Shape(dims) => {
                let folded = dims.iter().fold(init, |acc, &d| hash_combine(acc, d as u64));
                return Ok(Expanded::Done(hash_combine(folded, dims.len() as u64)));
            }
            Node::Int(value) => return Ok(Expanded::Done(hash_combine(init, value as u64))),
            Node::Float(value) => return Ok(Expanded::Done(hash_combine(init, float_bits(value)))),
            Node::Bool(value) => return Ok(Expanded::Done(hash_combine(init, value as u64))),
            Node::Array(array) => {
                for value in array.iter() {
                    Self::value_part(value, map_free_vars, &mut parts, &mut children);
                }
                Finish::Sequence
            }
            Node::Map(map) => {
                for (key, value) in map.iter() {
                    Self::value_part(key, map_free_vars, &mut parts, &mut children);
                    Self::value_part(value, map_free_vars, &mut parts, &mut children);
                }
                Finish::Entries
            }
            Node::Reflected(kind) => match kind {
                StructuralKind::Unsupported => return Err(unsupported(object)),
                StructuralKind::UniqueInstance => {
                    return Ok(Expanded::Done(hash_combine(init, addr as u64)));
                }
                StructuralKind::FreeVar => {
                    if let Some(&id) = self.free_var_ids.get(&addr) {
                        return Ok(Expanded::Done(hash_combine(init, id)));
                    }
                    if !map_free_vars {
                        return Ok(Expanded::Done(hash_combine(init, addr as u64)));
                    }
                    let id = self.free_var_ids.len() as u64;
                    self.free_var_ids.insert(addr, id);
                    return Ok(Expanded::Done(hash_combine(init, id)));
                }
                StructuralKind::DagNode => {
                    if let Some(&hash) = self.memo.get(&(addr, map_free_vars)) {
                        return Ok(Expanded::Done(hash));
                    }
                    self.field_parts(object, map_free_vars, &mut parts, &mut children);
                    return Ok(Expanded::Parts {
                        parts,
                        children,
                        finish: Finish::Sequence,
                        memo: Some(addr),
                    });
                }
                StructuralKind::TreeNode | StructuralKind::ConstTreeNode => {
                    self.field_parts(object, map_free_vars, &mut parts, &mut children);
                    Finish::Sequence
                }
            },
        };
        Ok(Expanded::Parts {
            parts,
            children,
            finish,
            memo: None,
        })
    }

    fn field_parts(
        &mut self,
        object: &ObjectRef,
        map_free_vars: bool,
        parts: &mut Vec<Part>,
        children: &mut Vec<(ObjectRef, bool)>,
    ) {
        let fields = self.fields.get(object.type_index());
        for field in fields.iter().filter(|field| !field.sequal_ignore) {
            let value = unsafe { field.read(object.as_ptr()) };
            Self::value_part(
                &value,
                map_free_vars || field.sequal_def_region,
                parts,
                children,
            );
        }
    }
}

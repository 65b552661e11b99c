//! Hashing and equality of tagged values as map keys
//!
//! Strings and byte buffers compare by content; every other value compares
//! by tag plus payload bits, which for objects means identity.

use std::hash::{Hash, Hasher};

use crate::containers::{Bytes, Str};
use crate::registry::type_index;

use super::{Any, FromAny, RawAny};

fn content_hash(bytes: &[u8]) -> u64 {
    let digest = blake3::hash(bytes);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(head)
}

/// Hash of a tagged value consistent with [`any_equal`]
pub fn any_hash(raw: &RawAny) -> u64 {
    match raw.type_index {
        type_index::STR => match Str::try_cast_from_raw(raw) {
            Some(text) => content_hash(text.as_str().as_bytes()),
            None => 0,
        },
        type_index::BYTES => match Bytes::try_cast_from_raw(raw) {
            Some(bytes) => content_hash(bytes.as_bytes()),
            None => 0,
        },
        tag => {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            tag.hash(&mut hasher);
            raw.bits().hash(&mut hasher);
            hasher.finish()
        }
    }
}

/// Key equality: content for strings and bytes, tag plus bits otherwise
pub fn any_equal(lhs: &RawAny, rhs: &RawAny) -> bool {
    if lhs.type_index != rhs.type_index {
        return false;
    }
    if lhs.bits() == rhs.bits() {
        return true;
    }
    match lhs.type_index {
        type_index::STR => match (Str::try_cast_from_raw(lhs), Str::try_cast_from_raw(rhs)) {
            (Some(a), Some(b)) => a.as_str() == b.as_str(),
            _ => false,
        },
        type_index::BYTES => {
            match (Bytes::try_cast_from_raw(lhs), Bytes::try_cast_from_raw(rhs)) {
                (Some(a), Some(b)) => a.as_bytes() == b.as_bytes(),
                _ => false,
            }
        }
        _ => false,
    }
}

/// Hasher functor over owned values
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyHash;

impl AnyHash {
    pub fn hash(&self, value: &Any) -> u64 {
        any_hash(value.as_raw())
    }
}

/// Equality functor over owned values
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyEqual;

impl AnyEqual {
    pub fn equal(&self, lhs: &Any, rhs: &Any) -> bool {
        any_equal(lhs.as_raw(), rhs.as_raw())
    }
}

/// `Any` wrapper usable as a `HashMap` key
#[derive(Clone, Debug)]
pub(crate) struct AnyKey(pub Any);

impl PartialEq for AnyKey {
    fn eq(&self, other: &Self) -> bool {
        any_equal(self.0.as_raw(), other.0.as_raw())
    }
}

impl Eq for AnyKey {}

impl Hash for AnyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(any_hash(self.0.as_raw()));
    }
}

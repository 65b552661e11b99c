//! Object model - intrusive refcounted header shared by every compound value
//!
//! Design: Every object starts with an `Object` header laid out with
//! `#[repr(C)]`: atomic refcount, type index and a deleter captured when the
//! concrete type was constructed. The deleter knows the exact type, so no
//! vtable or virtual destructor is needed and foreign modules can release
//! objects they did not allocate.
//!
//! Refcounting discipline:
//! - increment: `fetch_add(Relaxed)`, the caller already holds a reference
//! - decrement: `fetch_sub(Release)`, then `fence(Acquire)` before destroying
//!   so writes made through other references are visible to the deleter

mod alloc;
mod ptr;
mod reference;

#[cfg(test)]
mod tests;

use std::cell::RefCell;
use std::sync::atomic::{fence, AtomicU64, Ordering};

use once_cell::sync::OnceCell;

use crate::logging;
use crate::registry::{self, type_index, StructuralKind, TypeSpec};

pub use alloc::{
    inplace_elements, make_inplace_object, make_object, make_object_in, DefaultAllocator,
    InplaceArray, ObjectAllocator,
};
pub(crate) use alloc::{inplace_at, inplace_slice};
pub use ptr::ObjectPtr;
pub use reference::{ref_accepts_tag, ObjectRef, ObjectRefType};

/// Type-erased destructor stored in every header
pub type ObjectDeleter = unsafe extern "C" fn(*mut Object);

/// Common header of every runtime object
#[repr(C)]
pub struct Object {
    ref_count: AtomicU64,
    type_index: i32,
    _reserved: u32,
    deleter: Option<ObjectDeleter>,
}

impl Object {
    /// A zeroed header. The allocator stamps the real type index, deleter and
    /// initial count after the concrete value has been moved into place.
    pub const fn new() -> Self {
        Self {
            ref_count: AtomicU64::new(0),
            type_index: type_index::OBJECT,
            _reserved: 0,
            deleter: None,
        }
    }

    #[inline]
    pub fn type_index(&self) -> i32 {
        self.type_index
    }

    pub fn type_key(&self) -> String {
        registry::type_index_to_key(self.type_index)
    }

    /// Current count (diagnostics only, never synchronize on it)
    #[inline]
    pub fn use_count(&self) -> u64 {
        self.ref_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_instance<T: ObjectType>(&self) -> bool {
        is_instance::<T>(self.type_index)
    }

    /// Increment reference count (hot path, always inlined)
    ///
    /// # Safety
    /// `ptr` must be null or point to a live object.
    #[inline(always)]
    pub unsafe fn inc_ref(ptr: *const Object) {
        if ptr.is_null() {
            return;
        }
        let old = (*ptr).ref_count.fetch_add(1, Ordering::Relaxed);
        debug_assert!(old < u64::MAX, "refcount overflow");
    }

    /// Decrement reference count, destroy when it reaches zero
    ///
    /// Children released by the deleter are freed iteratively.
    ///
    /// # Safety
    /// `ptr` must be null or point to a live object whose reference the caller owns.
    #[inline(always)]
    pub unsafe fn dec_ref(ptr: *const Object) {
        if ptr.is_null() {
            return;
        }
        let old = (*ptr).ref_count.fetch_sub(1, Ordering::Release);
        debug_assert!(old > 0, "refcount underflow");

        if old == 1 {
            // Synchronize with all previous decrements
            fence(Ordering::Acquire);
            destroy(ptr as *mut Object);
        }
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    /// Objects whose count hit zero inside another deleter on this thread.
    /// `Some` while the outermost release is draining.
    static RELEASE_QUEUE: RefCell<Option<Vec<*mut Object>>> = const { RefCell::new(None) };
}

/// Resets the release queue even if a deleter panics
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        let _ = RELEASE_QUEUE.try_with(|queue| queue.borrow_mut().take());
    }
}

/// Destroy object (cold path, separated for better code generation)
///
/// Releases triggered by a running deleter are queued and drained by the
/// outermost call, so freeing a deep tree runs in constant stack.
#[cold]
#[inline(never)]
unsafe fn destroy(ptr: *mut Object) {
    let queued = RELEASE_QUEUE
        .try_with(|queue| match queue.borrow_mut().as_mut() {
            Some(pending) => {
                pending.push(ptr);
                true
            }
            None => false,
        })
        .unwrap_or(false);
    if queued {
        return;
    }

    // Thread-local storage is gone during thread teardown; release in place
    let draining = RELEASE_QUEUE
        .try_with(|queue| *queue.borrow_mut() = Some(Vec::new()))
        .is_ok();
    if !draining {
        run_deleter(ptr);
        return;
    }

    let _guard = DrainGuard;
    run_deleter(ptr);
    while let Some(next) = next_queued() {
        run_deleter(next);
    }
}

fn next_queued() -> Option<*mut Object> {
    RELEASE_QUEUE
        .try_with(|queue| queue.borrow_mut().as_mut().and_then(Vec::pop))
        .ok()
        .flatten()
}

unsafe fn run_deleter(ptr: *mut Object) {
    let type_index = (*ptr).type_index;
    logging::log_object_destroyed(type_index, ptr as *const u8);
    if let Some(deleter) = (*ptr).deleter {
        deleter(ptr);
    }
}

/// Static description of a concrete object type
///
/// Implemented through [`object_type!`](crate::object_type), which also
/// checks that the `Object` header is the first field.
///
/// # Safety
/// Implementors must be `#[repr(C)]` with an `Object` (or another object
/// type) as their first field, so a pointer to `Self` is a valid pointer to
/// the header.
pub unsafe trait ObjectType: Send + Sync + Sized + 'static {
    const TYPE_KEY: &'static str;
    /// Compiled-in index, `-1` to allocate at first use
    const STATIC_TYPE_INDEX: i32 = -1;
    /// No subclasses; subtype checks collapse to an equality test
    const TYPE_FINAL: bool = false;
    /// Indices reserved for descendants right after this type's own index
    const CHILD_SLOTS: u32 = 0;
    const CHILD_SLOTS_CAN_OVERFLOW: bool = true;
    const STRUCTURAL_KIND: StructuralKind = StructuralKind::Unsupported;

    type Parent: ObjectType;

    /// Runtime type index, registering the type on first call
    fn type_index() -> i32;

    fn type_depth() -> i32 {
        <Self::Parent as ObjectType>::type_depth() + 1
    }

    /// The embedded header
    #[inline]
    fn header(&self) -> &Object {
        unsafe { &*(self as *const Self as *const Object) }
    }
}

unsafe impl ObjectType for Object {
    const TYPE_KEY: &'static str = "ffi.Object";
    const STATIC_TYPE_INDEX: i32 = type_index::OBJECT;

    type Parent = Object;

    fn type_index() -> i32 {
        registry::init();
        type_index::OBJECT
    }

    fn type_depth() -> i32 {
        0
    }
}

/// Once-per-type cache of the registered index
pub struct TypeIndexCell(OnceCell<i32>);

impl TypeIndexCell {
    pub const fn new() -> Self {
        Self(OnceCell::new())
    }

    #[inline]
    pub fn get_or_register<T: ObjectType>(&self) -> i32 {
        *self.0.get_or_init(register_type::<T>)
    }
}

impl Default for TypeIndexCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Register `T` (and transitively its parents) in the type table
pub fn register_type<T: ObjectType>() -> i32 {
    let parent_index = <T::Parent as ObjectType>::type_index();
    registry::global().get_or_alloc_index(&TypeSpec {
        type_key: T::TYPE_KEY,
        static_index: T::STATIC_TYPE_INDEX,
        type_depth: T::type_depth(),
        child_slots: T::CHILD_SLOTS,
        child_slots_can_overflow: T::CHILD_SLOTS_CAN_OVERFLOW,
        parent_index,
        structural_kind: T::STRUCTURAL_KIND,
    })
}

/// Whether an object tagged `candidate` is a `T` (or a subtype of it)
#[inline]
pub fn is_instance<T: ObjectType>(candidate: i32) -> bool {
    if T::STATIC_TYPE_INDEX == type_index::OBJECT {
        return type_index::is_object(candidate);
    }
    let target = T::type_index();
    if T::TYPE_FINAL {
        return candidate == target;
    }
    if candidate >= target && candidate <= target + T::CHILD_SLOTS as i32 {
        return true;
    }
    if !T::CHILD_SLOTS_CAN_OVERFLOW {
        return false;
    }
    // Ancestors are always registered before their descendants
    if candidate < target {
        return false;
    }
    registry::global().has_ancestor_at(candidate, T::type_depth(), target)
}

/// Declare a node struct as an object type
///
/// ```ignore
/// #[repr(C)]
/// pub struct VarNode { base: Object, name: String }
///
/// object_type! {
///     VarNode: "test.Var" extends Object {
///         const STRUCTURAL_KIND: StructuralKind = StructuralKind::FreeVar;
///     }
/// }
/// ```
///
/// The first field must be named `base` and hold the parent node.
#[macro_export]
macro_rules! object_type {
    ($node:ident : $key:literal extends $parent:ty { $($body:tt)* }) => {
        unsafe impl $crate::object::ObjectType for $node {
            const TYPE_KEY: &'static str = $key;
            $($body)*

            type Parent = $parent;

            fn type_index() -> i32 {
                static INDEX: $crate::object::TypeIndexCell = $crate::object::TypeIndexCell::new();
                INDEX.get_or_register::<Self>()
            }
        }

        const _: () = assert!(
            ::core::mem::offset_of!($node, base) == 0,
            "the parent node must be the first field"
        );
    };
    ($node:ident : $key:literal extends $parent:ty) => {
        $crate::object_type!($node: $key extends $parent {});
    };
}

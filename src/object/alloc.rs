//! Object allocation - pluggable storage plus type-capturing deleters
//!
//! The concrete value is moved into a correctly sized block first; only then
//! are the header's type index, deleter and initial count stamped. Code that
//! builds a node therefore never observes its own dynamic type index.

use core::ptr;
use std::alloc::{handle_alloc_error, Layout};
use std::sync::atomic::Ordering;

use crate::error::{Error, Result};
use crate::logging;

use super::{Object, ObjectDeleter, ObjectPtr, ObjectType};

/// Storage provider for objects
///
/// # Safety
/// `allocate` must return null or a block valid for `layout`, and
/// `deallocate` must accept any block returned by `allocate` with the same layout.
pub unsafe trait ObjectAllocator: 'static {
    fn allocate(layout: Layout) -> *mut u8;

    /// # Safety
    /// `block` was returned by `allocate(layout)` and is not used afterwards.
    unsafe fn deallocate(block: *mut u8, layout: Layout);
}

/// Global heap
pub struct DefaultAllocator;

unsafe impl ObjectAllocator for DefaultAllocator {
    #[inline]
    fn allocate(layout: Layout) -> *mut u8 {
        unsafe { std::alloc::alloc(layout) }
    }

    #[inline]
    unsafe fn deallocate(block: *mut u8, layout: Layout) {
        std::alloc::dealloc(block, layout)
    }
}

/// Allocate `value` on the default heap and return the first reference
pub fn make_object<T: ObjectType>(value: T) -> ObjectPtr<T> {
    make_object_in::<T, DefaultAllocator>(value)
}

/// Allocate `value` through `A`
pub fn make_object_in<T: ObjectType, A: ObjectAllocator>(value: T) -> ObjectPtr<T> {
    let layout = Layout::new::<T>();
    let raw = A::allocate(layout) as *mut T;
    if raw.is_null() {
        handle_alloc_error(layout);
    }

    unsafe {
        raw.write(value);
        stamp_header::<T>(raw as *mut Object, delete_object::<T, A>);
        logging::log_object_allocated(T::TYPE_KEY, layout.size());
        ObjectPtr::from_raw(raw)
    }
}

unsafe fn stamp_header<T: ObjectType>(header: *mut Object, deleter: ObjectDeleter) {
    (*header).type_index = T::type_index();
    (*header).deleter = Some(deleter);
    (*header).ref_count.store(1, Ordering::Relaxed);
}

unsafe extern "C" fn delete_object<T: ObjectType, A: ObjectAllocator>(header: *mut Object) {
    let typed = header as *mut T;
    ptr::drop_in_place(typed);
    A::deallocate(typed as *mut u8, Layout::new::<T>());
}

/// Object followed, in the same block, by `capacity` slots of `Element`
///
/// The first `inplace_len()` slots are initialized; the rest are not.
///
/// # Safety
/// `inplace_len() <= inplace_capacity()` must hold at all times, and
/// `inplace_capacity()` must never change after construction.
pub unsafe trait InplaceArray: ObjectType {
    type Element;

    fn inplace_len(&self) -> usize;

    fn inplace_capacity(&self) -> usize;

    /// # Safety
    /// Slots `[0, len)` must be initialized and `len <= inplace_capacity()`.
    unsafe fn set_inplace_len(&mut self, len: usize);
}

/// Layout of a header plus `capacity` elements, rounded to the block alignment
fn inplace_layout<T: InplaceArray>(capacity: usize) -> (Layout, usize) {
    let elements = match Layout::array::<T::Element>(capacity) {
        Ok(layout) => layout,
        Err(_) => crate::fatal!("inplace capacity {} overflows `{}`", capacity, T::TYPE_KEY),
    };
    match Layout::new::<T>().extend(elements) {
        Ok((layout, offset)) => (layout.pad_to_align(), offset),
        Err(_) => crate::fatal!("inplace capacity {} overflows `{}`", capacity, T::TYPE_KEY),
    }
}

/// Start of the element run behind `obj`
///
/// # Safety
/// `obj` must carry the provenance of the whole block (derive it from the
/// owning handle, not from a `&T`).
pub unsafe fn inplace_elements<T: InplaceArray>(obj: *const T) -> *mut T::Element {
    let (_, offset) = inplace_layout::<T>(0);
    (obj as *mut u8).add(offset) as *mut T::Element
}

/// Initialized elements behind `obj`
///
/// # Safety
/// As for [`inplace_elements`]; the returned slice must not outlive the object.
pub(crate) unsafe fn inplace_slice<'a, T: InplaceArray>(obj: *const T) -> &'a [T::Element] {
    if obj.is_null() {
        return &[];
    }
    core::slice::from_raw_parts(inplace_elements(obj), (*obj).inplace_len())
}

/// Bounds-checked element access
///
/// # Safety
/// As for [`inplace_slice`].
pub(crate) unsafe fn inplace_at<'a, T: InplaceArray>(
    obj: *const T,
    index: i64,
) -> Result<&'a T::Element> {
    let elements = inplace_slice(obj);
    usize::try_from(index)
        .ok()
        .and_then(|i| elements.get(i))
        .ok_or_else(|| Error::out_of_bounds(index, elements.len()))
}

/// Allocate `header` with its element run and fill the first
/// `header.inplace_len()` slots from `elements`
pub fn make_inplace_object<T, I>(header: T, elements: I) -> ObjectPtr<T>
where
    T: InplaceArray,
    I: IntoIterator<Item = T::Element>,
{
    let capacity = header.inplace_capacity();
    let len = header.inplace_len();
    crate::ensure_internal!(
        len <= capacity,
        "`{}` length {} exceeds capacity {}",
        T::TYPE_KEY,
        len,
        capacity
    );

    let (layout, _) = inplace_layout::<T>(capacity);
    let raw = DefaultAllocator::allocate(layout) as *mut T;
    if raw.is_null() {
        handle_alloc_error(layout);
    }

    unsafe {
        raw.write(header);
        let base = inplace_elements(raw);
        let mut written = 0;
        for element in elements.into_iter().take(len) {
            base.add(written).write(element);
            written += 1;
        }
        if written < len {
            // Keep the header consistent so the deleter only drops what exists
            (*raw).set_inplace_len(written);
        }
        stamp_header::<T>(raw as *mut Object, delete_inplace::<T>);
        logging::log_object_allocated(T::TYPE_KEY, layout.size());
        ObjectPtr::from_raw(raw)
    }
}

unsafe extern "C" fn delete_inplace<T: InplaceArray>(header: *mut Object) {
    let typed = header as *mut T;
    let len = (*typed).inplace_len();
    let capacity = (*typed).inplace_capacity();
    let base = inplace_elements(typed);
    ptr::drop_in_place(ptr::slice_from_raw_parts_mut(base, len));
    ptr::drop_in_place(typed);
    DefaultAllocator::deallocate(typed as *mut u8, inplace_layout::<T>(capacity).0);
}

//! Owning object pointer
//!
//! Optimized for minimal overhead: clone is one relaxed increment, drop is
//! one release decrement. The header is never exposed mutably.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::ops::Deref;
use core::ptr::NonNull;

use super::{is_instance, Object, ObjectType};

/// Nullable owning handle to an object of static type `T`
pub struct ObjectPtr<T: ObjectType> {
    ptr: Option<NonNull<T>>,
}

impl<T: ObjectType> ObjectPtr<T> {
    pub const fn null() -> Self {
        Self { ptr: None }
    }

    /// Take over a reference the caller already owns
    ///
    /// # Safety
    /// `ptr` must be null or point to a live `T` whose reference is transferred.
    #[inline]
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        Self {
            ptr: NonNull::new(ptr),
        }
    }

    /// Create a new owning handle to a borrowed object (increments the count)
    ///
    /// # Safety
    /// `ptr` must be null or point to a live `T`.
    #[inline]
    pub unsafe fn from_borrowed(ptr: *const T) -> Self {
        Object::inc_ref(ptr as *const Object);
        Self::from_raw(ptr as *mut T)
    }

    /// Convert to raw pointer, consuming self without decrementing refcount
    #[inline]
    pub fn into_raw(self) -> *mut T {
        let ptr = self.as_ptr();
        core::mem::forget(self);
        ptr
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.map_or(core::ptr::null_mut(), NonNull::as_ptr)
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.ptr.is_none()
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.ptr.map(|p| unsafe { &*p.as_ptr() })
    }

    /// Mutable access, only while this is the sole owner
    pub fn get_mut(&mut self) -> Option<&mut T> {
        if self.use_count() != 1 {
            return None;
        }
        self.ptr.map(|p| unsafe { &mut *p.as_ptr() })
    }

    /// Get current reference count (0 for null)
    #[inline]
    pub fn use_count(&self) -> u64 {
        self.header().map_or(0, Object::use_count)
    }

    #[inline]
    pub fn unique(&self) -> bool {
        self.use_count() == 1
    }

    #[inline]
    pub fn header(&self) -> Option<&Object> {
        self.ptr.map(|p| unsafe { &*(p.as_ptr() as *const Object) })
    }

    /// Dynamic type index, or `None`'s index for null
    pub fn type_index(&self) -> i32 {
        self.header()
            .map_or(crate::registry::type_index::NONE, Object::type_index)
    }

    /// Pointer identity
    #[inline]
    pub fn same_as<U: ObjectType>(&self, other: &ObjectPtr<U>) -> bool {
        self.as_ptr() as *const u8 == other.as_ptr() as *const u8
    }

    /// Drop this reference, leaving null
    pub fn reset(&mut self) {
        *self = Self::null();
    }

    /// View as a pointer to the base header type
    pub fn upcast(self) -> ObjectPtr<Object> {
        unsafe { ObjectPtr::from_raw(self.into_raw() as *mut Object) }
    }

    /// Reinterpret without checking the dynamic type
    ///
    /// # Safety
    /// The object must be a `U` (or null).
    pub unsafe fn cast_unchecked<U: ObjectType>(self) -> ObjectPtr<U> {
        ObjectPtr::from_raw(self.into_raw() as *mut U)
    }

    /// Checked narrowing; gives the pointer back on mismatch
    pub fn downcast<U: ObjectType>(self) -> Result<ObjectPtr<U>, Self> {
        let matches = self
            .header()
            .is_some_and(|header| is_instance::<U>(header.type_index()));
        if matches {
            Ok(unsafe { self.cast_unchecked() })
        } else {
            Err(self)
        }
    }
}

impl<T: ObjectType> Clone for ObjectPtr<T> {
    #[inline]
    fn clone(&self) -> Self {
        unsafe { Object::inc_ref(self.as_ptr() as *const Object) };
        Self { ptr: self.ptr }
    }
}

impl<T: ObjectType> Drop for ObjectPtr<T> {
    #[inline]
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            unsafe { Object::dec_ref(ptr.as_ptr() as *const Object) };
        }
    }
}

impl<T: ObjectType> Default for ObjectPtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: ObjectType> Deref for ObjectPtr<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => crate::fatal!("dereferencing a null ObjectPtr<{}>", T::TYPE_KEY),
        }
    }
}

impl<T: ObjectType> PartialEq for ObjectPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl<T: ObjectType> Eq for ObjectPtr<T> {}

impl<T: ObjectType> Hash for ObjectPtr<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.as_ptr() as usize).hash(state);
    }
}

impl<T: ObjectType> fmt::Debug for ObjectPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.header() {
            Some(header) => write!(
                f,
                "ObjectPtr<{}>({:p}, type_index={}, use_count={})",
                T::TYPE_KEY,
                self.as_ptr(),
                header.type_index(),
                header.use_count()
            ),
            None => write!(f, "ObjectPtr<{}>(null)", T::TYPE_KEY),
        }
    }
}

// Handles are shareable: the count is atomic and objects are immutable once
// published unless their type opts into guarded mutation.
unsafe impl<T: ObjectType> Send for ObjectPtr<T> {}
unsafe impl<T: ObjectType> Sync for ObjectPtr<T> {}

//! Reference types - typed, nullable-by-policy wrappers over `ObjectPtr<Object>`
//!
//! Every concrete reference type (`Str`, `Array`, user IR nodes, ...) is a
//! `#[repr(transparent)]` wrapper around `ObjectRef` generated by
//! [`object_ref!`](crate::object_ref). The per-type policy flags `NULLABLE`
//! and `MUTABLE` live on the `ObjectRefType` impl.

use core::fmt;

use crate::registry::type_index;

use super::{is_instance, Object, ObjectPtr, ObjectType};

/// Untyped reference to any object
#[derive(Clone, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ObjectRef {
    data: ObjectPtr<Object>,
}

impl ObjectRef {
    pub const fn null() -> Self {
        Self {
            data: ObjectPtr::null(),
        }
    }

    pub fn from_ptr<T: ObjectType>(ptr: ObjectPtr<T>) -> Self {
        Self { data: ptr.upcast() }
    }

    /// Take over an owned reference
    ///
    /// # Safety
    /// `ptr` must be null or point to a live object whose reference is transferred.
    pub unsafe fn from_raw(ptr: *mut Object) -> Self {
        Self {
            data: ObjectPtr::from_raw(ptr),
        }
    }

    /// New reference to a borrowed object (increments the count)
    ///
    /// # Safety
    /// `ptr` must be null or point to a live object.
    pub unsafe fn from_borrowed(ptr: *const Object) -> Self {
        Self {
            data: ObjectPtr::from_borrowed(ptr),
        }
    }

    #[inline]
    pub fn defined(&self) -> bool {
        !self.data.is_null()
    }

    /// Pointer identity
    #[inline]
    pub fn same_as(&self, other: &ObjectRef) -> bool {
        self.data.same_as(&other.data)
    }

    #[inline]
    pub fn get(&self) -> Option<&Object> {
        self.data.get()
    }

    /// Header pointer with the provenance of the whole object block
    #[inline]
    pub fn as_ptr(&self) -> *const Object {
        self.data.as_ptr()
    }

    pub fn into_raw(self) -> *mut Object {
        self.data.into_raw()
    }

    pub fn into_ptr(self) -> ObjectPtr<Object> {
        self.data
    }

    pub fn ptr(&self) -> &ObjectPtr<Object> {
        &self.data
    }

    pub fn use_count(&self) -> u64 {
        self.data.use_count()
    }

    /// Dynamic type index (`None`'s index when undefined)
    pub fn type_index(&self) -> i32 {
        self.data.type_index()
    }

    pub fn type_key(&self) -> String {
        match self.get() {
            Some(object) => object.type_key(),
            None => "None".to_string(),
        }
    }

    /// Typed view if the object is a `T`
    pub fn as_<T: ObjectType>(&self) -> Option<&T> {
        let object = self.get()?;
        if is_instance::<T>(object.type_index()) {
            Some(unsafe { &*(self.as_ptr() as *const T) })
        } else {
            None
        }
    }

    /// Mutable typed access while this is the sole owner
    ///
    /// # Safety
    /// The object must be a `T` (or undefined).
    #[doc(hidden)]
    pub unsafe fn unique_as_mut_unchecked<T: ObjectType>(&mut self) -> Option<&mut T> {
        if self.use_count() != 1 {
            return None;
        }
        Some(&mut *(self.as_ptr() as *mut T))
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(_) => write!(f, "{}({:p})", self.type_key(), self.as_ptr()),
            None => f.write_str("None"),
        }
    }
}

/// Behavior shared by every reference type
pub trait ObjectRefType: Clone + Send + Sync + 'static {
    /// Node type this reference points at
    type ContainerType: ObjectType;

    /// Whether an undefined reference is a valid value of this type
    const NULLABLE: bool = true;

    /// Whether `get_mut` hands out mutable access to a uniquely owned node
    const MUTABLE: bool = false;

    /// Wrap without checking type or nullability
    ///
    /// # Safety
    /// `data` must be undefined or point to a `ContainerType` (or subtype).
    unsafe fn from_object_ref_unchecked(data: ObjectRef) -> Self;

    fn as_object_ref(&self) -> &ObjectRef;

    fn into_object_ref(self) -> ObjectRef;

    /// Best-effort coercion from a value that is not already this type
    fn coerce_from_raw(_raw: &crate::any::RawAny) -> Option<Self> {
        None
    }

    fn defined(&self) -> bool {
        self.as_object_ref().defined()
    }

    fn same_as<R: ObjectRefType>(&self, other: &R) -> bool {
        self.as_object_ref().same_as(other.as_object_ref())
    }

    fn type_key(&self) -> String {
        self.as_object_ref().type_key()
    }

    fn type_index(&self) -> i32 {
        self.as_object_ref().type_index()
    }

    fn use_count(&self) -> u64 {
        self.as_object_ref().use_count()
    }

    /// Typed view of the node, `None` when it is not a `T`
    fn as_<T: ObjectType>(&self) -> Option<&T> {
        self.as_object_ref().as_::<T>()
    }

    /// An undefined reference, only for nullable types
    fn try_null() -> Option<Self> {
        if Self::NULLABLE {
            Some(unsafe { Self::from_object_ref_unchecked(ObjectRef::null()) })
        } else {
            None
        }
    }
}

impl ObjectRefType for ObjectRef {
    type ContainerType = Object;

    unsafe fn from_object_ref_unchecked(data: ObjectRef) -> Self {
        data
    }

    fn as_object_ref(&self) -> &ObjectRef {
        self
    }

    fn into_object_ref(self) -> ObjectRef {
        self
    }
}

/// Whether a raw tag is acceptable for reference type `R` without coercion
#[doc(hidden)]
#[inline]
pub fn ref_accepts_tag<R: ObjectRefType>(tag: i32) -> bool {
    if tag == type_index::NONE {
        return R::NULLABLE;
    }
    type_index::is_object(tag) && is_instance::<R::ContainerType>(tag)
}

/// Declare a reference type over a node type
///
/// ```ignore
/// object_ref! {
///     /// Reference to a variable
///     pub struct Var(VarNode) {
///         const NULLABLE: bool = false;
///     }
/// }
/// ```
///
/// Generates `Deref` to the node, `get`/`get_mut`, conversions to and from
/// `ObjectRef`, and the `Any` conversion traits.
#[macro_export]
macro_rules! object_ref {
    ($(#[$meta:meta])* $vis:vis struct $name:ident($node:ty) { $($body:tt)* }) => {
        $(#[$meta])*
        #[derive(Clone)]
        #[repr(transparent)]
        $vis struct $name($crate::object::ObjectRef);

        impl $crate::object::ObjectRefType for $name {
            type ContainerType = $node;
            $($body)*

            unsafe fn from_object_ref_unchecked(data: $crate::object::ObjectRef) -> Self {
                Self(data)
            }

            fn as_object_ref(&self) -> &$crate::object::ObjectRef {
                &self.0
            }

            fn into_object_ref(self) -> $crate::object::ObjectRef {
                self.0
            }
        }

        impl $name {
            /// Wrap a freshly allocated node
            pub fn from_ptr(ptr: $crate::object::ObjectPtr<$node>) -> Self {
                Self($crate::object::ObjectRef::from_ptr(ptr))
            }

            pub fn get(&self) -> ::core::option::Option<&$node> {
                let ptr = self.0.as_ptr();
                if ptr.is_null() {
                    None
                } else {
                    Some(unsafe { &*(ptr as *const $node) })
                }
            }

            /// Mutable node access for mutable types while uniquely owned
            pub fn get_mut(&mut self) -> ::core::option::Option<&mut $node> {
                if !<Self as $crate::object::ObjectRefType>::MUTABLE {
                    return None;
                }
                unsafe { self.0.unique_as_mut_unchecked::<$node>() }
            }
        }

        impl ::core::ops::Deref for $name {
            type Target = $node;

            fn deref(&self) -> &$node {
                match self.get() {
                    Some(node) => node,
                    None => $crate::fatal!("dereferencing an undefined `{}`", stringify!($name)),
                }
            }
        }

        impl ::core::convert::From<$name> for $crate::object::ObjectRef {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl ::core::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Debug::fmt(&self.0, f)
            }
        }

        $crate::__impl_any_for_ref!($name);
    };
    ($(#[$meta:meta])* $vis:vis struct $name:ident($node:ty);) => {
        $crate::object_ref!($(#[$meta])* $vis struct $name($node) {});
    };
}

//! `ObjectDef<T>` - builder attaching fields and methods to a type

use core::marker::PhantomData;
use std::sync::Arc;

use crate::any::{Any, AnyView, FromAny, IntoAny};
use crate::error::Result;
use crate::function::Function;
use crate::logging;
use crate::object::ObjectType;
use crate::registry;

use super::{FieldGetter, FieldInfo, FieldSetter, MethodInfo};

/// Typed handle on a field of `T`: its byte offset and value type `F`
///
/// Build it with [`field_of!`](crate::field_of), which pairs
/// `offset_of!` with a projection so the offset and type always agree.
pub struct FieldRef<T, F> {
    offset: usize,
    _marker: PhantomData<fn(&T) -> &F>,
}

impl<T: ObjectType, F> FieldRef<T, F> {
    /// # Safety
    /// `offset` must be the byte offset of a field of type `F` inside `T`.
    #[doc(hidden)]
    pub unsafe fn new(offset: usize, _project: fn(&T) -> &F) -> Self {
        Self {
            offset,
            _marker: PhantomData,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Field reference for `node.field`
///
/// ```ignore
/// ObjectDef::<VarNode>::new().def_ro("name", field_of!(VarNode, name), []);
/// ```
#[macro_export]
macro_rules! field_of {
    ($node:ty, $field:ident) => {
        unsafe {
            $crate::reflection::FieldRef::<$node, _>::new(
                ::core::mem::offset_of!($node, $field),
                |node: &$node| &node.$field,
            )
        }
    };
}

/// Per-field options
pub enum FieldOpt {
    Doc(String),
    Default(Any),
    /// Skip in structural equality and hashing
    SEqualIgnore,
    /// Free variables inside this field may be mapped
    SEqualDefRegion,
}

unsafe fn read_field<F: Clone + IntoAny>(field: *const u8) -> Any {
    Any::new((*(field as *const F)).clone())
}

unsafe fn write_field<F: FromAny>(field: *mut u8, value: AnyView<'_>) -> Result<()> {
    let value = value.cast::<F>()?;
    *(field as *mut F) = value;
    Ok(())
}

/// Reflection builder for `T`
///
/// ```ignore
/// ObjectDef::<LetNode>::new()
///     .def_ro("var", field_of!(LetNode, var), [FieldOpt::SEqualDefRegion])
///     .def_ro("value", field_of!(LetNode, value), [])
///     .def_method("arity", Function::from_typed("Let.arity", |_: Let| 2i64), false)
///     .register();
/// ```
pub struct ObjectDef<T: ObjectType> {
    fields: Vec<FieldInfo>,
    methods: Vec<MethodInfo>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ObjectType> ObjectDef<T> {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            methods: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Readonly field
    pub fn def_ro<F>(self, name: &str, field: FieldRef<T, F>, opts: impl IntoIterator<Item = FieldOpt>) -> Self
    where
        F: Clone + IntoAny + FromAny + 'static,
    {
        self.push_field(name, field.offset, F::static_type_index(), read_field::<F>, None, opts)
    }

    /// Read-write field, writable through `set_attr` while uniquely owned
    pub fn def_rw<F>(self, name: &str, field: FieldRef<T, F>, opts: impl IntoIterator<Item = FieldOpt>) -> Self
    where
        F: Clone + IntoAny + FromAny + 'static,
    {
        self.push_field(
            name,
            field.offset,
            F::static_type_index(),
            read_field::<F>,
            Some(write_field::<F>),
            opts,
        )
    }

    fn push_field(
        mut self,
        name: &str,
        offset: usize,
        field_static_type_index: i32,
        getter: FieldGetter,
        setter: Option<FieldSetter>,
        opts: impl IntoIterator<Item = FieldOpt>,
    ) -> Self {
        let mut info = FieldInfo {
            name: name.to_string(),
            doc: None,
            offset,
            field_static_type_index,
            readonly: setter.is_none(),
            sequal_ignore: false,
            sequal_def_region: false,
            default_value: None,
            getter,
            setter,
        };
        for opt in opts {
            match opt {
                FieldOpt::Doc(doc) => info.doc = Some(doc),
                FieldOpt::Default(value) => info.default_value = Some(value),
                FieldOpt::SEqualIgnore => info.sequal_ignore = true,
                FieldOpt::SEqualDefRegion => info.sequal_def_region = true,
            }
        }
        self.fields.push(info);
        self
    }

    pub fn def_method(mut self, name: &str, method: Function, is_static: bool) -> Self {
        self.methods.push(MethodInfo {
            name: name.to_string(),
            doc: None,
            is_static,
            method,
        });
        self
    }

    /// Attach the collected entries to `T`'s type info
    ///
    /// Entries whose name is already registered on `T` are skipped, so
    /// registering twice is harmless.
    pub fn register(self) -> i32 {
        let index = T::type_index();
        let Self { fields, methods, .. } = self;
        let (num_fields, num_methods) = (fields.len(), methods.len());
        registry::global().update_type_info(index, move |info| {
            for field in fields {
                if !info.fields.iter().any(|f| f.name == field.name) {
                    info.fields.push(Arc::new(field));
                }
            }
            for method in methods {
                if !info.methods.iter().any(|m| m.name == method.name) {
                    info.methods.push(Arc::new(method));
                }
            }
        });
        logging::log_reflection_registered(T::TYPE_KEY, num_fields, num_methods);
        index
    }
}

impl<T: ObjectType> Default for ObjectDef<T> {
    fn default() -> Self {
        Self::new()
    }
}

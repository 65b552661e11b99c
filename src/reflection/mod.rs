//! Reflection - per-type field and method tables
//!
//! Design: Each registered object type carries a list of `FieldInfo`
//! records (name, byte offset from the header, static type index, flags)
//! and `MethodInfo` records (name, `Function`). Field access is pointer
//! arithmetic from the header plus a getter/setter monomorphized for the
//! field's Rust type, reading and writing through `Any`.
//!
//! Tables are attached to `TypeInfo` through `ObjectDef<T>`. Lookups walk the
//! ancestor chain, so fields declared on a parent are visible on children.

mod def;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::{Arc, Once};

use crate::any::{Any, AnyView};
use crate::containers::{BoxBoolNode, BoxFloatNode, BoxIntNode};
use crate::error::{Error, Result};
use crate::function::Function;
use crate::object::{Object, ObjectRef};
use crate::registry::{self, TypeInfo};

pub use def::{FieldOpt, FieldRef, ObjectDef};

/// Reads the field at an address into an owning value
pub type FieldGetter = unsafe fn(field: *const u8) -> Any;

/// Writes a value into the field at an address
pub type FieldSetter = unsafe fn(field: *mut u8, value: AnyView<'_>) -> Result<()>;

/// One reflected field
pub struct FieldInfo {
    pub name: String,
    pub doc: Option<String>,
    /// Byte offset from the object header
    pub offset: usize,
    pub field_static_type_index: i32,
    pub readonly: bool,
    /// Skipped by structural equality and hashing
    pub sequal_ignore: bool,
    /// Subtree defines variables; free variables inside may be mapped
    pub sequal_def_region: bool,
    pub default_value: Option<Any>,
    pub getter: FieldGetter,
    pub setter: Option<FieldSetter>,
}

impl FieldInfo {
    /// Read this field out of `object`
    ///
    /// # Safety
    /// `object` must point to a live instance of the type declaring the field
    /// (or a subtype).
    pub unsafe fn read(&self, object: *const Object) -> Any {
        (self.getter)((object as *const u8).add(self.offset))
    }

    /// # Safety
    /// Same as [`FieldInfo::read`], and no other reference may observe the
    /// object during the write.
    unsafe fn write(&self, object: *mut Object, value: AnyView<'_>) -> Result<()> {
        match self.setter {
            Some(setter) => setter((object as *mut u8).add(self.offset), value),
            None => Err(Error::attribute_error(format!(
                "Field `{}` is readonly",
                self.name
            ))),
        }
    }
}

impl fmt::Debug for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldInfo")
            .field("name", &self.name)
            .field("offset", &self.offset)
            .field("field_static_type_index", &self.field_static_type_index)
            .field("readonly", &self.readonly)
            .field("sequal_ignore", &self.sequal_ignore)
            .field("sequal_def_region", &self.sequal_def_region)
            .finish()
    }
}

/// One reflected method
#[derive(Debug)]
pub struct MethodInfo {
    pub name: String,
    pub doc: Option<String>,
    /// Static methods do not receive the object as first argument
    pub is_static: bool,
    pub method: Function,
}

fn info_for_key(type_key: &str) -> Result<Arc<TypeInfo>> {
    let index = registry::type_key_to_index(type_key)
        .ok_or_else(|| Error::value_error(format!("Type `{}` is not registered", type_key)))?;
    Ok(registry::global().expect_info(index))
}

/// Ancestors first, the type itself last
fn lineage(type_index: i32) -> Vec<Arc<TypeInfo>> {
    let table = registry::global();
    let info = table.expect_info(type_index);
    let mut chain: Vec<Arc<TypeInfo>> = info
        .type_ancestors
        .iter()
        .filter_map(|&ancestor| table.info(ancestor))
        .collect();
    chain.push(info);
    chain
}

/// All fields visible on `type_index`, ancestors' first, declared order within a type
pub fn fields_of(type_index: i32) -> Vec<Arc<FieldInfo>> {
    lineage(type_index)
        .iter()
        .flat_map(|info| info.fields.iter().cloned())
        .collect()
}

/// Visit every field visible on `type_index`
pub fn for_each_field(type_index: i32, mut visit: impl FnMut(&FieldInfo)) {
    for info in lineage(type_index) {
        for field in &info.fields {
            visit(field);
        }
    }
}

fn find_field(type_index: i32, field_name: &str) -> Option<Arc<FieldInfo>> {
    // Own fields shadow inherited ones
    lineage(type_index)
        .iter()
        .rev()
        .find_map(|info| info.fields.iter().find(|f| f.name == field_name).cloned())
}

/// Field descriptor by type key and name, searching ancestors
///
/// ValueError for an unknown type, AttributeError for an unknown field.
pub fn get_field_info(type_key: &str, field_name: &str) -> Result<Arc<FieldInfo>> {
    let info = info_for_key(type_key)?;
    find_field(info.type_index, field_name).ok_or_else(|| {
        Error::attribute_error(format!("Type `{}` has no field `{}`", type_key, field_name))
    })
}

/// Method descriptor by type key and name, searching ancestors
pub fn get_method_info(type_key: &str, method_name: &str) -> Result<Arc<MethodInfo>> {
    let info = info_for_key(type_key)?;
    lineage(info.type_index)
        .iter()
        .rev()
        .find_map(|info| info.methods.iter().find(|m| m.name == method_name).cloned())
        .ok_or_else(|| {
            Error::attribute_error(format!("Type `{}` has no method `{}`", type_key, method_name))
        })
}

/// Read a field by name
pub fn get_attr(object: &ObjectRef, field_name: &str) -> Result<Any> {
    if !object.defined() {
        return Err(Error::attribute_error(format!(
            "Cannot get field `{}` of None",
            field_name
        )));
    }
    let field = find_field(object.type_index(), field_name).ok_or_else(|| {
        Error::attribute_error(format!(
            "Type `{}` has no field `{}`",
            object.type_key(),
            field_name
        ))
    })?;
    Ok(unsafe { field.read(object.as_ptr()) })
}

/// Write a field by name
///
/// Only uniquely owned objects may be written; readonly fields are an
/// AttributeError.
pub fn set_attr(object: &mut ObjectRef, field_name: &str, value: AnyView<'_>) -> Result<()> {
    let field = find_field(object.type_index(), field_name).ok_or_else(|| {
        Error::attribute_error(format!(
            "Type `{}` has no field `{}`",
            object.type_key(),
            field_name
        ))
    })?;
    if field.readonly {
        return Err(Error::attribute_error(format!(
            "Field `{}` of `{}` is readonly",
            field_name,
            object.type_key()
        )));
    }
    if object.use_count() != 1 {
        return Err(Error::runtime_error(format!(
            "Cannot set field `{}` of a shared `{}`",
            field_name,
            object.type_key()
        )));
    }
    unsafe { field.write(object.as_ptr() as *mut Object, value) }
}

/// Invoke a reflected method; instance methods receive `object` first
pub fn call_method(object: &ObjectRef, method_name: &str, args: &[Any]) -> Result<Any> {
    let method = get_method_info(&object.type_key(), method_name)?;
    if method.is_static {
        return method.method.invoke(args);
    }
    let receiver = Any::new(object.clone());
    let mut views = Vec::with_capacity(args.len() + 1);
    views.push(receiver.view());
    views.extend(args.iter().map(Any::view));
    method.method.call_packed(&views)
}

static BUILTIN: Once = Once::new();

/// Register reflection for the built-in boxed primitives
pub fn init_builtin() {
    BUILTIN.call_once(|| {
        ObjectDef::<BoxIntNode>::new()
            .def_ro("value", crate::field_of!(BoxIntNode, value), [])
            .register();
        ObjectDef::<BoxFloatNode>::new()
            .def_ro("value", crate::field_of!(BoxFloatNode, value), [])
            .register();
        ObjectDef::<BoxBoolNode>::new()
            .def_ro("value", crate::field_of!(BoxBoolNode, value), [])
            .register();
    });
}

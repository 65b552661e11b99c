//! Tests for field and method reflection

use super::*;
use crate::containers::{BoxInt, Str};
use crate::error::ErrorKind;
use crate::field_of;
use crate::object::{make_object, ObjectType};
use crate::registry::type_index;

#[repr(C)]
pub struct ShapeBaseNode {
    base: Object,
    name: Str,
}

crate::object_type! {
    ShapeBaseNode: "test.reflection.ShapeBase" extends Object {
        const CHILD_SLOTS: u32 = 2;
    }
}

#[repr(C)]
pub struct PointNode {
    base: ShapeBaseNode,
    x: i64,
    y: f64,
    label: String,
}

crate::object_type! {
    PointNode: "test.reflection.Point" extends ShapeBaseNode
}

crate::object_ref! {
    pub struct Point(PointNode);
}

fn register_point() {
    ObjectDef::<ShapeBaseNode>::new()
        .def_ro("name", field_of!(ShapeBaseNode, name), [FieldOpt::Doc("display name".into())])
        .register();
    ObjectDef::<PointNode>::new()
        .def_rw("x", field_of!(PointNode, x), [])
        .def_rw("y", field_of!(PointNode, y), [])
        .def_ro(
            "label",
            field_of!(PointNode, label),
            [FieldOpt::Default(Any::new("origin")), FieldOpt::SEqualIgnore],
        )
        .def_method(
            "norm1",
            Function::from_typed("Point.norm1", |p: Point| p.x as f64 + p.y.abs()),
            false,
        )
        .def_method(
            "make",
            Function::from_typed("Point.make", |x: i64| make_point(x, 0.0)),
            true,
        )
        .register();
}

fn make_point(x: i64, y: f64) -> Point {
    Point::from_ptr(make_object(PointNode {
        base: ShapeBaseNode {
            base: Object::new(),
            name: Str::new("p"),
        },
        x,
        y,
        label: "origin".to_string(),
    }))
}

#[test]
fn test_field_info_lookup_and_default() {
    register_point();
    let label = get_field_info("test.reflection.Point", "label").unwrap();
    assert!(label.readonly);
    assert!(label.sequal_ignore);
    assert_eq!(label.field_static_type_index, type_index::STR);
    let default: String = label.default_value.as_ref().unwrap().cast().unwrap();
    assert_eq!(default, "origin");

    let x = get_field_info("test.reflection.Point", "x").unwrap();
    assert!(!x.readonly);
    assert_eq!(x.field_static_type_index, type_index::INT);
    assert_eq!(x.offset, core::mem::offset_of!(PointNode, x));
}

#[test]
fn test_inherited_field_visible_on_child() {
    register_point();
    let name = get_field_info("test.reflection.Point", "name").unwrap();
    assert_eq!(name.doc.as_deref(), Some("display name"));

    let mut names = Vec::new();
    for_each_field(PointNode::type_index(), |field| names.push(field.name.clone()));
    assert_eq!(names, ["name", "x", "y", "label"]);
}

#[test]
fn test_unknown_lookups() {
    register_point();
    let err = get_field_info("test.reflection.Missing", "x").unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ValueError);
    let err = get_field_info("test.reflection.Point", "z").unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::AttributeError);
}

#[test]
fn test_get_and_set_attr() {
    register_point();
    let mut object: ObjectRef = make_point(3, -1.5).into();
    assert_eq!(get_attr(&object, "x").unwrap().cast::<i64>().unwrap(), 3);
    assert_eq!(get_attr(&object, "name").unwrap().cast::<String>().unwrap(), "p");

    set_attr(&mut object, "x", Any::new(10i64).view()).unwrap();
    assert_eq!(get_attr(&object, "x").unwrap().cast::<i64>().unwrap(), 10);

    let err = set_attr(&mut object, "label", Any::new("moved").view()).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::AttributeError);

    let err = set_attr(&mut object, "x", Any::new("ten").view()).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::TypeError);

    let shared = object.clone();
    let err = set_attr(&mut object, "x", Any::new(1i64).view()).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::RuntimeError);
    drop(shared);
}

#[test]
fn test_call_methods() {
    register_point();
    let object: ObjectRef = make_point(2, -0.5).into();
    let norm: f64 = call_method(&object, "norm1", &[]).unwrap().cast().unwrap();
    assert_eq!(norm, 2.5);

    let made = call_method(&object, "make", &[Any::new(7i64)]).unwrap();
    let made: Point = made.cast().unwrap();
    assert_eq!(made.x, 7);
}

#[test]
fn test_register_twice_keeps_one_entry() {
    register_point();
    register_point();
    let info = registry::global().expect_info(PointNode::type_index());
    assert_eq!(info.fields.len(), 3);
    assert_eq!(info.methods.len(), 2);
}

#[test]
fn test_builtin_box_value_field() {
    init_builtin();
    let boxed: ObjectRef = BoxInt::new(41).into();
    assert_eq!(get_attr(&boxed, "value").unwrap().cast::<i64>().unwrap(), 41);
    assert!(get_field_info("ffi.BoxInt", "value").unwrap().readonly);
    assert!(boxed.defined());
}

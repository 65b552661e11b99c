//! Small IR shared by the integration tests
//!
//! `Var` is a free variable whose name does not take part in equality;
//! `Let` and `Func` bind variables in a definition region.

#![allow(dead_code)]

use std::sync::Once;

use tensor_ffi::reflection::{FieldOpt, ObjectDef};
use tensor_ffi::{field_of, make_object, Any, Array, Object, StructuralKind};

#[repr(C)]
pub struct VarNode {
    base: Object,
    pub name: String,
}

tensor_ffi::object_type! {
    VarNode: "testing.Var" extends Object {
        const STRUCTURAL_KIND: StructuralKind = StructuralKind::FreeVar;
    }
}

tensor_ffi::object_ref! {
    pub struct Var(VarNode) {
        const NULLABLE: bool = false;
    }
}

#[repr(C)]
pub struct AddNode {
    base: Object,
    pub lhs: Any,
    pub rhs: Any,
}

tensor_ffi::object_type! {
    AddNode: "testing.Add" extends Object {
        const STRUCTURAL_KIND: StructuralKind = StructuralKind::TreeNode;
    }
}

tensor_ffi::object_ref! {
    pub struct Add(AddNode) {
        const NULLABLE: bool = false;
    }
}

#[repr(C)]
pub struct LetNode {
    base: Object,
    pub var: Var,
    pub value: Any,
    pub body: Any,
}

tensor_ffi::object_type! {
    LetNode: "testing.Let" extends Object {
        const STRUCTURAL_KIND: StructuralKind = StructuralKind::TreeNode;
    }
}

tensor_ffi::object_ref! {
    pub struct Let(LetNode) {
        const NULLABLE: bool = false;
    }
}

#[repr(C)]
pub struct FuncNode {
    base: Object,
    pub params: Array,
    pub body: Any,
}

tensor_ffi::object_type! {
    FuncNode: "testing.Func" extends Object {
        const STRUCTURAL_KIND: StructuralKind = StructuralKind::TreeNode;
    }
}

tensor_ffi::object_ref! {
    pub struct Func(FuncNode) {
        const NULLABLE: bool = false;
    }
}

/// Shared subexpression node; pairs must be one to one across graphs
#[repr(C)]
pub struct PairNode {
    base: Object,
    pub first: Any,
    pub second: Any,
}

tensor_ffi::object_type! {
    PairNode: "testing.Pair" extends Object {
        const STRUCTURAL_KIND: StructuralKind = StructuralKind::DagNode;
    }
}

tensor_ffi::object_ref! {
    pub struct Pair(PairNode) {
        const NULLABLE: bool = false;
    }
}

pub fn register_ir() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        ObjectDef::<VarNode>::new()
            .def_ro("name", field_of!(VarNode, name), [FieldOpt::SEqualIgnore])
            .register();
        ObjectDef::<AddNode>::new()
            .def_ro("lhs", field_of!(AddNode, lhs), [])
            .def_ro("rhs", field_of!(AddNode, rhs), [])
            .register();
        ObjectDef::<LetNode>::new()
            .def_ro("var", field_of!(LetNode, var), [FieldOpt::SEqualDefRegion])
            .def_ro("value", field_of!(LetNode, value), [])
            .def_ro("body", field_of!(LetNode, body), [])
            .register();
        ObjectDef::<FuncNode>::new()
            .def_ro("params", field_of!(FuncNode, params), [FieldOpt::SEqualDefRegion])
            .def_ro("body", field_of!(FuncNode, body), [])
            .register();
        ObjectDef::<PairNode>::new()
            .def_ro("first", field_of!(PairNode, first), [])
            .def_ro("second", field_of!(PairNode, second), [])
            .register();
    });
}

pub fn var(name: &str) -> Var {
    register_ir();
    Var::from_ptr(make_object(VarNode {
        base: Object::new(),
        name: name.to_string(),
    }))
}

pub fn add(lhs: impl Into<Any>, rhs: impl Into<Any>) -> Add {
    register_ir();
    Add::from_ptr(make_object(AddNode {
        base: Object::new(),
        lhs: lhs.into(),
        rhs: rhs.into(),
    }))
}

pub fn let_(var: Var, value: impl Into<Any>, body: impl Into<Any>) -> Let {
    register_ir();
    Let::from_ptr(make_object(LetNode {
        base: Object::new(),
        var,
        value: value.into(),
        body: body.into(),
    }))
}

pub fn func(params: Vec<Var>, body: impl Into<Any>) -> Func {
    register_ir();
    Func::from_ptr(make_object(FuncNode {
        base: Object::new(),
        params: Array::from_values(params),
        body: body.into(),
    }))
}

pub fn pair(first: impl Into<Any>, second: impl Into<Any>) -> Pair {
    register_ir();
    Pair::from_ptr(make_object(PairNode {
        base: Object::new(),
        first: first.into(),
        second: second.into(),
    }))
}

//! Structural equality and hashing over a small IR with bound variables

mod common;

use common::*;
use tensor_ffi::reflection::get_attr;
use tensor_ffi::{
    array, structural_equal, structural_hash, Any, ErrorKind, ObjectPath, ObjectRef,
    StructuralEqual,
};

fn eq(lhs: impl Into<Any>, rhs: impl Into<Any>, map_free_vars: bool) -> bool {
    structural_equal(&lhs.into(), &rhs.into(), map_free_vars).unwrap()
}

fn hash(value: impl Into<Any>, map_free_vars: bool) -> u64 {
    structural_hash(&value.into(), map_free_vars).unwrap()
}

fn first_mismatch(options: StructuralEqual, lhs: impl Into<Any>, rhs: impl Into<Any>) -> (String, String) {
    let paths = options
        .first_mismatch(&lhs.into(), &rhs.into())
        .unwrap()
        .expect("values differ");
    (paths.lhs.to_string(), paths.rhs.to_string())
}

#[test]
fn test_free_vars_need_mapping() {
    let (x, y) = (var("x"), var("y"));
    let lhs = add(x.clone(), 1i64);
    let rhs = add(y, 1i64);

    assert!(!eq(lhs.clone(), rhs.clone(), false));
    assert!(eq(lhs.clone(), rhs.clone(), true));
    assert_eq!(hash(lhs.clone(), true), hash(rhs.clone(), true));
    assert_ne!(hash(lhs.clone(), false), hash(rhs, false));

    // The very same variable is always equal to itself
    assert!(eq(lhs.clone(), add(x, 1i64), false));
}

#[test]
fn test_reflexive_on_every_node() {
    let x = var("x");
    let shared = add(x.clone(), 2i64);
    let tree = let_(x.clone(), shared.clone(), array![shared.clone(), shared]);
    assert!(eq(tree.clone(), tree.clone(), false));
    assert!(eq(tree.clone(), tree.clone(), true));
    assert_eq!(hash(tree.clone(), false), hash(tree, false));
}

#[test]
fn test_function_params_bind_in_def_region() {
    let (x, y) = (var("x"), var("y"));
    let f = func(vec![x.clone()], add(x, 1i64));
    let g = func(vec![y.clone()], add(y, 1i64));

    assert!(eq(f.clone(), g.clone(), false));
    assert!(eq(g.clone(), f.clone(), false));
    assert_eq!(hash(f.clone(), false), hash(g.clone(), false));

    let (z, w) = (var("z"), var("w"));
    let h = func(vec![z.clone()], add(w, 1i64));
    assert!(!eq(f, h, false));
}

#[test]
fn test_inconsistent_variable_use_reports_body_path() {
    let (x, y) = (var("x"), var("y"));
    let (a, b) = (var("a"), var("b"));
    let f = func(vec![x.clone(), y.clone()], add(x, y));
    let g = func(vec![a.clone(), b.clone()], add(b, a));

    assert!(!eq(f.clone(), g.clone(), false));
    let (lhs, rhs) = first_mismatch(StructuralEqual::new(), f, g);
    assert_eq!(lhs, "<root>.body.lhs");
    assert_eq!(rhs, "<root>.body.lhs");
}

#[test]
fn test_one_variable_cannot_stand_for_two() {
    let (x, y) = (var("x"), var("y"));
    let (a, b) = (var("a"), var("b"));
    let f = func(vec![x.clone(), y], add(x.clone(), x));
    let g = func(vec![a.clone(), b.clone()], add(a, b));
    let (lhs, _) = first_mismatch(StructuralEqual::new(), f, g);
    assert_eq!(lhs, "<root>.body.rhs");
}

#[test]
fn test_let_binding() {
    let (x, y) = (var("x"), var("y"));
    let lhs = let_(x.clone(), 1i64, add(x, 2i64));
    let rhs = let_(y.clone(), 1i64, add(y, 2i64));
    assert!(eq(lhs.clone(), rhs.clone(), false));
    assert_eq!(hash(lhs.clone(), false), hash(rhs, false));

    let z = var("z");
    let other = let_(z.clone(), 5i64, add(z, 2i64));
    let (path, _) = first_mismatch(StructuralEqual::new(), lhs, other);
    assert_eq!(path, "<root>.value");
}

#[test]
fn test_dag_nodes_pair_one_to_one() {
    let p = pair(1i64, 2i64);
    let q = pair(1i64, 2i64);
    let r = pair(1i64, 2i64);

    assert!(eq(p.clone(), q.clone(), false));
    assert!(eq(array![p.clone(), p.clone()], array![q.clone(), q.clone()], false));
    assert!(!eq(array![p.clone(), p.clone()], array![q.clone(), r.clone()], false));
    assert!(!eq(array![q.clone(), r], array![p.clone(), p.clone()], false));
    assert_eq!(
        hash(array![p.clone(), p], false),
        hash(array![q.clone(), q], false)
    );
}

#[test]
fn test_first_differing_field_is_reported() {
    // Outer rhs differs as a leaf, inner lhs differs deeper in the first field
    let lhs = add(add(1i64, 2i64), 5i64);
    let rhs = add(add(1i64, 3i64), 6i64);

    for defer_fails in [false, true] {
        let options = StructuralEqual::new().defer_fails(defer_fails);
        let paths = first_mismatch(options, lhs.clone(), rhs.clone());
        assert_eq!(paths, ("<root>.lhs.rhs".to_string(), "<root>.lhs.rhs".to_string()));
    }
}

#[test]
fn test_defer_fails_records_pairing_failure() {
    let p = pair(1i64, 2i64);
    let q = pair(1i64, 2i64);
    let r = pair(1i64, 2i64);

    // The pairing failure at [1] precedes the leaf at [2] in both modes
    let lhs = array![p.clone(), p.clone(), 1i64];
    let rhs = array![q.clone(), r.clone(), 2i64];
    for defer_fails in [false, true] {
        let options = StructuralEqual::new().defer_fails(defer_fails);
        let (path, _) = first_mismatch(options, lhs.clone(), rhs.clone());
        assert_eq!(path, "<root>[1]");
    }
    let deferred = StructuralEqual::new().defer_fails(true);
    assert!(!deferred
        .equal(&Any::from(array![p.clone(), p.clone()]), &Any::from(array![q.clone(), r.clone()]))
        .unwrap());

    // Deferring keeps walking, so a later unsupported node still surfaces
    let lhs = Any::from(array![p.clone(), p, ObjectPath::root()]);
    let rhs = Any::from(array![q.clone(), r, ObjectPath::root()]);
    assert!(!StructuralEqual::new().defer_fails(false).equal(&lhs, &rhs).unwrap());
    let err = deferred.equal(&lhs, &rhs).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::TypeError);
}

#[test]
fn test_assert_equal_message() {
    let lhs = add(1i64, 2i64);
    let rhs = add(1i64, 3i64);
    StructuralEqual::new()
        .assert_equal(&Any::from(lhs.clone()), &Any::from(lhs.clone()))
        .unwrap();
    let err = StructuralEqual::new()
        .assert_equal(&Any::from(lhs), &Any::from(rhs))
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ValueError);
    assert!(
        err.message().contains("caused by lhs at <root>.rhs"),
        "{}",
        err.message()
    );
}

#[test]
fn test_fields_are_reflected() {
    let x = var("x");
    let node: ObjectRef = add(x.clone(), 4i64).into();
    assert_eq!(get_attr(&node, "rhs").unwrap().cast::<i64>().unwrap(), 4);
    let lhs = get_attr(&node, "lhs").unwrap();
    assert!(lhs.same_as(&Any::from(x.clone())));

    let as_var: ObjectRef = x.into();
    assert_eq!(get_attr(&as_var, "name").unwrap().cast::<String>().unwrap(), "x");
    assert_eq!(
        get_attr(&as_var, "missing").unwrap_err().kind(),
        &ErrorKind::AttributeError
    );
}

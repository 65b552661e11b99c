//! Tests for the built-in containers

use super::*;
use crate::any::Any;
use crate::error::ErrorKind;
use crate::object::ObjectRefType;
use crate::registry::type_index;

#[test]
fn test_fixed_type_indices() {
    assert_eq!(Str::new("a").type_index(), type_index::STR);
    assert_eq!(Bytes::new(b"a").type_index(), type_index::BYTES);
    assert_eq!(Array::new().type_index(), type_index::ARRAY);
    assert_eq!(Map::new().type_index(), type_index::MAP);
    assert_eq!(Shape::new(vec![1i64]).type_index(), type_index::SHAPE);
    assert_eq!(BoxInt::new(1).type_index(), type_index::BOX_INT);
    assert_eq!(BoxFloat::new(1.0).type_index(), type_index::BOX_FLOAT);
    assert_eq!(BoxBool::new(true).type_index(), type_index::BOX_BOOL);
}

#[test]
fn test_strings_and_bytes() {
    let s = Str::from("hello".to_string());
    assert_eq!(s.as_str(), "hello");
    assert_eq!(s.len(), 5);
    assert!(!s.is_empty());
    assert_eq!(s, "hello");
    assert_eq!(s, Str::new("hello"));
    assert_eq!(s.to_string(), "hello");

    let b = Bytes::from(vec![0u8, 159, 255]);
    assert_eq!(b.as_bytes(), &[0, 159, 255]);
    assert_eq!(b, Bytes::new(&[0, 159, 255]));
    let value = Any::from(&[1u8, 2][..]);
    assert_eq!(value.type_index(), type_index::BYTES);
}

#[test]
fn test_array_access() {
    let array = crate::array![1i64, "two", 3.0f64];
    assert_eq!(array.len(), 3);
    assert_eq!(array.at(0).unwrap().cast::<i64>().unwrap(), 1);
    assert_eq!(array.at(1).unwrap().cast::<String>().unwrap(), "two");
    let err = array.at(3).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::IndexError);
    assert!(array.at(-1).is_err());
    assert_eq!(array.iter().count(), 3);
    assert_eq!(array.to_string(), "[1, \"two\", 3.0]");
}

#[test]
fn test_array_push_reuses_unique_storage() {
    let mut array = Array::with_capacity(Vec::new(), 4);
    let first = array.as_object_ref().as_ptr();
    array.push(1i64);
    array.push(2i64);
    assert!(core::ptr::eq(first, array.as_object_ref().as_ptr()));
    assert_eq!(array.len(), 2);

    // Beyond capacity moves to a bigger block
    for i in 0..3i64 {
        array.push(i);
    }
    assert_eq!(array.len(), 5);
    assert!(array.capacity() >= 5);
}

#[test]
fn test_array_copy_on_write() {
    let original = Array::from_values([1i64, 2, 3]);
    let mut copy = original.clone();
    copy.set(0, 10i64).unwrap();
    copy.push(4i64);

    assert_eq!(original.at(0).unwrap().cast::<i64>().unwrap(), 1);
    assert_eq!(original.len(), 3);
    assert_eq!(copy.at(0).unwrap().cast::<i64>().unwrap(), 10);
    assert_eq!(copy.len(), 4);
    assert!(!copy.same_as(&original));
    assert_eq!(original.use_count(), 1);

    assert_eq!(copy.set(9, 0i64).unwrap_err().kind(), &ErrorKind::IndexError);
}

#[test]
fn test_array_releases_elements() {
    let s = Str::new("element");
    let array = Array::from_values([Any::new(s.clone()), Any::new(s.clone())]);
    assert_eq!(s.use_count(), 3);
    drop(array);
    assert_eq!(s.use_count(), 1);
}

#[test]
fn test_map_lookup_by_content() {
    let map = crate::map! { "a" => 1i64, "b" => 2i64 };
    assert_eq!(map.len(), 2);
    assert!(map.contains_key("a"));
    assert_eq!(map.find("b").unwrap().cast::<i64>().unwrap(), 2);
    assert!(map.find("c").is_none());
    let err = map.at("c").unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::KeyError);
    assert!(err.message().contains("\"c\""), "{}", err.message());

    // Non-string objects are keyed by identity
    let key = Array::new();
    let mut by_identity = Map::new();
    by_identity.set(key.clone(), 1i64);
    assert!(by_identity.contains_key(key));
    assert!(!by_identity.contains_key(Array::new()));
}

#[test]
fn test_map_preserves_insertion_order() {
    let mut map = Map::from_pairs([("z", 1i64), ("a", 2), ("m", 3), ("a", 4)]);
    let keys: Vec<String> = map.keys().map(|key| key.cast::<String>().unwrap()).collect();
    assert_eq!(keys, ["z", "a", "m"]);
    assert_eq!(map.at("a").unwrap().cast::<i64>().unwrap(), 4);

    assert!(map.erase("z"));
    assert!(!map.erase("z"));
    map.set("q", 5i64);
    let keys: Vec<String> = map.keys().map(|key| key.cast::<String>().unwrap()).collect();
    assert_eq!(keys, ["a", "m", "q"]);
    assert_eq!(map.at("m").unwrap().cast::<i64>().unwrap(), 3);
}

#[test]
fn test_map_copy_on_write() {
    let original = crate::map! { 1i64 => "one" };
    let mut copy = original.clone();
    copy.set(2i64, "two");
    copy.erase(1i64);
    assert_eq!(original.len(), 1);
    assert!(original.contains_key(1i64));
    assert_eq!(copy.len(), 1);
    assert!(copy.contains_key(2i64));
    assert_eq!(original.to_string(), "{1: \"one\"}");
}

#[test]
fn test_shape() {
    let shape = Shape::new(vec![2i64, 3, 4]);
    assert_eq!(shape.ndim(), 3);
    assert_eq!(shape.numel(), 24);
    assert_eq!(shape.to_string(), "(2, 3, 4)");
    assert_eq!(Shape::new(vec![5i64]).to_string(), "(5,)");
    assert_eq!(Shape::new(Vec::<i64>::new()).numel(), 1);
    assert_eq!(shape, Shape::new(vec![2i64, 3, 4]));
}

#[test]
fn test_boxed_primitives() {
    assert_eq!(BoxInt::new(-3).value(), -3);
    assert_eq!(BoxFloat::new(0.5).value(), 0.5);
    assert!(BoxBool::new(true).value());
    let boxed = Any::new(BoxInt::new(9));
    assert_eq!(boxed.cast::<BoxInt>().unwrap().value(), 9);
    assert!(boxed.cast::<i64>().is_err());
}

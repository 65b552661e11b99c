//! Tests for headers, refcounting, type tests and in-place storage

use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::registry::type_index;

#[repr(C)]
struct AnimalNode {
    base: Object,
    legs: u32,
}

crate::object_type! {
    AnimalNode: "test.object.Animal" extends Object {
        const CHILD_SLOTS: u32 = 1;
    }
}

#[repr(C)]
struct DogNode {
    base: AnimalNode,
    name: String,
}

crate::object_type!(DogNode: "test.object.Dog" extends AnimalNode);

// Registered after the parent's single slot is taken
#[repr(C)]
struct CatNode {
    base: AnimalNode,
}

crate::object_type!(CatNode: "test.object.Cat" extends AnimalNode);

#[repr(C)]
struct RockNode {
    base: Object,
}

crate::object_type! {
    RockNode: "test.object.Rock" extends Object {
        const TYPE_FINAL: bool = true;
    }
}

static DROPS: AtomicUsize = AtomicUsize::new(0);

#[repr(C)]
struct TrackedNode {
    base: Object,
}

impl Drop for TrackedNode {
    fn drop(&mut self) {
        DROPS.fetch_add(1, Ordering::SeqCst);
    }
}

crate::object_type!(TrackedNode: "test.object.Tracked" extends Object);

fn dog(name: &str) -> ObjectPtr<DogNode> {
    make_object(DogNode {
        base: AnimalNode {
            base: Object::new(),
            legs: 4,
        },
        name: name.to_string(),
    })
}

#[test]
fn test_header_is_stamped_after_construction() {
    let d = dog("rex");
    assert_eq!(d.use_count(), 1);
    assert_eq!(d.type_index(), DogNode::type_index());
    assert_eq!(d.header().map(Object::type_key).as_deref(), Some("test.object.Dog"));
    assert_eq!(d.name, "rex");
    assert_eq!(d.base.legs, 4);
}

#[test]
fn test_clone_and_drop_track_use_count() {
    let a = make_object(TrackedNode { base: Object::new() });
    let before = DROPS.load(Ordering::SeqCst);
    let b = a.clone();
    let c = b.clone();
    assert_eq!(a.use_count(), 3);
    drop(b);
    assert_eq!(a.use_count(), 2);
    let mut c = c;
    c.reset();
    assert!(c.is_null());
    assert_eq!(a.use_count(), 1);
    assert_eq!(DROPS.load(Ordering::SeqCst), before);
    drop(a);
    assert_eq!(DROPS.load(Ordering::SeqCst), before + 1);
}

#[test]
fn test_into_raw_and_from_raw_balance() {
    let a = make_object(TrackedNode { base: Object::new() });
    let before = DROPS.load(Ordering::SeqCst);
    let raw = a.clone().into_raw();
    assert_eq!(a.use_count(), 2);
    let back = unsafe { ObjectPtr::from_raw(raw) };
    drop(back);
    assert_eq!(a.use_count(), 1);

    let borrowed = unsafe { ObjectPtr::from_borrowed(a.as_ptr()) };
    assert_eq!(a.use_count(), 2);
    drop(borrowed);
    drop(a);
    assert_eq!(DROPS.load(Ordering::SeqCst), before + 1);
}

#[test]
fn test_concurrent_clones() {
    let a = make_object(TrackedNode { base: Object::new() });
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let local = a.clone();
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    let copy = local.clone();
                    drop(copy);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(a.use_count(), 1);
}

#[test]
fn test_subtype_checks() {
    let d = dog("fido");
    let c = make_object(CatNode {
        base: AnimalNode {
            base: Object::new(),
            legs: 4,
        },
    });

    // Dog took the reserved slot, Cat overflowed into the dynamic range
    assert_eq!(DogNode::type_index(), AnimalNode::type_index() + 1);
    assert!(CatNode::type_index() >= type_index::DYN_OBJECT_BEGIN);

    assert!(is_instance::<AnimalNode>(d.type_index()));
    assert!(is_instance::<AnimalNode>(c.type_index()));
    assert!(is_instance::<Object>(c.type_index()));
    assert!(!is_instance::<DogNode>(c.type_index()));
    assert!(!is_instance::<CatNode>(d.type_index()));
    assert!(!is_instance::<RockNode>(d.type_index()));
    assert!(!is_instance::<DogNode>(AnimalNode::type_index()));
    assert!(!is_instance::<Object>(type_index::INT));
}

#[test]
fn test_ptr_downcast() {
    let animal: ObjectPtr<Object> = dog("spot").upcast();
    let animal = match animal.downcast::<AnimalNode>() {
        Ok(animal) => animal,
        Err(_) => panic!("dog is an animal"),
    };
    assert_eq!(animal.legs, 4);
    let back = animal.upcast();
    let rock = back.downcast::<RockNode>();
    assert!(rock.is_err());
}

#[test]
fn test_object_ref_basics() {
    let null = ObjectRef::null();
    assert!(!null.defined());
    assert_eq!(null.type_key(), "None");
    assert_eq!(null.use_count(), 0);

    let d = ObjectRef::from_ptr(dog("a"));
    let e = d.clone();
    assert!(d.same_as(&e));
    assert_eq!(d, e);
    assert!(!d.same_as(&ObjectRef::from_ptr(dog("a"))));
    assert_eq!(d.as_::<DogNode>().map(|n| n.name.as_str()), Some("a"));
    assert!(d.as_::<AnimalNode>().is_some());
    assert!(d.as_::<RockNode>().is_none());
    assert_eq!(format!("{:?}", null), "None");
}

#[test]
fn test_registration_is_idempotent_across_threads() {
    #[repr(C)]
    struct RacerNode {
        base: Object,
    }
    crate::object_type!(RacerNode: "test.object.Racer" extends Object);

    let indices: Vec<i32> = (0..8)
        .map(|_| std::thread::spawn(RacerNode::type_index))
        .map(|handle| handle.join().unwrap())
        .collect();
    assert!(indices.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(register_type::<RacerNode>(), indices[0]);
}

#[repr(C)]
struct RowNode {
    base: Object,
    len: usize,
    capacity: usize,
}

crate::object_type!(RowNode: "test.object.Row" extends Object);

unsafe impl InplaceArray for RowNode {
    type Element = String;

    fn inplace_len(&self) -> usize {
        self.len
    }

    fn inplace_capacity(&self) -> usize {
        self.capacity
    }

    unsafe fn set_inplace_len(&mut self, len: usize) {
        self.len = len;
    }
}

#[test]
fn test_inplace_elements() {
    let row = make_inplace_object(
        RowNode {
            base: Object::new(),
            len: 3,
            capacity: 4,
        },
        ["a", "b", "c"].iter().map(|s| s.to_string()),
    );
    let items = unsafe { inplace_slice(row.as_ptr()) };
    assert_eq!(items, ["a", "b", "c"]);
    assert_eq!(unsafe { inplace_at(row.as_ptr(), 2) }.unwrap(), "c");
    let err = unsafe { inplace_at(row.as_ptr(), 3) }.unwrap_err();
    assert_eq!(err.kind(), &crate::error::ErrorKind::IndexError);
    assert!(unsafe { inplace_at(row.as_ptr(), -1) }.is_err());

    // Short iterators shrink the recorded length
    let short = make_inplace_object(
        RowNode {
            base: Object::new(),
            len: 3,
            capacity: 3,
        },
        std::iter::once("only".to_string()),
    );
    assert_eq!(short.len, 1);
}

static LINK_DROPS: AtomicUsize = AtomicUsize::new(0);

#[repr(C)]
struct LinkNode {
    base: Object,
    next: Option<ObjectPtr<LinkNode>>,
}

impl Drop for LinkNode {
    fn drop(&mut self) {
        LINK_DROPS.fetch_add(1, Ordering::SeqCst);
    }
}

crate::object_type!(LinkNode: "test.object.Link" extends Object);

#[test]
fn test_deep_chain_releases_without_recursion() {
    const DEPTH: usize = 200_000;

    // A small stack makes one native frame per link fail loudly
    let released = std::thread::Builder::new()
        .stack_size(256 * 1024)
        .spawn(|| {
            let before = LINK_DROPS.load(Ordering::SeqCst);
            let mut head = make_object(LinkNode {
                base: Object::new(),
                next: None,
            });
            for _ in 1..DEPTH {
                head = make_object(LinkNode {
                    base: Object::new(),
                    next: Some(head),
                });
            }
            drop(head);
            LINK_DROPS.load(Ordering::SeqCst) - before
        })
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(released, DEPTH);
}

#[repr(C)]
struct HolderNode {
    base: Object,
    held: ObjectPtr<RockNode>,
}

crate::object_type!(HolderNode: "test.object.Holder" extends Object);

#[test]
fn test_shared_child_outlives_released_parent() {
    let rock = make_object(RockNode { base: Object::new() });
    let holder = make_object(HolderNode {
        base: Object::new(),
        held: rock.clone(),
    });
    assert_eq!(rock.use_count(), 2);
    drop(holder);
    assert_eq!(rock.use_count(), 1);
}

//! Indented tree dump with one location underlined, for assertion messages

use std::fmt::Write;

use crate::any::Any;
use crate::containers::Str;
use crate::object::ObjectRef;
use crate::reflection;

use super::{classify, Node, ObjectPath, PathKind};

struct Item {
    value: Any,
    path: ObjectPath,
    depth: usize,
    label: String,
}

fn summary(value: &Any) -> String {
    let Some(object) = value.as_object_ref() else {
        return value.to_string();
    };
    match classify(&object) {
        Node::Str(text) => format!("{:?}", text),
        Node::Bytes(bytes) => format!("b<{} bytes>", bytes.len()),
        Node::Shape(dims) => format!("{:?}", dims),
        Node::Int(v) => v.to_string(),
        Node::Float(v) => format!("{:?}", v),
        Node::Bool(v) => v.to_string(),
        Node::Array(array) => format!("{} (len {})", object.type_key(), array.len()),
        Node::Map(map) => format!("{} (len {})", object.type_key(), map.len()),
        Node::Reflected(_) => object.type_key(),
    }
}

fn key_label(key: &Any) -> String {
    match key.as_::<Str>() {
        Some(text) => format!("[{:?}]: ", text.as_str()),
        None => format!("[{}]: ", key),
    }
}

fn children(object: &ObjectRef, path: &ObjectPath, depth: usize) -> Vec<Item> {
    let mut items = Vec::new();
    match classify(object) {
        Node::Array(array) => {
            for (index, value) in array.iter().enumerate() {
                items.push(Item {
                    value: value.clone(),
                    path: path.array_index(index as i64),
                    depth,
                    label: format!("[{}]: ", index),
                });
            }
        }
        Node::Map(map) => {
            for (key, value) in map.iter() {
                items.push(Item {
                    value: value.clone(),
                    path: path.map_value(key.clone()),
                    depth,
                    label: key_label(key),
                });
            }
        }
        Node::Reflected(_) => {
            reflection::for_each_field(object.type_index(), |field| {
                items.push(Item {
                    value: unsafe { field.read(object.as_ptr()) },
                    path: path.attr(field.name.clone()),
                    depth,
                    label: format!("{}: ", field.name),
                });
            });
        }
        _ => {}
    }
    items
}

/// Render `root` one node per line, underlining the node at `target`
///
/// Missing-entry targets underline their parent. Output stops after
/// `max_lines` lines.
pub fn render_with_underline(root: &Any, target: &ObjectPath, max_lines: usize) -> String {
    let target = match target.kind() {
        PathKind::MissingArrayElement(_) | PathKind::MissingMapEntry => {
            target.parent().unwrap_or_else(|| target.clone())
        }
        _ => target.clone(),
    };

    let mut out = String::new();
    let mut lines = 0usize;
    let mut stack = vec![Item {
        value: root.clone(),
        path: ObjectPath::root(),
        depth: 0,
        label: String::new(),
    }];

    while let Some(item) = stack.pop() {
        if lines >= max_lines {
            out.push_str("...\n");
            break;
        }
        let indent = "  ".repeat(item.depth);
        let text = summary(&item.value);
        let _ = writeln!(out, "{}{}{}", indent, item.label, text);
        lines += 1;
        if item.path == target {
            let _ = writeln!(
                out,
                "{}{}{}",
                indent,
                " ".repeat(item.label.len()),
                "^".repeat(text.chars().count().max(1))
            );
            lines += 1;
        }
        if let Some(object) = item.value.as_object_ref() {
            let mut kids = children(&object, &item.path, item.depth + 1);
            kids.reverse();
            stack.extend(kids);
        }
    }
    out
}

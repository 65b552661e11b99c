//! Structural equality - explicit task stack with graph-node pairing
//!
//! A `Compare` task is expanded once: the node's own checks run, its child
//! comparisons are pushed (in reverse, so the first declared field is
//! compared first) and the task stays on the stack. When the task surfaces
//! again every child has succeeded, so a graph node's pairing is committed
//! into the bijection maps at that point.
//!
//! A failed leaf comparison becomes a `ForceFail` task at its position, so
//! the reported mismatch is always the first one in depth-first,
//! declared-field order.
//!
//! A graph node already paired with a different partner ends the run, or,
//! with `defer_fails`, is recorded and skipped so the rest of the graph is
//! still walked. The earliest recorded failure is the one reported.

use std::collections::HashMap;

use crate::any::{Any, RawAny};
use crate::config;
use crate::containers::{Array, Map};
use crate::error::{Error, Result};
use crate::logging;
use crate::object::ObjectRef;
use crate::registry::{type_index, StructuralKind};

use super::{classify, float_equal, printer, unsupported, FieldCache, Node, ObjectPathPair};

/// Structural equality options
///
/// ```ignore
/// let equal = StructuralEqual::new().map_free_vars(true).equal(&lhs, &rhs)?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StructuralEqual {
    map_free_vars: bool,
    defer_fails: bool,
    trace_path: bool,
}

impl Default for StructuralEqual {
    fn default() -> Self {
        Self {
            map_free_vars: false,
            defer_fails: config::current().equality.defer_fails,
            trace_path: false,
        }
    }
}

enum Verdict {
    Equal,
    Mismatch(Option<ObjectPathPair>),
}

impl StructuralEqual {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair free variables by position instead of requiring identity
    pub fn map_free_vars(mut self, enabled: bool) -> Self {
        self.map_free_vars = enabled;
        self
    }

    /// Record graph-node pairing failures and keep comparing instead of stopping
    pub fn defer_fails(mut self, enabled: bool) -> Self {
        self.defer_fails = enabled;
        self
    }

    /// Track object paths (needed for `first_mismatch` results)
    pub fn trace_path(mut self, enabled: bool) -> Self {
        self.trace_path = enabled;
        self
    }

    pub fn equal(&self, lhs: &Any, rhs: &Any) -> Result<bool> {
        let verdict = Engine::new(*self).run(lhs, rhs)?;
        Ok(matches!(verdict, Verdict::Equal))
    }

    /// Paths to the first difference, `None` when equal
    pub fn first_mismatch(&self, lhs: &Any, rhs: &Any) -> Result<Option<ObjectPathPair>> {
        let options = self.trace_path(true);
        match Engine::new(options).run(lhs, rhs)? {
            Verdict::Equal => Ok(None),
            Verdict::Mismatch(paths) => Ok(paths),
        }
    }

    /// ValueError with both trees rendered and the mismatch underlined
    pub fn assert_equal(&self, lhs: &Any, rhs: &Any) -> Result<()> {
        let Some(paths) = self.first_mismatch(lhs, rhs)? else {
            return Ok(());
        };
        let limit = config::current().equality.assert_render_limit;
        Err(Error::value_error(format!(
            "StructuralEqual check failed, caused by lhs at {}:\n{}\nand rhs at {}:\n{}",
            paths.lhs,
            printer::render_with_underline(lhs, &paths.lhs, limit),
            paths.rhs,
            printer::render_with_underline(rhs, &paths.rhs, limit),
        )))
    }
}

struct CompareTask {
    lhs: ObjectRef,
    rhs: ObjectRef,
    map_free_vars: bool,
    paths: Option<ObjectPathPair>,
    expanded: bool,
    graph_node: bool,
}

enum Task {
    Compare(CompareTask),
    ForceFail(Option<ObjectPathPair>),
}

/// Outcome of expanding one comparison
enum Expand {
    /// Own checks passed; children (if any) were queued
    Queued { graph_node: bool },
    Mismatch(Option<ObjectPathPair>),
}

struct Engine {
    options: StructuralEqual,
    /// Committed graph-node pairs, keyed by address
    lhs_map: HashMap<usize, ObjectRef>,
    rhs_map: HashMap<usize, ObjectRef>,
    /// Pairing failures recorded in defer mode, in traversal order
    deferred: Vec<Option<ObjectPathPair>>,
    stack: Vec<Task>,
    fields: FieldCache,
}

fn address(object: &ObjectRef) -> usize {
    object.as_ptr() as usize
}

fn leaf_equal(lhs: &RawAny, rhs: &RawAny) -> bool {
    if lhs.type_index != rhs.type_index {
        return false;
    }
    if lhs.type_index == type_index::FLOAT {
        return unsafe { float_equal(lhs.payload.v_float64, rhs.payload.v_float64) };
    }
    lhs.bits() == rhs.bits()
}

impl Engine {
    fn new(options: StructuralEqual) -> Self {
        Self {
            options,
            lhs_map: HashMap::new(),
            rhs_map: HashMap::new(),
            deferred: Vec::new(),
            stack: Vec::new(),
            fields: FieldCache::default(),
        }
    }

    fn run(mut self, lhs: &Any, rhs: &Any) -> Result<Verdict> {
        let paths = self.options.trace_path.then(ObjectPathPair::root);
        let mut pending = Vec::new();
        self.compare_value(lhs, rhs, self.options.map_free_vars, paths, &mut pending);
        self.stack.extend(pending.into_iter().rev());

        while let Some(top) = self.stack.last_mut() {
            let task = match top {
                Task::ForceFail(paths) => {
                    let paths = paths.take();
                    return Ok(self.mismatch(paths));
                }
                Task::Compare(task) => task,
            };
            if task.expanded {
                if let Some(Task::Compare(task)) = self.stack.pop() {
                    if task.graph_node {
                        self.lhs_map.insert(address(&task.lhs), task.rhs.clone());
                        self.rhs_map.insert(address(&task.rhs), task.lhs);
                    }
                }
                continue;
            }

            task.expanded = true;
            let lhs = task.lhs.clone();
            let rhs = task.rhs.clone();
            let map_free_vars = task.map_free_vars;
            let paths = task.paths.clone();

            let mut pending = Vec::new();
            match self.expand(&lhs, &rhs, map_free_vars, paths, &mut pending)? {
                Expand::Mismatch(paths) => return Ok(self.mismatch(paths)),
                Expand::Queued { graph_node } => {
                    if let Some(Task::Compare(task)) = self.stack.last_mut() {
                        task.graph_node = graph_node;
                    }
                    self.stack.extend(pending.into_iter().rev());
                }
            }
        }
        if self.deferred.is_empty() {
            Ok(Verdict::Equal)
        } else {
            Ok(self.mismatch(None))
        }
    }

    /// Final verdict; a recorded pairing failure precedes `paths` in traversal order
    fn mismatch(&mut self, paths: Option<ObjectPathPair>) -> Verdict {
        let paths = if self.deferred.is_empty() {
            paths
        } else {
            self.deferred.swap_remove(0)
        };
        if let Some(paths) = &paths {
            logging::log_sequal_mismatch(&paths.lhs.to_string(), &paths.rhs.to_string());
        }
        Verdict::Mismatch(paths)
    }

    /// Compare two field values: leaves inline, objects as queued tasks
    fn compare_value(
        &self,
        lhs: &Any,
        rhs: &Any,
        map_free_vars: bool,
        paths: Option<ObjectPathPair>,
        pending: &mut Vec<Task>,
    ) {
        let (a, b) = (lhs.as_raw(), rhs.as_raw());
        if a.is_object() && b.is_object() {
            pending.push(Task::Compare(CompareTask {
                lhs: lhs.as_object_ref().unwrap_or_default(),
                rhs: rhs.as_object_ref().unwrap_or_default(),
                map_free_vars,
                paths,
                expanded: false,
                graph_node: false,
            }));
        } else if !leaf_equal(a, b) {
            pending.push(Task::ForceFail(paths));
        }
    }

    /// One side is already paired with a different partner
    fn pairing_failure(&mut self, paths: Option<ObjectPathPair>) -> Expand {
        if !self.options.defer_fails {
            return Expand::Mismatch(paths);
        }
        if let Some(paths) = &paths {
            logging::log_sequal_deferred(
                &paths.lhs.to_string(),
                &paths.rhs.to_string(),
                self.deferred.len() + 1,
            );
        }
        self.deferred.push(paths);
        Expand::Queued { graph_node: false }
    }

    fn expand(
        &mut self,
        lhs: &ObjectRef,
        rhs: &ObjectRef,
        map_free_vars: bool,
        paths: Option<ObjectPathPair>,
        pending: &mut Vec<Task>,
    ) -> Result<Expand> {
        const DONE: Expand = Expand::Queued { graph_node: false };

        match (lhs.defined(), rhs.defined()) {
            (false, false) => return Ok(DONE),
            (true, true) => {}
            _ => return Ok(Expand::Mismatch(paths)),
        }
        if lhs.type_index() != rhs.type_index() {
            return Ok(Expand::Mismatch(paths));
        }

        let (lhs_addr, rhs_addr) = (address(lhs), address(rhs));
        if let Some(mapped) = self.lhs_map.get(&lhs_addr) {
            return Ok(if address(mapped) == rhs_addr {
                DONE
            } else {
                self.pairing_failure(paths)
            });
        }
        if self.rhs_map.contains_key(&rhs_addr) {
            return Ok(self.pairing_failure(paths));
        }

        let node = classify(lhs);
        let graph_node = matches!(
            node,
            Node::Reflected(StructuralKind::FreeVar | StructuralKind::DagNode)
        );
        if lhs_addr == rhs_addr {
            return Ok(Expand::Queued { graph_node });
        }

        let outcome = match (node, classify(rhs)) {
            (Node::Str(a), Node::Str(b)) => a == b,
            (Node::Bytes(a), Node::Bytes(b)) => a == b,
            (Node::Shape(a), Node::Shape(b)) => a == b,
            // Boxed values report the box itself, not a `.value` hop
            (Node::Int(a), Node::Int(b)) => a == b,
            (Node::Float(a), Node::Float(b)) => float_equal(a, b),
            (Node::Bool(a), Node::Bool(b)) => a == b,
            (Node::Array(a), Node::Array(b)) => {
                return Ok(self.expand_array(&a, &b, map_free_vars, paths, pending));
            }
            (Node::Map(a), Node::Map(b)) => {
                return Ok(self.expand_map(&a, &b, map_free_vars, paths, pending));
            }
            (Node::Reflected(kind), _) => match kind {
                StructuralKind::Unsupported => return Err(unsupported(lhs)),
                StructuralKind::UniqueInstance => false,
                StructuralKind::FreeVar if !map_free_vars => false,
                _ => {
                    self.expand_fields(lhs, rhs, map_free_vars, paths, pending);
                    return Ok(Expand::Queued { graph_node });
                }
            },
            _ => crate::fatal!(
                "structural comparator invoked on mismatched `{}` and `{}`",
                lhs.type_key(),
                rhs.type_key()
            ),
        };
        Ok(if outcome {
            DONE
        } else {
            Expand::Mismatch(paths)
        })
    }

    fn expand_fields(
        &mut self,
        lhs: &ObjectRef,
        rhs: &ObjectRef,
        map_free_vars: bool,
        paths: Option<ObjectPathPair>,
        pending: &mut Vec<Task>,
    ) {
        let fields = self.fields.get(lhs.type_index());
        for field in fields.iter().filter(|field| !field.sequal_ignore) {
            let (a, b) = unsafe { (field.read(lhs.as_ptr()), field.read(rhs.as_ptr())) };
            let child_paths = paths.as_ref().map(|p| p.attr(&field.name));
            self.compare_value(
                &a,
                &b,
                map_free_vars || field.sequal_def_region,
                child_paths,
                pending,
            );
        }
    }

    fn expand_array(
        &self,
        lhs: &Array,
        rhs: &Array,
        map_free_vars: bool,
        paths: Option<ObjectPathPair>,
        pending: &mut Vec<Task>,
    ) -> Expand {
        let common = lhs.len().min(rhs.len());
        for (index, (a, b)) in lhs.iter().zip(rhs.iter()).enumerate() {
            let child_paths = paths.as_ref().map(|p| p.array_index(index as i64));
            self.compare_value(a, b, map_free_vars, child_paths, pending);
        }
        if lhs.len() != rhs.len() {
            let index = common as i64;
            let length_paths = paths.map(|p| {
                if lhs.len() > rhs.len() {
                    ObjectPathPair::new(p.lhs.array_index(index), p.rhs.missing_array_element(index))
                } else {
                    ObjectPathPair::new(p.lhs.missing_array_element(index), p.rhs.array_index(index))
                }
            });
            // Reported after every common element has been compared
            pending.push(Task::ForceFail(length_paths));
        }
        Expand::Queued { graph_node: false }
    }

    /// Rhs counterpart of a map key: paired graph nodes map, everything else is itself
    fn map_key(&self, key: &Any, forward: bool) -> Any {
        let Some(object) = key.as_object_ref() else {
            return key.clone();
        };
        let table = if forward { &self.lhs_map } else { &self.rhs_map };
        match table.get(&address(&object)) {
            Some(mapped) => Any::new(mapped.clone()),
            None => key.clone(),
        }
    }

    fn expand_map(
        &self,
        lhs: &Map,
        rhs: &Map,
        map_free_vars: bool,
        paths: Option<ObjectPathPair>,
        pending: &mut Vec<Task>,
    ) -> Expand {
        for (key, value) in lhs.iter() {
            let rhs_key = self.map_key(key, true);
            match rhs.find(rhs_key.clone()) {
                Some(rhs_value) => {
                    let child_paths = paths.as_ref().map(|p| {
                        ObjectPathPair::new(p.lhs.map_value(key.clone()), p.rhs.map_value(rhs_key))
                    });
                    self.compare_value(value, &rhs_value, map_free_vars, child_paths, pending)
                }
                None => {
                    let child_paths = paths.as_ref().map(|p| {
                        ObjectPathPair::new(p.lhs.map_value(key.clone()), p.rhs.missing_map_entry())
                    });
                    pending.push(Task::ForceFail(child_paths));
                }
            }
        }
        for key in rhs.keys() {
            let lhs_key = self.map_key(key, false);
            if lhs.contains_key(lhs_key) {
                continue;
            }
            let child_paths = paths.as_ref().map(|p| {
                ObjectPathPair::new(p.lhs.missing_map_entry(), p.rhs.map_value(key.clone()))
            });
            pending.push(Task::ForceFail(child_paths));
            break;
        }
        Expand::Queued { graph_node: false }
    }
}

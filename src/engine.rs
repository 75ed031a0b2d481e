//! Drives the frontier to exhaustion, expanding each admitted object
//! according to its species and building the reachable-memory
//! graph as it goes.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;

use crate::allocation::SharedTracker;
use crate::debugger::{DebugFrame, DebugValue, Field};
use crate::error::Error;
use crate::frontier::{FrontierQueue, Task};
use crate::graph::GraphBuilder;
use crate::identity::IdentityIndex;
use crate::record::MemoryRecord;
use crate::species::Species;
use crate::value_adapter::{to_ref, AdapterInput, RawRef};

/// Owns the frontier, identity index, allocation tracker, and graph for
/// one traversal run.
pub struct Engine {
    frontier: FrontierQueue,
    identity: IdentityIndex,
    graph: GraphBuilder,
    allocations: SharedTracker,
    /// Aliased type names already cast-and-expanded by `expand_typedef`,
    /// so a self-referential typedef chain terminates at the first
    /// re-encounter rather than recursing forever.
    seen_typedef_aliases: HashSet<String>,
}

impl Engine {
    #[must_use]
    pub fn new(allocations: SharedTracker) -> Self {
        Self {
            frontier: FrontierQueue::new(),
            identity: IdentityIndex::new(),
            graph: GraphBuilder::new(),
            allocations,
            seen_typedef_aliases: HashSet::new(),
        }
    }

    /// Seed the frontier with one root frame (: traversal begins
    /// at the stopped thread's innermost frame).
    pub fn prime(&mut self, frame: Box<dyn DebugFrame>) -> Result<(), Error> {
        let raw = to_ref(AdapterInput::Frame { frame })?;
        self.enqueue_if_new(raw, None, None);
        Ok(())
    }

    /// Drain the frontier, expanding every admitted object until none
    /// remain. Returns the number of vertices created.
    pub fn run(&mut self) -> Result<usize, Error> {
        while let Some(task) = self.frontier.dequeue() {
            self.visit(task)?;
        }
        Ok(self.graph.node_count())
    }

    #[must_use]
    pub fn graph(&self) -> &GraphBuilder {
        &self.graph
    }

    fn enqueue_if_new(
        &mut self,
        raw: RawRef,
        edge_label: Option<String>,
        parent: Option<NodeIndex>,
    ) {
        let printable = if raw.species.is_extractable() {
            raw.value.as_deref().map(DebugValue::printable)
        } else if raw.species == Species::Pointer {
            raw.value.as_deref().and_then(|v| v.string().ok())
        } else {
            None
        };
        let record = MemoryRecord::new(&raw, printable.as_deref());

        if record.is_optimized_out() {
            return;
        }
        if !self.identity.admit(&record) {
            if let Some(parent) = parent {
                if let Some(existing) = self.find_vertex(&record) {
                    self.graph
                        .add_edge(parent, existing, edge_label.unwrap_or_default());
                }
            }
            return;
        }

        let node = self.graph.add_vertex(record);
        if let Some(parent) = parent {
            self.graph.add_edge(parent, node, edge_label.unwrap_or_default());
        }
        self.frontier.enqueue(Task {
            raw,
            edge_label: None,
            parent: Some(node),
        });
    }

    /// Look up the vertex already recorded for an identity admitted on an
    /// earlier visit, so a repeat sighting (e.g. two fields pointing at the
    /// same struct) still gets an edge drawn to it.
    fn find_vertex(&self, record: &MemoryRecord) -> Option<NodeIndex> {
        let target = record.identity();
        self.graph
            .node_indices()
            .find(|&idx| self.graph.record(idx).identity() == target)
    }

    fn visit(&mut self, task: Task) -> Result<(), Error> {
        let Task { raw, parent, .. } = task;
        let Some(node) = parent else {
            return Ok(());
        };

        match raw.species {
            Species::Frame => self.expand_frame(raw, node)?,
            Species::Pointer => self.expand_pointer(raw, node),
            Species::Reference => self.expand_reference(raw, node),
            Species::Array => self.expand_array(raw, node),
            Species::Struct | Species::Union => self.expand_aggregate(raw, node),
            Species::Typedef => self.expand_typedef(raw, node),
            other if other.is_leaf() => {}
            _ => {}
        }
        Ok(())
    }

    fn expand_frame(&mut self, raw: RawRef, node: NodeIndex) -> Result<(), Error> {
        let Some(frame) = raw.frame.as_deref() else {
            return Ok(());
        };

        for (name, symbol) in frame.symbols() {
            if let Ok(value) = symbol.value(Some(frame)) {
                let child = to_ref(AdapterInput::Value {
                    value,
                    name: Some(name.clone()),
                })?;
                self.enqueue_if_new(child, Some(name), Some(node));
            }
        }

        if let Some(older) = frame.older() {
            let child = to_ref(AdapterInput::Frame { frame: older })?;
            self.enqueue_if_new(child, Some("caller".to_string()), Some(node));
        }
        Ok(())
    }

    fn expand_pointer(&mut self, raw: RawRef, node: NodeIndex) {
        let Some(value) = raw.value.as_deref() else {
            return;
        };
        if raw.target_address.is_none() {
            // Null or unreadable: the NULL flag already records this on
            // the vertex; nothing more to expand.
            return;
        }

        if let Ok(text) = value.string() {
            // Printable C string: enqueue each character as an indexed
            // element and stop (spec §4.7 pointer rule 1) rather than
            // expanding it as an ordinary pointer.
            for (i, _) in text.chars().enumerate() {
                if let Ok(element) = value.index(i as i64) {
                    let label = format!("[{i}]");
                    if let Ok(child) = to_ref(AdapterInput::Value {
                        value: element,
                        name: Some(label.clone()),
                    }) {
                        self.enqueue_if_new(child, Some(label), Some(node));
                    }
                }
            }
            return;
        }

        let Ok(target) = value.dereference() else {
            return;
        };
        let Some(target_addr) = target.address() else {
            return;
        };

        if let Some(byte_len) = self.allocations.borrow().size_of(target_addr) {
            let elem_size = target.ty().sizeof().max(1);
            let count = byte_len / elem_size;
            if let Ok(elements) = value.heap_elements(count) {
                for (i, element) in elements.into_iter().enumerate() {
                    if let Ok(child) = to_ref(AdapterInput::Value {
                        value: element,
                        name: Some(format!("[{i}]")),
                    }) {
                        self.enqueue_if_new(child, Some(format!("[{i}]")), Some(node));
                    }
                }
                return;
            }
        }

        if let Ok(child) = to_ref(AdapterInput::Value {
            value: target,
            name: None,
        }) {
            self.enqueue_if_new(child, Some("*".to_string()), Some(node));
        }
    }

    fn expand_reference(&mut self, raw: RawRef, node: NodeIndex) {
        let Some(value) = raw.value.as_deref() else {
            return;
        };
        let Ok(target) = value.dereference() else {
            return;
        };
        if let Ok(child) = to_ref(AdapterInput::Value {
            value: target,
            name: None,
        }) {
            self.enqueue_if_new(child, Some("*".to_string()), Some(node));
        }
    }

    fn expand_array(&mut self, raw: RawRef, node: NodeIndex) {
        let Some(value) = raw.value.as_deref() else {
            return;
        };
        let Some((lo, hi)) = value.ty().range() else {
            return;
        };
        for i in lo..=hi {
            if let Ok(element) = value.index(i) {
                let label = format!("[{i}]");
                if let Ok(child) = to_ref(AdapterInput::Value {
                    value: element,
                    name: Some(label.clone()),
                }) {
                    self.enqueue_if_new(child, Some(label), Some(node));
                }
            }
        }
    }

    fn expand_aggregate(&mut self, raw: RawRef, node: NodeIndex) {
        let Some(value) = raw.value.as_deref() else {
            return;
        };
        let fields: Vec<Field> = value.ty().fields();
        for field in &fields {
            if let Ok(member) = value.field(field) {
                if let Ok(child) = to_ref(AdapterInput::Value {
                    value: member,
                    name: Some(field.name.clone()),
                }) {
                    self.enqueue_if_new(child, Some(field.name.clone()), Some(node));
                }
            }
        }
    }

    /// Expand an already-admitted typedef vertex: if its aliased type name
    /// hasn't been cast-and-expanded before, cast the value to the target
    /// type and enqueue the cast value under a `cast` edge; otherwise drop,
    /// terminating a self-referential typedef chain at the first
    /// re-encounter (spec §4.7, §8 property 9).
    fn expand_typedef(&mut self, raw: RawRef, node: NodeIndex) {
        let Some(value) = raw.value.as_deref() else {
            return;
        };
        let alias_name = raw.type_name.clone().unwrap_or_default();
        if !self.seen_typedef_aliases.insert(alias_name) {
            return;
        }
        let Some(target_type) = value.ty().target() else {
            return;
        };
        let Ok(cast) = value.cast(target_type.as_ref()) else {
            return;
        };
        if let Ok(child) = to_ref(AdapterInput::Value {
            value: cast,
            name: raw.name.clone(),
        }) {
            self.enqueue_if_new(child, Some("cast".to_string()), Some(node));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::shared_tracker;
    use crate::debugger::synthetic::{frame_handle, World};

    fn engine() -> Engine {
        Engine::new(shared_tracker())
    }

    #[test]
    fn scalar_local_becomes_a_single_extra_vertex() {
        let world = World::new();
        let x = world.new_int(42);
        let frame = world.frame(0x100, 0x200, Some("main"), None, vec![("x", x)]);

        let mut eng = engine();
        eng.prime(frame_handle(frame)).unwrap();
        let vertices = eng.run().unwrap();
        // frame + x
        assert_eq!(vertices, 2);
    }

    #[test]
    fn null_pointer_has_no_children() {
        let world = World::new();
        let p = world.new_pointer(World::int_type(), None);
        let frame = world.frame(0x100, 0x200, Some("main"), None, vec![("p", p)]);

        let mut eng = engine();
        eng.prime(frame_handle(frame)).unwrap();
        let vertices = eng.run().unwrap();
        assert_eq!(vertices, 2);
        assert_eq!(eng.graph().edge_count(), 1);
    }

    #[test]
    fn pointer_to_int_adds_one_child_vertex_and_edge() {
        let world = World::new();
        let target = world.new_int(7);
        let p = world.new_pointer(World::int_type(), Some(target));
        let frame = world.frame(0x100, 0x200, Some("main"), None, vec![("p", p)]);

        let mut eng = engine();
        eng.prime(frame_handle(frame)).unwrap();
        let vertices = eng.run().unwrap();
        assert_eq!(vertices, 3);
        assert_eq!(eng.graph().edge_count(), 2);
    }

    #[test]
    fn array_expands_one_child_per_element() {
        let world = World::new();
        let a = world.new_int(1);
        let b = world.new_int(2);
        let arr = world.new_array(World::int_type(), vec![a, b]);
        let frame = world.frame(0x100, 0x200, Some("main"), None, vec![("arr", arr)]);

        let mut eng = engine();
        eng.prime(frame_handle(frame)).unwrap();
        let vertices = eng.run().unwrap();
        // frame + arr + 2 elements
        assert_eq!(vertices, 4);
    }

    #[test]
    fn cstring_pointer_expands_into_one_vertex_per_character() {
        let world = World::new();
        let s = world.new_cstring_pointer("hi");
        let frame = world.frame(0x100, 0x200, Some("main"), None, vec![("s", s)]);

        let mut eng = engine();
        eng.prime(frame_handle(frame)).unwrap();
        let vertices = eng.run().unwrap();
        // frame + s + 'h' + 'i'
        assert_eq!(vertices, 4);
        assert_eq!(eng.graph().edge_count(), 3);

        let s_record = eng
            .graph()
            .node_indices()
            .map(|idx| eng.graph().record(idx))
            .find(|r| r.name.as_deref() == Some("s"))
            .unwrap();
        assert_eq!(s_record.value_repr, "hi");
        assert!(!s_record.is_null());
    }

    #[test]
    fn revisiting_the_same_identity_draws_an_edge_without_a_new_vertex() {
        let world = World::new();
        let shared = world.new_int(99);
        let p1 = world.new_pointer(World::int_type(), Some(shared));
        let p2 = world.new_pointer(World::int_type(), Some(shared));
        let frame = world.frame(
            0x100,
            0x200,
            Some("main"),
            None,
            vec![("p1", p1), ("p2", p2)],
        );

        let mut eng = engine();
        eng.prime(frame_handle(frame)).unwrap();
        let vertices = eng.run().unwrap();
        // frame + p1 + p2 + one shared int
        assert_eq!(vertices, 4);
        // frame->p1, frame->p2, p1->int, p2->int
        assert_eq!(eng.graph().edge_count(), 4);
    }
}

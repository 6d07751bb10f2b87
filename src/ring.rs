//! Cyclic doubly-linked container over arena-backed nodes.
//!
//! Nodes live in a slot arena and link to their neighbors by slot index, so
//! the cycle needs no shared ownership and a destroyed slot stays detectable
//! until it is reused. Each arena carries one behavior implementation
//! ([`NodeHooks`]) shared by every node it hosts: value equality for
//! searches, a formatter for diagnostic listings, and the payload
//! destructor. No tail pointer and no length counter are kept; append and
//! length both walk the cycle from the entry node they are given.

use std::fmt;
use std::mem;

use thiserror::Error;

/// Copyable handle to a node slot in a [`Ring`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Behavior attached to a ring arena at construction and shared by all of
/// its nodes.
pub trait NodeHooks<T> {
    /// Value equality used by [`Ring::remove_first`].
    fn matches(&self, a: &T, b: &T) -> bool;

    /// Render one node for a diagnostic listing.
    fn describe(&self, node: NodeView<'_, T>) -> String;

    /// Consume a payload when its node is torn down. Invoked exactly once
    /// per payload, whether through removal, a drain, or dropping the
    /// arena.
    fn dispose(&self, data: T);
}

/// Read-only view of a live node, handed to [`NodeHooks::describe`].
pub struct NodeView<'a, T> {
    /// Handle of the node being described.
    pub id: NodeId,
    /// Borrowed payload.
    pub data: &'a T,
    /// Backward link, `None` only mid-drain.
    pub prev: Option<NodeId>,
    /// Forward link, `None` only mid-drain.
    pub next: Option<NodeId>,
}

/// Error for an operation that needs a live node but was handed a handle to
/// a slot that was never created, already destroyed, or severed out of its
/// cycle. Signaled before any structural mutation takes place.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RingError {
    /// The given entry handle does not refer to a live ring node.
    #[error("not a live ring node")]
    InvalidArgument,
}

struct Node<T> {
    data: T,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

enum Slot<T> {
    Vacant,
    Live(Node<T>),
}

/// Arena hosting one or more node cycles that share a single [`NodeHooks`]
/// implementation.
///
/// The arena has no distinguished head; callers keep a [`NodeId`] of their
/// own choosing as the entry into a cycle and every operation is relative
/// to the entry it is given. A cycle of one node is its own neighbor in
/// both directions. An empty arena simply has no live node to refer to.
pub struct Ring<T, H: NodeHooks<T>> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    hooks: H,
}

impl<T, H: NodeHooks<T>> Ring<T, H> {
    /// New arena with no nodes. The behavior set is fixed here and shared
    /// by every node later created in this arena.
    pub fn new(hooks: H) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            hooks,
        }
    }

    /// Start a new single-node cycle owning `data`; the node is its own
    /// `prev` and `next`.
    pub fn create(&mut self, data: T) -> NodeId {
        let id = self.alloc(Node {
            data,
            prev: None,
            next: None,
        });
        if let Some(node) = self.node_mut(id) {
            node.prev = Some(id);
            node.next = Some(id);
        }
        id
    }

    /// Splice a new node owning `data` at the end of `entry`'s cycle, just
    /// before `entry`. The tail is found by walking forward from `entry`
    /// until its `next` is `entry` again. Returns the unchanged `entry`.
    ///
    /// # Errors
    /// [`RingError::InvalidArgument`] if `entry` is not live, or if the
    /// walk runs off a severed chain. Nothing is allocated on failure.
    pub fn append(&mut self, entry: NodeId, data: T) -> Result<NodeId, RingError> {
        if !self.is_live(entry) {
            return Err(RingError::InvalidArgument);
        }
        let mut tail = entry;
        loop {
            let next = self
                .node(tail)
                .and_then(|n| n.next)
                .ok_or(RingError::InvalidArgument)?;
            if next == entry {
                break;
            }
            tail = next;
        }
        let id = self.alloc(Node {
            data,
            prev: Some(tail),
            next: Some(entry),
        });
        if let Some(t) = self.node_mut(tail) {
            t.next = Some(id);
        }
        if let Some(e) = self.node_mut(entry) {
            e.prev = Some(id);
        }
        Ok(entry)
    }

    /// Number of nodes reachable by `next` from `entry` until `entry`
    /// recurs. Walks the cycle on every call; 0 for a handle that is not
    /// live or for a chain that no longer closes.
    pub fn len(&self, entry: NodeId) -> usize {
        let Some(start) = self.node(entry) else {
            return 0;
        };
        let mut count = 1;
        let mut cur = start.next;
        while let Some(id) = cur {
            if id == entry {
                return count;
            }
            let Some(node) = self.node(id) else {
                return 0;
            };
            count += 1;
            cur = node.next;
        }
        0
    }

    /// Diagnostic listing, one line per node in `next` order starting at
    /// `entry`. A handle that is not live yields only the nil marker.
    pub fn list(&self, entry: NodeId) -> String {
        let mut out = String::new();
        let Some(first) = self.node(entry) else {
            out.push_str("-> (nil)\n");
            return out;
        };
        self.push_line(&mut out, entry, first);
        let mut cur = first.next;
        while let Some(id) = cur {
            if id == entry {
                break;
            }
            let Some(node) = self.node(id) else {
                break;
            };
            self.push_line(&mut out, id, node);
            cur = node.next;
        }
        out
    }

    /// Remove the first node from `entry` forward whose payload matches
    /// `value` under the arena's equality hook, bypassing it in its
    /// neighbors and destroying its payload.
    ///
    /// Returns the surviving entry: unchanged when nothing matched or the
    /// removed node was elsewhere in the cycle, the former `next` neighbor
    /// when `entry` itself was removed, `None` when the cycle is now empty.
    ///
    /// # Errors
    /// [`RingError::InvalidArgument`] if `entry` is not live or the search
    /// walk runs off a severed chain; the cycle is untouched on failure.
    pub fn remove_first(&mut self, entry: NodeId, value: &T) -> Result<Option<NodeId>, RingError> {
        if !self.is_live(entry) {
            return Err(RingError::InvalidArgument);
        }
        let mut cur = entry;
        let target = loop {
            let node = self.node(cur).ok_or(RingError::InvalidArgument)?;
            if self.hooks.matches(&node.data, value) {
                break cur;
            }
            let next = node.next.ok_or(RingError::InvalidArgument)?;
            if next == entry {
                return Ok(Some(entry));
            }
            cur = next;
        };
        let (prev, next) = match self.node(target) {
            Some(node) => (node.prev, node.next),
            None => return Err(RingError::InvalidArgument),
        };
        if prev == Some(target) {
            // Sole node of its cycle; the ring becomes empty.
            if let Some(node) = self.vacate(target) {
                self.hooks.dispose(node.data);
            }
            return Ok(None);
        }
        let (Some(p), Some(n)) = (prev, next) else {
            return Err(RingError::InvalidArgument);
        };
        if let Some(node) = self.node_mut(p) {
            node.next = Some(n);
        }
        if let Some(node) = self.node_mut(n) {
            node.prev = Some(p);
        }
        if let Some(node) = self.vacate(target) {
            self.hooks.dispose(node.data);
        }
        Ok(Some(if target == entry { n } else { entry }))
    }

    /// Draining primitive: destroy `entry` and return its former `next`
    /// neighbor, or `None` when the chain ends or the handle is not live.
    ///
    /// This deliberately does not bridge around the removed node. The
    /// predecessor's forward link is severed to the nil marker, so the
    /// first call on a closed cycle cuts the wrap-around edge and turns it
    /// into a finite forward chain. Only meaningful as successive steps of
    /// a full drain from one fixed starting node; for ad-hoc removal use
    /// [`Ring::remove_first`].
    pub fn free_one(&mut self, entry: NodeId) -> Option<NodeId> {
        let node = self.vacate(entry)?;
        if let Some(p) = node.prev.filter(|&p| p != entry) {
            if let Some(pred) = self.node_mut(p) {
                pred.next = None;
            }
        }
        let next = node.next.filter(|&n| n != entry);
        if let Some(n) = next {
            if let Some(succ) = self.node_mut(n) {
                succ.prev = None;
            }
        }
        self.hooks.dispose(node.data);
        next
    }

    /// Destroy every node of `entry`'s cycle by repeated [`Ring::free_one`]
    /// until the chain ends. The first step severs the wrap-around edge,
    /// so each node is visited exactly once and the loop terminates.
    pub fn free_all(&mut self, entry: NodeId) {
        let mut cur = Some(entry);
        while let Some(id) = cur {
            cur = self.free_one(id);
        }
    }

    /// Borrow the payload of a live node.
    ///
    /// # Errors
    /// [`RingError::InvalidArgument`] if `id` is not live.
    pub fn get(&self, id: NodeId) -> Result<&T, RingError> {
        self.node(id)
            .map(|n| &n.data)
            .ok_or(RingError::InvalidArgument)
    }

    /// Forward neighbor of a live node.
    ///
    /// # Errors
    /// [`RingError::InvalidArgument`] if `id` is not live or severed.
    pub fn next(&self, id: NodeId) -> Result<NodeId, RingError> {
        self.node(id)
            .and_then(|n| n.next)
            .ok_or(RingError::InvalidArgument)
    }

    /// Backward neighbor of a live node.
    ///
    /// # Errors
    /// [`RingError::InvalidArgument`] if `id` is not live or severed.
    pub fn prev(&self, id: NodeId) -> Result<NodeId, RingError> {
        self.node(id)
            .and_then(|n| n.prev)
            .ok_or(RingError::InvalidArgument)
    }

    /// Whether `id` refers to a live node.
    pub fn is_live(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    fn alloc(&mut self, node: Node<T>) -> NodeId {
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = Slot::Live(node);
            NodeId(idx)
        } else {
            self.slots.push(Slot::Live(node));
            NodeId(self.slots.len() - 1)
        }
    }

    fn node(&self, id: NodeId) -> Option<&Node<T>> {
        match self.slots.get(id.0) {
            Some(Slot::Live(node)) => Some(node),
            _ => None,
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        match self.slots.get_mut(id.0) {
            Some(Slot::Live(node)) => Some(node),
            _ => None,
        }
    }

    /// Take a node out of its slot, leaving the slot vacant and reusable.
    fn vacate(&mut self, id: NodeId) -> Option<Node<T>> {
        let slot = self.slots.get_mut(id.0)?;
        match mem::replace(slot, Slot::Vacant) {
            Slot::Live(node) => {
                self.free.push(id.0);
                Some(node)
            }
            Slot::Vacant => None,
        }
    }

    fn push_line(&self, out: &mut String, id: NodeId, node: &Node<T>) {
        out.push_str("-> ");
        out.push_str(&self.hooks.describe(NodeView {
            id,
            data: &node.data,
            prev: node.prev,
            next: node.next,
        }));
        out.push('\n');
    }
}

impl<T, H: NodeHooks<T>> Drop for Ring<T, H> {
    fn drop(&mut self) {
        // Payloads still live run through the destructor hook exactly once
        // even without an explicit drain.
        for idx in 0..self.slots.len() {
            if let Some(node) = self.vacate(NodeId(idx)) {
                self.hooks.dispose(node.data);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct TestHooks {
        disposed: Rc<RefCell<Vec<String>>>,
    }

    impl NodeHooks<String> for TestHooks {
        fn matches(&self, a: &String, b: &String) -> bool {
            a == b
        }

        fn describe(&self, node: NodeView<'_, String>) -> String {
            format!("({}) data:'{}'", node.id, node.data)
        }

        fn dispose(&self, data: String) {
            self.disposed.borrow_mut().push(data);
        }
    }

    fn ring_abc() -> (Ring<String, TestHooks>, NodeId, Rc<RefCell<Vec<String>>>) {
        let disposed = Rc::new(RefCell::new(Vec::new()));
        let mut ring = Ring::new(TestHooks {
            disposed: Rc::clone(&disposed),
        });
        let entry = ring.create("a".to_string());
        ring.append(entry, "b".to_string()).unwrap();
        ring.append(entry, "c".to_string()).unwrap();
        (ring, entry, disposed)
    }

    fn assert_mutual_inverse(ring: &Ring<String, TestHooks>, entry: NodeId) {
        let mut cur = entry;
        loop {
            let next = ring.next(cur).unwrap();
            assert_eq!(ring.prev(next).unwrap(), cur);
            assert_eq!(ring.next(ring.prev(cur).unwrap()).unwrap(), cur);
            cur = next;
            if cur == entry {
                break;
            }
        }
    }

    #[test]
    fn create_makes_self_linked_node() {
        let (mut ring, _, _) = ring_abc();
        let solo = ring.create("x".to_string());
        assert_eq!(ring.next(solo).unwrap(), solo);
        assert_eq!(ring.prev(solo).unwrap(), solo);
        assert_eq!(ring.len(solo), 1);
    }

    #[test]
    fn append_closes_the_cycle_and_keeps_entry() {
        let disposed = Rc::new(RefCell::new(Vec::new()));
        let mut ring = Ring::new(TestHooks {
            disposed: Rc::clone(&disposed),
        });
        let entry = ring.create("a".to_string());
        for s in ["b", "c", "d"] {
            let back = ring.append(entry, s.to_string()).unwrap();
            assert_eq!(back, entry);
            assert_mutual_inverse(&ring, entry);
        }
        assert_eq!(ring.len(entry), 4);
        // Following `next` exactly len times returns to the start from any node.
        let mut cur = entry;
        for _ in 0..ring.len(entry) {
            cur = ring.next(cur).unwrap();
            let mut probe = cur;
            for _ in 0..ring.len(cur) {
                probe = ring.next(probe).unwrap();
            }
            assert_eq!(probe, cur);
        }
        assert_eq!(cur, entry);
    }

    #[test]
    fn len_is_the_same_from_every_node() {
        let (ring, entry, _) = ring_abc();
        let b = ring.next(entry).unwrap();
        let c = ring.next(b).unwrap();
        assert_eq!(ring.len(entry), 3);
        assert_eq!(ring.len(b), 3);
        assert_eq!(ring.len(c), 3);
    }

    #[test]
    fn list_follows_creation_order_from_entry() {
        let (ring, entry, _) = ring_abc();
        let listing = ring.list(entry);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("data:'a'"));
        assert!(lines[1].contains("data:'b'"));
        assert!(lines[2].contains("data:'c'"));
        // From a different entry the listing rotates with the cycle.
        let b = ring.next(entry).unwrap();
        let listing = ring.list(b);
        let rotated: Vec<&str> = listing.lines().collect();
        assert!(rotated[0].contains("data:'b'"));
        assert!(rotated[2].contains("data:'a'"));
    }

    #[test]
    fn list_on_dead_handle_prints_only_nil() {
        let (mut ring, entry, _) = ring_abc();
        ring.free_all(entry);
        assert_eq!(ring.list(entry), "-> (nil)\n");
    }

    #[test]
    fn remove_first_unlinks_middle_node() {
        let (mut ring, entry, disposed) = ring_abc();
        let out = ring.remove_first(entry, &"b".to_string()).unwrap();
        assert_eq!(out, Some(entry));
        assert_eq!(ring.len(entry), 2);
        assert_mutual_inverse(&ring, entry);
        assert_eq!(*disposed.borrow(), vec!["b".to_string()]);
    }

    #[test]
    fn remove_first_of_entry_adopts_next_neighbor() {
        let (mut ring, entry, _) = ring_abc();
        let new_entry = ring.remove_first(entry, &"a".to_string()).unwrap().unwrap();
        assert_ne!(new_entry, entry);
        assert!(!ring.is_live(entry));
        assert_eq!(ring.len(new_entry), 2);
        assert_eq!(ring.get(new_entry).unwrap(), "b");
        assert_mutual_inverse(&ring, new_entry);
    }

    #[test]
    fn remove_first_empties_single_node_ring() {
        let disposed = Rc::new(RefCell::new(Vec::new()));
        let mut ring = Ring::new(TestHooks {
            disposed: Rc::clone(&disposed),
        });
        let solo = ring.create("only".to_string());
        let out = ring.remove_first(solo, &"only".to_string()).unwrap();
        assert_eq!(out, None);
        assert!(!ring.is_live(solo));
        assert_eq!(disposed.borrow().len(), 1);
    }

    #[test]
    fn remove_first_missing_value_leaves_ring_unchanged() {
        let (mut ring, entry, disposed) = ring_abc();
        let out = ring.remove_first(entry, &"zzz".to_string()).unwrap();
        assert_eq!(out, Some(entry));
        assert_eq!(ring.len(entry), 3);
        assert!(disposed.borrow().is_empty());
    }

    #[test]
    fn free_one_on_single_node_returns_none() {
        let disposed = Rc::new(RefCell::new(Vec::new()));
        let mut ring = Ring::new(TestHooks {
            disposed: Rc::clone(&disposed),
        });
        let solo = ring.create("only".to_string());
        assert_eq!(ring.free_one(solo), None);
        assert_eq!(*disposed.borrow(), vec!["only".to_string()]);
    }

    #[test]
    fn free_all_disposes_each_payload_exactly_once() {
        for n in 1..=5 {
            let disposed = Rc::new(RefCell::new(Vec::new()));
            let mut ring = Ring::new(TestHooks {
                disposed: Rc::clone(&disposed),
            });
            let entry = ring.create("n0".to_string());
            for i in 1..n {
                ring.append(entry, format!("n{i}")).unwrap();
            }
            ring.free_all(entry);
            let mut seen = disposed.borrow().clone();
            seen.sort();
            let mut want: Vec<String> = (0..n).map(|i| format!("n{i}")).collect();
            want.sort();
            assert_eq!(seen, want);
            assert_eq!(ring.len(entry), 0);
        }
    }

    #[test]
    fn operations_on_dead_handles_fail_without_allocating() {
        let (mut ring, entry, _) = ring_abc();
        ring.free_all(entry);
        assert_eq!(
            ring.append(entry, "x".to_string()),
            Err(RingError::InvalidArgument)
        );
        assert_eq!(ring.len(entry), 0);
        assert_eq!(ring.get(entry), Err(RingError::InvalidArgument));
        assert_eq!(
            ring.remove_first(entry, &"a".to_string()),
            Err(RingError::InvalidArgument)
        );
        assert_eq!(ring.free_one(entry), None);
    }

    #[test]
    fn vacated_slots_are_reused() {
        let (mut ring, entry, _) = ring_abc();
        ring.free_all(entry);
        let again = ring.create("fresh".to_string());
        assert!(ring.is_live(again));
        assert_eq!(ring.len(again), 1);
        assert_eq!(ring.get(again).unwrap(), "fresh");
    }

    #[test]
    fn drop_disposes_remaining_payloads() {
        let disposed = Rc::new(RefCell::new(Vec::new()));
        {
            let mut ring = Ring::new(TestHooks {
                disposed: Rc::clone(&disposed),
            });
            let entry = ring.create("a".to_string());
            ring.append(entry, "b".to_string()).unwrap();
            ring.remove_first(entry, &"b".to_string()).unwrap();
        }
        let mut seen = disposed.borrow().clone();
        seen.sort();
        assert_eq!(seen, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn two_independent_cycles_share_one_arena() {
        let disposed = Rc::new(RefCell::new(Vec::new()));
        let mut ring = Ring::new(TestHooks {
            disposed: Rc::clone(&disposed),
        });
        let first = ring.create("a".to_string());
        ring.append(first, "b".to_string()).unwrap();
        let second = ring.create("x".to_string());
        assert_eq!(ring.len(first), 2);
        assert_eq!(ring.len(second), 1);
        ring.free_all(second);
        assert_eq!(ring.len(first), 2);
    }
}

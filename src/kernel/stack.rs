use arrayvec::ArrayVec;

use super::{TRAVERSAL_STACK_SIZE, frame::RayFrame};
use crate::scene::PackedNodeLink;

/// Pending work of a traversal.
#[derive(Copy, Clone, Debug)]
pub(crate) enum StackEntry {
    Node(PackedNodeLink),
    /// Marks the end of an instance's subtree. Holds the frame to restore when popped.
    InstanceExit(RayFrame),
}

/// Fixed capacity traversal stack, lives on the call stack of a single query.
#[derive(Debug, Default)]
pub(crate) struct TraversalStack {
    entries: ArrayVec<StackEntry, TRAVERSAL_STACK_SIZE>,
}

impl TraversalStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Panics when the capacity is exceeded, that only happens with a malformed scene.
    #[inline]
    pub fn push(&mut self, entry: StackEntry) {
        assert!(!self.entries.is_full(), "traversal stack overflow");
        self.entries.push(entry);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<StackEntry> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scene::NodeIdx;
    use assert2::{assert, let_assert};

    fn node(i: u32) -> StackEntry {
        StackEntry::Node(PackedNodeLink::new_inner(NodeIdx::from_raw(i)))
    }

    #[test]
    fn lifo_order() {
        let mut stack = TraversalStack::new();
        stack.push(node(1));
        stack.push(node(2));
        assert!(stack.len() == 2);

        let_assert!(Some(StackEntry::Node(link)) = stack.pop());
        assert!(link == PackedNodeLink::new_inner(NodeIdx::from_raw(2)));
        let_assert!(Some(StackEntry::Node(_)) = stack.pop());
        assert!(stack.pop().is_none());
    }

    #[test]
    fn fills_to_capacity() {
        let mut stack = TraversalStack::new();
        for i in 0..TRAVERSAL_STACK_SIZE {
            stack.push(node(i as u32));
        }
        assert!(stack.len() == TRAVERSAL_STACK_SIZE);
    }

    #[test]
    #[should_panic(expected = "traversal stack overflow")]
    fn overflow_panics() {
        let mut stack = TraversalStack::new();
        for i in 0..=TRAVERSAL_STACK_SIZE {
            stack.push(node(i as u32));
        }
    }
}

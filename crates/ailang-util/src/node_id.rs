//! Core node identity (§3.1).

use std::sync::atomic::{AtomicU64, Ordering};

/// An immutable 64-bit identifier assigned by the elaborator to every Core
/// node, monotonically increasing and stable across later passes.
/// Constraint resolution (§4.7) and dictionary elaboration are keyed by it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

impl NodeId {
    pub const DUMMY: NodeId = NodeId(u64::MAX);

    pub fn is_dummy(self) -> bool {
        self == Self::DUMMY
    }
}

impl std::fmt::Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Widened from the teacher's `DefIdGenerator` (`AtomicU32`) because a
/// single elaborated program can legitimately exceed four billion nodes
/// once temporaries from deeply nested ANF normalization are counted.
pub struct NodeIdGen {
    counter: AtomicU64,
}

impl NodeIdGen {
    pub fn new() -> Self {
        NodeIdGen {
            counter: AtomicU64::new(0),
        }
    }

    pub fn next(&self) -> NodeId {
        let id = self.counter.fetch_add(1, Ordering::Relaxed);
        assert!(id != u64::MAX, "NodeId overflow: elaborated program exceeded u64 node capacity");
        NodeId(id)
    }

    pub fn count(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for NodeIdGen {
    fn default() -> Self {
        Self::new()
    }
}

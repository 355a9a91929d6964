//! Tree nodes and their per-node locks.
//!
//! A [`Node`] holds an immutable value and ordering key plus a lock that
//! guards its child links. The lock covers only this node's own
//! `left`/`right` pointers and its `detached` flag.
//!
//! # Locking
//!
//! Writers take the lock with [`Node::lock`], which returns an owned guard
//! (`ArcMutexGuard`). Because the guard owns a reference to the lock, a
//! traversal can keep a child's guard after the parent's guard is gone, and
//! can hold a parent and child guard at once without borrowing either node.
//! Guards release on drop, on every exit path.
//!
//! ```rust,ignore
//! let mut links = node.lock();
//! *links.child_mut(Side::Left) = Some(leaf);
//! // lock released when `links` drops
//! ```
//!
//! # Detachment
//!
//! A node removed from the tree has its links cleared and `detached` set
//! while its lock is held. A traversal that locks a detached node must
//! restart from the root; a detached node is never linked again.

use std::cmp::Ordering;
use std::fmt as StdFmt;
use std::sync::Arc;

use parking_lot::{ArcMutexGuard, Mutex, RawMutex};

use crate::key::{OrderingKey, Value, derive_key};

/// Shared handle to a tree node.
pub type NodeRef = Arc<Node>;

/// Owned guard over a node's links.
pub(crate) type LinksGuard = ArcMutexGuard<RawMutex, Links>;

// ============================================================================
//  Side
// ============================================================================

/// Which child slot of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    /// Direction to take from a node keyed `here` when looking for `target`.
    ///
    /// `None` means the keys are equal.
    #[inline]
    pub(crate) fn towards(target: OrderingKey, here: OrderingKey) -> Option<Self> {
        match target.cmp(&here) {
            Ordering::Less => Some(Self::Left),
            Ordering::Greater => Some(Self::Right),
            Ordering::Equal => None,
        }
    }
}

// ============================================================================
//  Links
// ============================================================================

/// Lock-protected state of a node.
#[derive(Default)]
pub(crate) struct Links {
    pub(crate) left: Option<NodeRef>,
    pub(crate) right: Option<NodeRef>,
    /// Set once the node has been unlinked from the tree.
    pub(crate) detached: bool,
}

impl Links {
    #[inline]
    pub(crate) const fn child(&self, side: Side) -> Option<&NodeRef> {
        match side {
            Side::Left => self.left.as_ref(),
            Side::Right => self.right.as_ref(),
        }
    }

    #[inline]
    pub(crate) const fn child_mut(&mut self, side: Side) -> &mut Option<NodeRef> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// Unlink both children and mark the owning node detached.
    pub(crate) fn detach(&mut self) -> (Option<NodeRef>, Option<NodeRef>) {
        debug_assert!(!self.detached, "node detached twice");
        self.detached = true;
        (self.left.take(), self.right.take())
    }
}

// ============================================================================
//  Node
// ============================================================================

/// One stored value and its position in the tree.
///
/// The key is computed once when the node is created. A node never points
/// back at its parent.
pub struct Node {
    value: Value,
    key: OrderingKey,
    links: Arc<Mutex<Links>>,
}

impl StdFmt::Debug for Node {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("Node")
            .field("key", &format_args!("{:#010x}", self.key))
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

impl Node {
    /// Create an unlinked node, deriving its key.
    #[must_use]
    pub fn new(value: Value) -> NodeRef {
        let key: OrderingKey = derive_key(&value);
        Self::with_key(value, key)
    }

    /// Create an unlinked node with a key the caller already derived.
    pub(crate) fn with_key(value: Value, key: OrderingKey) -> NodeRef {
        debug_assert_eq!(key, derive_key(&value));
        Arc::new(Self {
            value,
            key,
            links: Arc::new(Mutex::new(Links::default())),
        })
    }

    /// The stored value.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// The ordering key derived from the value at creation.
    #[inline]
    #[must_use]
    pub const fn key(&self) -> OrderingKey {
        self.key
    }

    /// Acquire this node's lock.
    #[inline]
    pub(crate) fn lock(&self) -> LinksGuard {
        self.links.lock_arc()
    }

    /// Snapshot of the left child.
    #[must_use]
    pub fn left(&self) -> Option<NodeRef> {
        self.lock().left.clone()
    }

    /// Snapshot of the right child.
    #[must_use]
    pub fn right(&self) -> Option<NodeRef> {
        self.lock().right.clone()
    }

    /// Whether this node has been removed from its tree.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.lock().detached
    }

    /// The node with the smallest key in the subtree rooted here.
    ///
    /// Follows left links, holding one lock at a time. Under concurrent
    /// deletion the result is a snapshot.
    #[must_use]
    pub fn subtree_min(self: &Arc<Self>) -> NodeRef {
        let mut current: NodeRef = Arc::clone(self);
        loop {
            let next: Option<NodeRef> = current.lock().left.clone();
            match next {
                Some(left) => current = left,
                None => return current,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_towards() {
        assert_eq!(Side::towards(1, 2), Some(Side::Left));
        assert_eq!(Side::towards(3, 2), Some(Side::Right));
        assert_eq!(Side::towards(2, 2), None);
    }

    #[test]
    fn test_new_node_is_unlinked() {
        let node = Node::new(Value::from(1));

        assert_eq!(node.key(), 873_244_444);
        assert!(node.left().is_none());
        assert!(node.right().is_none());
        assert!(!node.is_detached());
    }

    #[test]
    fn test_detach_takes_children() {
        let node = Node::new(Value::from(1));
        {
            let mut links = node.lock();
            *links.child_mut(Side::Left) = Some(Node::new(Value::from(-1)));
            *links.child_mut(Side::Right) = Some(Node::new(Value::from(2)));
        }

        let (left, right) = node.lock().detach();

        assert_eq!(left.map(|n| n.value().clone()), Some(Value::from(-1)));
        assert_eq!(right.map(|n| n.value().clone()), Some(Value::from(2)));
        assert!(node.is_detached());
        assert!(node.left().is_none());
    }

    #[test]
    fn test_guard_outlives_borrow_of_node() {
        let node = Node::new(Value::from("a"));
        let guard: LinksGuard = node.lock();
        let other: NodeRef = Arc::clone(&node);
        drop(node);

        // The guard keeps the lock alive on its own.
        assert!(guard.child(Side::Left).is_none());
        drop(guard);
        assert!(!other.is_detached());
    }

    #[test]
    fn test_subtree_min_follows_left_spine() {
        let root = Node::new(Value::from(5));
        let mid = Node::new(Value::from(3));
        let low = Node::new(Value::from(1));
        mid.lock().left = Some(Arc::clone(&low));
        root.lock().left = Some(mid);

        assert!(Arc::ptr_eq(&root.subtree_min(), &low));
        assert!(Arc::ptr_eq(&low.subtree_min(), &low));
    }
}

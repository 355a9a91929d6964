//! Locked removal for [`HashTree`].
//!
//! Implements delete and `pop_min` with a removal cursor:
//! 1. **Hand-over-hand descent**: lock the root slot, lock the child, only
//!    then release the slot above. The cursor ends holding the parent slot
//!    and the target node locked together.
//! 2. **Relink under both locks**: the target's children are taken, the
//!    target is marked detached, and the parent slot gets the replacement
//!    before either lock is released.
//!
//! # Removal cases
//!
//! ```text
//! no children      slot <- None
//! one child        slot <- child            (subtree reattached unchanged)
//! two children     slot <- successor        (successor unlinked from the
//!                                            right subtree first, then given
//!                                            the target's left and right)
//! ```
//!
//! The two-children case always splices the successor node itself, root
//! included. The removed node object is detached; the successor object
//! moves. The tree's splice count is bumped before anything is relinked.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use parking_lot::MutexGuard;

use super::HashTree;
use crate::error::TreeError;
use crate::key::{OrderingKey, Value, derive_key};
use crate::node::{LinksGuard, NodeRef, Side};
use crate::tracing_helpers::debug_log;

// ============================================================================
//  ParentSlot
// ============================================================================

/// A locked pointer slot: the tree's root slot or one side of a node.
enum ParentSlot<'t> {
    Root(MutexGuard<'t, Option<NodeRef>>),
    Child { links: LinksGuard, side: Side },
}

impl ParentSlot<'_> {
    fn get(&self) -> Option<&NodeRef> {
        match self {
            Self::Root(root) => root.as_ref(),
            Self::Child { links, side } => links.child(*side),
        }
    }

    fn set(&mut self, node: Option<NodeRef>) {
        match self {
            Self::Root(root) => **root = node,
            Self::Child { links, side } => *links.child_mut(*side) = node,
        }
    }
}

// ============================================================================
//  RemovalCursor
// ============================================================================

/// A node locked together with the slot that points at it.
struct RemovalCursor<'t> {
    slot: ParentSlot<'t>,
    node: NodeRef,
    links: LinksGuard,
}

impl RemovalCursor<'_> {
    /// Unlink the node and return it, detached.
    fn remove(mut self, splices: &AtomicU64) -> NodeRef {
        let (left, right) = self.links.detach();

        let replacement: Option<NodeRef> = match (left, right) {
            (None, None) => {
                debug_log!(key = self.node.key(), "remove: leaf");
                None
            }
            (Some(child), None) | (None, Some(child)) => {
                debug_log!(key = self.node.key(), child = child.key(), "remove: one child");
                Some(child)
            }
            (Some(left), Some(right)) => {
                splices.fetch_add(1, AtomicOrdering::SeqCst);
                let successor: NodeRef = splice_successor(left, right);
                debug_log!(
                    key = self.node.key(),
                    successor = successor.key(),
                    "remove: two children"
                );
                Some(successor)
            }
        };

        self.slot.set(replacement);
        drop(self.links);
        drop(self.slot);
        self.node
    }
}

/// Unlink the minimum of `right` and give it `left` and `right` as children.
///
/// The caller holds the lock of the node being replaced, so nothing can
/// reach `right` through the tree while the successor path is locked here.
fn splice_successor(left: NodeRef, right: NodeRef) -> NodeRef {
    let mut parent_links: LinksGuard = right.lock();

    let Some(mut successor) = parent_links.left.clone() else {
        // `right` is its own subtree's minimum and keeps its right child.
        parent_links.left = Some(left);
        drop(parent_links);
        return right;
    };

    let mut successor_links: LinksGuard = successor.lock();
    while let Some(next) = successor_links.left.clone() {
        let next_links: LinksGuard = next.lock();
        parent_links = successor_links;
        successor_links = next_links;
        successor = next;
    }

    // Successor's right subtree takes its old place.
    parent_links.left = successor_links.right.take();
    successor_links.left = Some(left);
    successor_links.right = Some(right);

    drop(successor_links);
    drop(parent_links);
    successor
}

// ============================================================================
//  HashTree removal API
// ============================================================================

impl HashTree {
    /// Lock the node holding `value` together with the slot pointing at it.
    fn seek_for_removal(&self, value: &Value) -> Result<Option<RemovalCursor<'_>>, TreeError> {
        let key: OrderingKey = derive_key(value);
        let mut slot: ParentSlot<'_> = ParentSlot::Root(self.root.lock());

        loop {
            let Some(node) = slot.get().cloned() else {
                return Ok(None);
            };
            let links: LinksGuard = node.lock();
            // A node referenced from a locked slot cannot be detached.
            debug_assert!(!links.detached);

            match Side::towards(key, node.key()) {
                Some(side) => slot = ParentSlot::Child { links, side },
                None if node.value() == value => {
                    return Ok(Some(RemovalCursor { slot, node, links }));
                }
                None => return Err(TreeError::collision(key, node.value().clone())),
            }
        }
    }

    /// Remove `value`.
    ///
    /// Returns `Ok(false)` when the value is absent; deleting an absent value
    /// is not an error.
    ///
    /// # Errors
    ///
    /// [`TreeError::CollisionMismatch`] when a node with the same key holds
    /// a different value. The tree is unchanged.
    pub fn delete(&self, value: &Value) -> Result<bool, TreeError> {
        let Some(cursor) = self.seek_for_removal(value)? else {
            return Ok(false);
        };

        cursor.remove(&self.splices);
        self.len.fetch_sub(1, AtomicOrdering::Relaxed);
        Ok(true)
    }

    /// Remove and return the value with the smallest key.
    ///
    /// Finding and removing happen in one locked descent, so concurrent
    /// callers never receive the same value.
    pub fn pop_min(&self) -> Option<Value> {
        let mut slot: ParentSlot<'_> = ParentSlot::Root(self.root.lock());

        loop {
            let node: NodeRef = Arc::clone(slot.get()?);
            let links: LinksGuard = node.lock();

            if links.left.is_some() {
                slot = ParentSlot::Child {
                    links,
                    side: Side::Left,
                };
                continue;
            }

            // No left child: always the leaf or one-child case.
            let removed: NodeRef = RemovalCursor { slot, node, links }.remove(&self.splices);
            self.len.fetch_sub(1, AtomicOrdering::Relaxed);
            return Some(removed.value().clone());
        }
    }
}

//! `HashTree` - a binary search tree ordered by derived hash keys.
//!
//! This module provides the main [`HashTree`] type and the [`Lookup`]
//! result of [`HashTree::find_with_parent`].
//!
//! # Concurrency
//!
//! All operations take `&self`. The root slot and every node carry their
//! own lock.
//!
//! - Insert and the read paths hold one lock at a time: lock a node,
//!   compare, read or set one child pointer, unlock, descend.
//! - Delete and [`HashTree::pop_min`] descend hand-over-hand and keep the
//!   parent slot locked while the target node is locked, so they always see
//!   a consistent parent/child pair (see `cursor.rs`).
//!
//! Locks are always taken root-to-leaf. A traversal that locks a node
//! already removed from the tree restarts from the root.
//!
//! # Splice count
//!
//! Removing a node with two children raises the lower bound of every node
//! on the left spine of its right subtree (the successor's old path). A
//! hand-off traversal that released its lock just before the splice can
//! then arrive at a spine node with a key that no longer belongs below it.
//! The tree counts splices; insert and the read paths load the count when
//! they start and restart if it moved before they link a new node or
//! report a miss.

use std::fmt as StdFmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};

use parking_lot::Mutex;

use crate::error::TreeError;
use crate::key::{OrderingKey, Value, derive_key};
use crate::node::{LinksGuard, Node, NodeRef, Side};
use crate::tracing_helpers::{trace_log, warn_log};

mod cursor;


// ============================================================================
//  Lookup
// ============================================================================

/// Result of [`HashTree::find_with_parent`].
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    /// The node holding the value, if present.
    pub node: Option<NodeRef>,

    /// The last node visited above `node`.
    ///
    /// When the value is absent this is the node whose empty child slot the
    /// value would occupy. `None` when the tree is empty or the match is
    /// the root.
    pub parent: Option<NodeRef>,
}

impl Lookup {
    /// Whether the value was found.
    #[inline]
    #[must_use]
    pub const fn is_found(&self) -> bool {
        self.node.is_some()
    }
}

// ============================================================================
//  HashTree
// ============================================================================

/// A concurrently mutable binary search tree keyed by FNV-1a hashes.
///
/// Not rebalanced. Node identity is not stable across deletions: removing
/// a node with two children moves its in-order successor node into its
/// place.
///
/// # Example
///
/// ```rust
/// use hashtree::{HashTree, Value};
///
/// let tree = HashTree::new();
/// for n in [5, 3, 8, 1, 4] {
///     tree.insert(n);
/// }
///
/// // The minimum is by derived key, not by numeric value.
/// assert_eq!(tree.min(), Some(Value::from(5)));
/// ```
pub struct HashTree {
    /// The root slot. Its lock plays the role of a parent lock for the root.
    root: Mutex<Option<NodeRef>>,

    /// Number of stored values.
    len: AtomicUsize,

    /// Two-children removals so far. Bumped before the successor moves.
    splices: AtomicU64,
}

impl StdFmt::Debug for HashTree {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("HashTree")
            .field("len", &self.len())
            .field("root", &self.root.lock().as_ref().map(|n: &NodeRef| n.key()))
            .finish_non_exhaustive()
    }
}

impl Default for HashTree {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HashTree {
    fn drop(&mut self) {
        // Unlink iteratively; a degenerate tree is as deep as it is long.
        let mut pending: Vec<NodeRef> = self.root.get_mut().take().into_iter().collect();
        while let Some(node) = pending.pop() {
            let mut links: LinksGuard = node.lock();
            pending.extend(links.left.take());
            pending.extend(links.right.take());
        }
    }
}

impl HashTree {
    /// Create an empty tree.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root: Mutex::new(None),
            len: AtomicUsize::new(0),
            splices: AtomicU64::new(0),
        }
    }

    /// Create a tree holding one seed value at the root.
    #[must_use]
    pub fn with_seed(value: impl Into<Value>) -> Self {
        Self {
            root: Mutex::new(Some(Node::new(value.into()))),
            len: AtomicUsize::new(1),
            splices: AtomicU64::new(0),
        }
    }

    /// Number of values stored.
    ///
    /// Exact when no operation is in flight.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len.load(AtomicOrdering::Relaxed)
    }

    /// Whether the tree has no root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.lock().is_none()
    }

    /// Snapshot of the root node.
    #[must_use]
    pub fn root(&self) -> Option<NodeRef> {
        self.root.lock().clone()
    }

    #[inline]
    fn splice_count(&self) -> u64 {
        self.splices.load(AtomicOrdering::SeqCst)
    }

    // ========================================================================
    //  Insert
    // ========================================================================

    /// Insert a value.
    ///
    /// Returns `true` if a new node was linked. Returns `false` when a node
    /// with the same key already exists; that node is left untouched whether
    /// or not its value is equal (a collision surfaces on lookup).
    pub fn insert(&self, value: impl Into<Value>) -> bool {
        let value: Value = value.into();
        let key: OrderingKey = derive_key(&value);

        'restart: loop {
            let splices: u64 = self.splice_count();
            let mut current: NodeRef = {
                let mut root = self.root.lock();
                match root.as_ref() {
                    Some(node) => Arc::clone(node),
                    None => {
                        *root = Some(Node::with_key(value, key));
                        self.len.fetch_add(1, AtomicOrdering::Relaxed);
                        return true;
                    }
                }
            };

            loop {
                let mut links: LinksGuard = current.lock();
                if links.detached {
                    trace_log!(key, node = current.key(), "insert: hit detached node, restarting");
                    continue 'restart;
                }

                let Some(side) = Side::towards(key, current.key()) else {
                    if current.value() != &value {
                        warn_log!(key, stored = %current.value(), "insert: key held by a different value");
                    }
                    return false;
                };

                let next: NodeRef = match links.child(side) {
                    Some(child) => Arc::clone(child),
                    None => {
                        if self.splice_count() != splices {
                            trace_log!(key, "insert: tree spliced during descent, restarting");
                            continue 'restart;
                        }
                        // Not reachable by anyone else until this store.
                        *links.child_mut(side) = Some(Node::with_key(value, key));
                        self.len.fetch_add(1, AtomicOrdering::Relaxed);
                        return true;
                    }
                };

                drop(links);
                current = next;
            }
        }
    }

    // ========================================================================
    //  Lookup
    // ========================================================================

    /// Find the node holding `value` and the node above it.
    ///
    /// # Errors
    ///
    /// [`TreeError::CollisionMismatch`] when a node with the same key holds
    /// a different value.
    pub fn find_with_parent(&self, value: &Value) -> Result<Lookup, TreeError> {
        let key: OrderingKey = derive_key(value);

        'restart: loop {
            let splices: u64 = self.splice_count();
            let Some(mut current) = self.root() else {
                return Ok(Lookup::default());
            };
            let mut parent: Option<NodeRef> = None;

            loop {
                let links: LinksGuard = current.lock();
                if links.detached {
                    trace_log!(key, node = current.key(), "find: hit detached node, restarting");
                    continue 'restart;
                }

                let Some(side) = Side::towards(key, current.key()) else {
                    drop(links);
                    if current.value() != value {
                        return Err(TreeError::collision(key, current.value().clone()));
                    }
                    return Ok(Lookup {
                        node: Some(current),
                        parent,
                    });
                };

                let next: Option<NodeRef> = links.child(side).cloned();
                drop(links);

                match next {
                    Some(child) => {
                        parent = Some(current);
                        current = child;
                    }
                    None if self.splice_count() != splices => continue 'restart,
                    None => {
                        return Ok(Lookup {
                            node: None,
                            parent: Some(current),
                        });
                    }
                }
            }
        }
    }

    /// Whether `value` is stored.
    ///
    /// # Errors
    ///
    /// [`TreeError::CollisionMismatch`] as for [`find_with_parent`](Self::find_with_parent).
    pub fn find(&self, value: &Value) -> Result<bool, TreeError> {
        self.find_with_parent(value).map(|lookup: Lookup| lookup.is_found())
    }

    /// Lossy convenience over [`find`](Self::find): any error reads as
    /// `false`.
    ///
    /// A `false` here does not distinguish "absent" from "another value
    /// holds this key". Use `find` when that matters.
    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        matches!(self.find(value), Ok(true))
    }

    // ========================================================================
    //  Minimum
    // ========================================================================

    /// The node with the smallest key, or `None` for an empty tree.
    #[must_use]
    pub fn min_node(&self) -> Option<NodeRef> {
        'restart: loop {
            let splices: u64 = self.splice_count();
            let mut current: NodeRef = self.root()?;
            loop {
                let links: LinksGuard = current.lock();
                if links.detached {
                    continue 'restart;
                }
                let Some(left) = links.left.clone() else {
                    drop(links);
                    if self.splice_count() != splices {
                        continue 'restart;
                    }
                    return Some(current);
                };
                drop(links);
                current = left;
            }
        }
    }

    /// The value with the smallest key, or `None` for an empty tree.
    #[must_use]
    pub fn min(&self) -> Option<Value> {
        self.min_node().map(|node: NodeRef| node.value().clone())
    }

    // ========================================================================
    //  Whole-tree walks
    // ========================================================================

    /// Snapshot of all values in ascending key order.
    ///
    /// Each node is locked briefly; under concurrent mutation the result
    /// mixes states from different moments.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        let mut out: Vec<Value> = Vec::with_capacity(self.len());
        let mut stack: Vec<NodeRef> = Vec::new();
        let mut current: Option<NodeRef> = self.root();

        loop {
            while let Some(node) = current {
                current = node.left();
                stack.push(node);
            }
            let Some(node) = stack.pop() else {
                break;
            };
            out.push(node.value().clone());
            current = node.right();
        }
        out
    }

    /// Number of nodes on the longest root-to-leaf path (0 when empty).
    #[must_use]
    pub fn height(&self) -> usize {
        let mut deepest: usize = 0;
        let mut stack: Vec<(NodeRef, usize)> = self.root().into_iter().map(|n| (n, 1)).collect();

        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            let links: LinksGuard = node.lock();
            stack.extend(links.left.iter().map(|n| (Arc::clone(n), depth + 1)));
            stack.extend(links.right.iter().map(|n| (Arc::clone(n), depth + 1)));
        }
        deepest
    }

    /// Verify the search-tree invariant over the whole tree.
    ///
    /// Every key must lie strictly between the bounds set by its ancestors,
    /// which also rules out repeated keys, and no reachable node may be
    /// detached. Returns the number of reachable nodes.
    ///
    /// Meant for tests and diagnostics on a quiescent tree.
    ///
    /// # Errors
    ///
    /// [`TreeError::InvariantViolation`] naming the first offending key.
    pub fn check_invariants(&self) -> Result<usize, TreeError> {
        type Bound = Option<OrderingKey>;

        let mut stack: Vec<(NodeRef, Bound, Bound)> =
            self.root().into_iter().map(|n| (n, None, None)).collect();
        let mut count: usize = 0;

        while let Some((node, low, high)) = stack.pop() {
            let key: OrderingKey = node.key();

            if low.is_some_and(|low| key <= low) || high.is_some_and(|high| key >= high) {
                return Err(TreeError::InvariantViolation {
                    key,
                    reason: "key outside the range set by its ancestors",
                });
            }
            if key != derive_key(node.value()) {
                return Err(TreeError::InvariantViolation {
                    key,
                    reason: "stored key does not match the value's hash",
                });
            }

            let links: LinksGuard = node.lock();
            if links.detached {
                return Err(TreeError::InvariantViolation {
                    key,
                    reason: "detached node reachable from the root",
                });
            }
            if let Some(left) = &links.left {
                stack.push((Arc::clone(left), low, Some(key)));
            }
            if let Some(right) = &links.right {
                stack.push((Arc::clone(right), Some(key), high));
            }
            count += 1;
        }

        Ok(count)
    }
}

//! Priority queue built from one [`HashTree`] per priority level.
//!
//! Lower priority numbers are served first. Within one level the order is
//! the tree's key order, not insertion order.
//!
//! ```rust
//! use hashtree::{PriorityQueue, Value};
//!
//! let queue = PriorityQueue::new();
//! queue.push("later", 5);
//! queue.push("sooner", 1);
//!
//! assert_eq!(queue.pop(), Some(Value::from("sooner")));
//! assert_eq!(queue.pop(), Some(Value::from("later")));
//! assert_eq!(queue.pop(), None);
//! ```

use std::collections::BTreeMap;
use std::fmt as StdFmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::key::Value;
use crate::tracing_helpers::trace_log;
use crate::tree::HashTree;

/// A priority level.
pub type Priority = i64;

/// Min-priority queue whose levels are hash-ordered trees.
///
/// Levels are created on first push and kept after they empty.
#[derive(Default)]
pub struct PriorityQueue {
    levels: RwLock<BTreeMap<Priority, Arc<HashTree>>>,
}

impl StdFmt::Debug for PriorityQueue {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_map()
            .entries(self.levels.read().iter().map(|(p, tree)| (*p, tree.len())))
            .finish()
    }
}

impl PriorityQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The tree for `priority`, created if missing.
    fn level(&self, priority: Priority) -> Arc<HashTree> {
        if let Some(tree) = self.levels.read().get(&priority) {
            return Arc::clone(tree);
        }

        let mut levels = self.levels.write();
        Arc::clone(levels.entry(priority).or_insert_with(|| {
            trace_log!(priority, "queue: new level");
            Arc::new(HashTree::new())
        }))
    }

    /// Add `value` at `priority`.
    ///
    /// Returns `false` when that level already holds a value with the same
    /// ordering key (equal or colliding); the queue is then unchanged.
    pub fn push(&self, value: impl Into<Value>, priority: Priority) -> bool {
        self.level(priority).insert(value)
    }

    /// Remove and return a value from the lowest non-empty level.
    pub fn pop(&self) -> Option<Value> {
        self.pop_entry().map(|(_, value)| value)
    }

    /// Like [`pop`](Self::pop), also returning the level it came from.
    pub fn pop_entry(&self) -> Option<(Priority, Value)> {
        let levels = self.levels.read();
        levels
            .iter()
            .find_map(|(priority, tree)| tree.pop_min().map(|value: Value| (*priority, value)))
    }

    /// The value [`pop`](Self::pop) would return next, without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<(Priority, Value)> {
        let levels = self.levels.read();
        levels
            .iter()
            .find_map(|(priority, tree)| tree.min().map(|value: Value| (*priority, value)))
    }

    /// Total number of queued values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.read().values().map(|tree| tree.len()).sum()
    }

    /// Whether every level is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.read().values().all(|tree| tree.is_empty())
    }

    /// Priority levels that have been created, ascending. Includes emptied
    /// levels.
    #[must_use]
    pub fn levels(&self) -> Vec<Priority> {
        self.levels.read().keys().copied().collect()
    }
}

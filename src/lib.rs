//! # `hashtree`
//!
//! A concurrently mutable binary search tree ordered by content hash.
//!
//! Values are not ordered by a comparator. Each value is rendered to a
//! canonical string and hashed with FNV-1a (32-bit); the hash is the
//! ordering key. Two unequal values that share a key are a detected error
//! ([`TreeError::CollisionMismatch`]), never stored twice.
//!
//! | Operation | Locking |
//! |-----------|---------|
//! | insert | per-node lock, released before descending |
//! | find / contains / min | per-node lock, released before descending |
//! | delete / `pop_min` | hand-over-hand (parent slot held while child is locked) |
//!
//! A [`PriorityQueue`] keeps one [`HashTree`] per integer priority level and
//! serves the lowest level first. [`GapBuffer`] and the [`frequency`]
//! helpers are small text utilities; `frequency::seed_tree` builds a tree
//! from the characters of a text.
//!
//! ## Example
//!
//! ```rust
//! use hashtree::{HashTree, Value};
//!
//! let tree = HashTree::with_seed(1);
//! assert!(tree.insert(2));
//! assert!(tree.insert("hello"));
//!
//! assert!(tree.contains(&Value::from(2)));
//! assert_eq!(tree.delete(&Value::from(2)), Ok(true));
//! assert!(!tree.contains(&Value::from(2)));
//! ```
//!
//! ## Non-goals
//!
//! The tree is never rebalanced. Adversarial hash order degrades it to a
//! linked list.

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod tracing_helpers;

pub mod error;
pub mod frequency;
pub mod gap_buffer;
pub mod key;
pub mod node;
pub mod queue;
pub mod tree;

pub use error::TreeError;
pub use gap_buffer::GapBuffer;
pub use key::{OrderingKey, Value, derive_key, derive_key_any};
pub use node::{Node, NodeRef};
pub use queue::PriorityQueue;
pub use tree::{HashTree, Lookup};

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; only the first call installs anything.
/// Defaults to `info` when `RUST_LOG` is unset.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter: EnvFilter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_target(true)
                .compact(),
        )
        .with(filter)
        .try_init();
}

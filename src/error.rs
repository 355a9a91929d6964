//! Errors returned by tree and queue operations.
//!
//! Every failure is local to the call that raised it and deterministic for
//! the same inputs, so there is no retry policy.

use std::fmt as StdFmt;

use crate::key::{OrderingKey, Value};

/// Errors that can occur while converting, looking up, or removing values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The value is not text, an integer, or a 64-bit float, so no ordering
    /// key can be derived for it.
    UnsupportedValueKind {
        /// Rust type name of the rejected value.
        type_name: &'static str,
    },

    /// A node with the same ordering key holds a different value.
    ///
    /// The tree never stores two values under one key, so the queried value
    /// cannot be present.
    CollisionMismatch {
        /// The shared ordering key.
        key: OrderingKey,
        /// The value already stored under `key`.
        stored: Value,
    },

    /// A structural check found a node out of key order, a repeated key, or
    /// a detached node still reachable from the root.
    InvariantViolation {
        /// Key of the offending node.
        key: OrderingKey,
        /// Which invariant was broken.
        reason: &'static str,
    },
}

impl TreeError {
    pub(crate) const fn collision(key: OrderingKey, stored: Value) -> Self {
        Self::CollisionMismatch { key, stored }
    }
}

impl StdFmt::Display for TreeError {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::UnsupportedValueKind { type_name } => {
                write!(f, "cannot derive an ordering key for a value of type `{type_name}`")
            }

            Self::CollisionMismatch { key, stored } => {
                write!(
                    f,
                    "found matching hash {key:#010x} with different value: {stored}"
                )
            }

            Self::InvariantViolation { key, reason } => {
                write!(f, "invariant violated at key {key:#010x}: {reason}")
            }
        }
    }
}

impl std::error::Error for TreeError {}

//! Shared helpers for integration tests: tracing setup, workload sizing
//! and tree checks.
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//!
//! #[test]
//! fn my_test() {
//!     common::init_tracing();
//!     let config = common::StressConfig::from_env();
//!     // ...
//! }
//! ```
//!
//! # Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Filter directives (e.g., `hashtree=debug,hashtree::tree=trace`)
//! - `HASHTREE_LOG_DIR`: Log directory (default: `logs/`)
//! - `HASHTREE_LOG_CONSOLE`: Set to "0" to disable console output
//! - `HASHTREE_THREADS`: Worker threads for concurrent tests (default: 8)
//! - `HASHTREE_VALUES`: Values per concurrent test (default: 4000)
//!
//! # Log Files
//!
//! Logs are appended to `logs/hashtree.jsonl` as newline-delimited JSON.
//! The library only emits events when built with `--features tracing`.
//!
//! ```bash
//! # Restarts caused by concurrent deletes
//! cat logs/hashtree.jsonl | jq 'select(.fields.message | test("restarting"))'
//!
//! # Events for one ordering key
//! cat logs/hashtree.jsonl | jq 'select(.fields.key == 923577301)'
//! ```

#![allow(dead_code)]

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Once;

use hashtree::{HashTree, Value, derive_key};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

// ============================================================================
//  Tracing
// ============================================================================

static INIT: Once = Once::new();

/// Install console and file logging. Only the first call does anything.
pub fn init_tracing() {
    INIT.call_once(setup_tracing);
}

/// Where and how test logs are written.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Directory for log files.
    pub log_dir: PathBuf,
    /// Log file name.
    pub log_file: String,
    /// Enable console output.
    pub console_enabled: bool,
    /// Default log level if `RUST_LOG` is not set.
    pub default_level: Level,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            log_file: "hashtree.jsonl".to_string(),
            console_enabled: true,
            default_level: Level::INFO,
        }
    }
}

impl TracingConfig {
    /// Read overrides from `HASHTREE_LOG_DIR` and `HASHTREE_LOG_CONSOLE`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = env::var("HASHTREE_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        if env::var("HASHTREE_LOG_CONSOLE").is_ok_and(|v| v == "0") {
            config.console_enabled = false;
        }

        config
    }
}

fn make_filter(default_level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.to_string()))
}

#[expect(clippy::expect_used)]
fn setup_tracing() {
    let config = TracingConfig::from_env();

    std::fs::create_dir_all(&config.log_dir).expect("Failed to create log directory");

    // Append: test binaries run in separate processes.
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_dir.join(&config.log_file))
        .expect("Failed to open log file");

    let console_layer = config.console_enabled.then(|| {
        tracing_subscriber::fmt::layer()
            .with_thread_ids(true)
            .with_target(true)
            .with_line_number(true)
            .compact()
            .with_filter(make_filter(config.default_level))
    });

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::sync::Mutex::new(file))
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_filter(make_filter(config.default_level));

    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

// ============================================================================
//  Workload sizing
// ============================================================================

/// Thread and value counts for concurrent tests.
#[derive(Debug, Clone, Copy)]
pub struct StressConfig {
    /// Worker threads.
    pub threads: usize,
    /// Values spread across the workers.
    pub values: usize,
}

impl StressConfig {
    /// Read `HASHTREE_THREADS` and `HASHTREE_VALUES`, ignoring unparsable or
    /// zero settings.
    pub fn from_env() -> Self {
        fn read(name: &str, default: usize) -> usize {
            env::var(name)
                .ok()
                .and_then(|raw| raw.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(default)
        }

        Self {
            threads: read("HASHTREE_THREADS", 8),
            values: read("HASHTREE_VALUES", 4_000),
        }
    }

    /// Values handled by each thread.
    pub fn per_thread(&self) -> usize {
        self.values.div_ceil(self.threads)
    }
}

// ============================================================================
//  Tree checks
// ============================================================================

/// Assert the search-tree invariant holds and the tree holds exactly
/// `expected`, in key order.
pub fn assert_tree_holds(tree: &HashTree, expected: &[Value]) {
    let mut sorted: Vec<Value> = expected.to_vec();
    sorted.sort_by_key(derive_key);

    assert_eq!(tree.check_invariants(), Ok(sorted.len()));
    assert_eq!(tree.len(), sorted.len());
    assert_eq!(tree.values(), sorted);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_init() {
        init_tracing();
        tracing::info!("Tracing initialized successfully");
        tracing::debug!(key = 923_577_301_u32, value = "2", "Debug event");
    }
}

//! Diagnostics binary for concurrent tree and queue workloads.
//!
//! Runs insert, mixed insert/delete and queue drain workloads across threads,
//! then verifies the tree's invariants. A watchdog reports stalls.
//!
//! Run with:
//! ```bash
//! HASHTREE_THREADS=8 HASHTREE_VALUES=50000 RUST_LOG=hashtree=debug \
//!     cargo run --release --features tracing
//! ```

#![allow(
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]

use std::collections::HashSet;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use hashtree::{HashTree, PriorityQueue, TreeError, Value};

const DEFAULT_THREADS: usize = 8;
const DEFAULT_VALUES: usize = 20_000;

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|raw: String| raw.parse().ok())
        .filter(|n: &usize| *n > 0)
        .unwrap_or(default)
}

fn banner(title: &str) {
    println!("\n{}", "=".repeat(80));
    println!("{title}");
    println!("{}", "=".repeat(80));
}

// =============================================================================
// Watchdog
// =============================================================================

/// Reports when no worker finishes an operation for two seconds.
struct Watchdog {
    ops: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

impl Watchdog {
    fn start(label: &'static str) -> Self {
        let ops = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let ops = Arc::clone(&ops);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut last_seen: usize = 0;
                let mut last_change = Instant::now();
                while !stop.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(250));
                    let seen = ops.load(Ordering::Relaxed);
                    if seen != last_seen {
                        last_seen = seen;
                        last_change = Instant::now();
                    } else if last_change.elapsed() > Duration::from_secs(2) {
                        eprintln!(
                            "!!! STUCK: {label} made no progress for {:?} at op {seen}",
                            last_change.elapsed()
                        );
                    }
                }
            })
        };

        Self { ops, stop, handle }
    }

    fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.ops)
    }

    fn finish(self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.handle.join();
    }
}

fn check_tree(label: &str, tree: &HashTree, expected: usize) -> Result<(), String> {
    match tree.check_invariants() {
        Ok(count) if count == expected && tree.len() == expected => Ok(()),
        Ok(count) => Err(format!(
            "{label}: expected {expected} nodes, found {count} (len() = {})",
            tree.len()
        )),
        Err(e) => Err(format!("{label}: {e}")),
    }
}

// =============================================================================
// Workload 1: disjoint inserts
// =============================================================================

fn run_disjoint_inserts(threads: usize, per_thread: usize) -> Result<(), String> {
    banner(&format!("DISJOINT INSERTS ({threads} threads, {per_thread} values/thread)"));

    let tree = Arc::new(HashTree::new());
    let watchdog = Watchdog::start("disjoint inserts");
    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let tree = Arc::clone(&tree);
            let ops = watchdog.counter();
            thread::spawn(move || {
                let base = t * per_thread;
                for i in base..base + per_thread {
                    tree.insert(i as i64);
                    ops.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().map_err(|_| "insert worker panicked".to_string())?;
    }
    watchdog.finish();

    let elapsed = start.elapsed();
    let total = threads * per_thread;
    println!(
        "done: {total} inserts in {elapsed:?} ({:.0} ops/sec), height {}",
        total as f64 / elapsed.as_secs_f64(),
        tree.height()
    );
    check_tree("disjoint inserts", &tree, total)
}

// =============================================================================
// Workload 2: inserts racing deletes
// =============================================================================

fn run_insert_delete(threads: usize, per_thread: usize) -> Result<(), String> {
    banner(&format!("INSERT + DELETE ({threads} threads, {per_thread} values/thread)"));

    // Even values are present up front and deleted; odd values are inserted.
    let total = threads * per_thread;
    let tree = Arc::new(HashTree::new());
    for n in (0..total).step_by(2) {
        tree.insert(n as i64);
    }

    let watchdog = Watchdog::start("insert + delete");
    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let tree = Arc::clone(&tree);
            let ops = watchdog.counter();
            thread::spawn(move || -> Result<(), TreeError> {
                let base = t * per_thread;
                for i in base..base + per_thread {
                    let value = Value::from(i as i64);
                    if i % 2 == 0 {
                        tree.delete(&value)?;
                    } else {
                        tree.insert(value);
                    }
                    ops.fetch_add(1, Ordering::Relaxed);
                }
                Ok(())
            })
        })
        .collect();
    for handle in handles {
        handle
            .join()
            .map_err(|_| "insert/delete worker panicked".to_string())?
            .map_err(|e| e.to_string())?;
    }
    watchdog.finish();

    println!("done: {total} ops in {:?}", start.elapsed());

    let odd = total / 2;
    check_tree("insert + delete", &tree, odd)?;
    let present: HashSet<Value> = tree.values().into_iter().collect();
    if let Some(n) = (0..total).find(|n| present.contains(&Value::from(*n as i64)) == (n % 2 == 0)) {
        return Err(format!("insert + delete: value {n} in the wrong state"));
    }
    Ok(())
}

// =============================================================================
// Workload 3: queue drain
// =============================================================================

fn run_queue_drain(threads: usize, values: usize) -> Result<(), String> {
    banner(&format!("QUEUE DRAIN ({threads} poppers, {values} values)"));

    let queue = Arc::new(PriorityQueue::new());
    for n in 0..values {
        queue.push(n as i64, (n % 16) as i64);
    }

    let watchdog = Watchdog::start("queue drain");
    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let ops = watchdog.counter();
            thread::spawn(move || {
                let mut popped: Vec<Value> = Vec::new();
                while let Some(value) = queue.pop() {
                    popped.push(value);
                    ops.fetch_add(1, Ordering::Relaxed);
                }
                popped
            })
        })
        .collect();

    let mut seen: HashSet<Value> = HashSet::with_capacity(values);
    for handle in handles {
        let popped = handle.join().map_err(|_| "pop worker panicked".to_string())?;
        for value in popped {
            if !seen.insert(value.clone()) {
                return Err(format!("queue drain: {value} popped twice"));
            }
        }
    }
    watchdog.finish();

    println!("done: {} pops in {:?}", seen.len(), start.elapsed());
    if seen.len() != values || !queue.is_empty() {
        return Err(format!("queue drain: popped {} of {values}", seen.len()));
    }
    Ok(())
}

// =============================================================================
// Main
// =============================================================================

fn main() {
    #[cfg(feature = "tracing")]
    hashtree::init_tracing();

    let threads = env_usize("HASHTREE_THREADS", DEFAULT_THREADS);
    let values = env_usize("HASHTREE_VALUES", DEFAULT_VALUES);
    let per_thread = values.div_ceil(threads);

    eprintln!("hashtree concurrency diagnostics");
    eprintln!("================================");
    eprintln!("Watchdog will report any workload stalled for >2 seconds.");

    let results = [
        run_disjoint_inserts(threads, per_thread),
        run_insert_delete(threads, per_thread),
        run_queue_drain(threads, values),
    ];

    let mut failed = false;
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        eprintln!("FAILED: {err}");
        failed = true;
    }
    if failed {
        process::exit(1);
    }
    eprintln!("\nAll workloads passed.");
}

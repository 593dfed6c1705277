#![forbid(unsafe_code)]

//! E2E tests for the full binding pipeline.
//!
//! Validates that:
//! 1. A producer thread drives a kernel, through a format, into a
//!    presenter, with the expected final value.
//! 2. Producer failures are absorbed mid-stream and surfaced through the
//!    error sink without disturbing the presented value.
//! 3. Revoking an attachment stops a long-running producer's effect while
//!    retaining already-applied updates.
//! 4. A register roster streams complete snapshots, one per mutation.
//! 5. Concurrent producers race to a last-write-wins outcome.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use lode_bind::dispatch::{DispatchThread, InlineDispatcher};
use lode_bind::{Format, Manager};
use lode_core::{Connector, ErrorSink, Feed, Kernel, Register, SetValueConnector};

// ============================================================================
// Helpers
// ============================================================================

/// A producer that pushes its script from a background thread.
struct Background {
    script: Vec<Result<Option<u32>, String>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Background {
    fn new(script: Vec<Result<Option<u32>, String>>) -> Self {
        Self {
            script,
            worker: Mutex::new(None),
        }
    }

    fn join(&self) {
        if let Some(worker) = self.worker.lock().unwrap().take() {
            worker.join().unwrap();
        }
    }
}

impl Connector for Background {
    type Elem = u32;

    fn connect(&self, feed: Feed<u32>) {
        let script = self.script.clone();
        let worker = thread::spawn(move || {
            for item in script {
                feed.accept(item.map_err(Into::into));
            }
        });
        *self.worker.lock().unwrap() = Some(worker);
    }
}

/// Poll until `probe` succeeds or a generous deadline passes.
fn wait_until(probe: impl Fn() -> bool) {
    for _ in 0..400 {
        if probe() {
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("condition never became true");
}

fn set(kernel: &Kernel<u32>, value: Option<u32>) {
    let _ = kernel.attach(&SetValueConnector::new(value));
}

// ============================================================================
// 1. Producer thread → kernel → format → presenter
// ============================================================================

#[test]
fn producer_to_presenter_pipeline() {
    let kernel: Kernel<u32> = Kernel::new();
    let label = Format::new(|n: &u32| format!("value={n}"));
    let display = label.apply(&kernel);

    let manager = Manager::new();
    manager.present(&display, Arc::new(DispatchThread::start()));

    let producer = Background::new(vec![Ok(Some(1)), Ok(Some(2)), Ok(Some(3))]);
    let _ = kernel.attach(&producer);
    producer.join();

    assert_eq!(kernel.current(), Some(3));
    assert_eq!(display.current(), Some("value=3".to_owned()));
    wait_until(|| manager.value() == Some("value=3".to_owned()));
}

// ============================================================================
// 2. Mid-stream failure: absorbed, surfaced, value retained
// ============================================================================

#[test]
fn failure_is_absorbed_and_surfaced() {
    let kernel: Kernel<u32> = Kernel::new();
    let faults = Arc::new(Mutex::new(Vec::new()));

    let producer = Background::new(vec![
        Ok(Some(10)),
        Ok(Some(20)),
        Err("upstream gone".to_owned()),
        Err("still gone".to_owned()),
    ]);
    let sink = Arc::clone(&faults);
    let _ = kernel.attach_observed(
        &producer,
        ErrorSink::new(move |fault| {
            sink.lock().unwrap().push(fault.to_string());
        }),
    );
    producer.join();

    // The second success survived both failures, and only the first
    // failure reached the one-shot sink.
    assert_eq!(kernel.current(), Some(20));
    assert_eq!(*faults.lock().unwrap(), vec!["upstream gone".to_owned()]);
}

// ============================================================================
// 3. Revocation stops the stream, keeps applied updates
// ============================================================================

#[test]
fn revocation_stops_further_updates() {
    struct Endless {
        applied: Arc<AtomicUsize>,
    }

    impl Connector for Endless {
        type Elem = u32;

        fn connect(&self, feed: Feed<u32>) {
            let applied = Arc::clone(&self.applied);
            thread::spawn(move || {
                let mut n = 0u32;
                while feed.is_live() {
                    feed.accept(Ok(Some(n)));
                    applied.fetch_add(1, Ordering::SeqCst);
                    n += 1;
                    thread::sleep(Duration::from_millis(1));
                }
            });
        }
    }

    let kernel: Kernel<u32> = Kernel::new();
    let applied = Arc::new(AtomicUsize::new(0));
    let cancellation = kernel.attach(&Endless {
        applied: Arc::clone(&applied),
    });

    wait_until(|| applied.load(Ordering::SeqCst) >= 3);
    cancellation.cancel();

    let frozen = kernel.current();
    assert!(frozen.is_some());
    thread::sleep(Duration::from_millis(20));
    assert_eq!(kernel.current(), frozen);
}

// ============================================================================
// 4. Register roster streams snapshots
// ============================================================================

#[test]
fn register_roster_streams_snapshots() {
    let roster: Register<u32> = Register::new();
    let snapshots = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&snapshots);
    let _sub = roster.subscribe(move |snapshot| {
        let mut snapshot = snapshot.to_vec();
        snapshot.sort_unstable();
        sink.lock().unwrap().push(snapshot);
    });

    roster.upsert(2);
    roster.upsert(1);
    roster.remove(&2);
    roster.clear();

    assert_eq!(
        *snapshots.lock().unwrap(),
        vec![vec![], vec![2], vec![1, 2], vec![1], vec![]],
    );
}

// ============================================================================
// 5. Concurrent producers: last write wins
// ============================================================================

#[test]
fn concurrent_producers_race_to_last_write() {
    let kernel: Kernel<u32> = Kernel::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = kernel.subscribe(move |v| {
        if let Some(v) = v {
            sink.lock().unwrap().push(*v);
        }
    });

    let left = Background::new((0..50).map(|n| Ok(Some(n))).collect());
    let right = Background::new((100..150).map(|n| Ok(Some(n))).collect());
    let _ = kernel.attach(&left);
    let _ = kernel.attach(&right);
    left.join();
    right.join();

    // Whichever producer pushed last owns the final value, and its final
    // emission is one of the two scripts' tails.
    let current = kernel.current().unwrap();
    assert!(current == 49 || current == 149);
    assert_eq!(kernel.current().unwrap(), *seen.lock().unwrap().last().unwrap());

    // Per-producer order was preserved even under interleaving.
    let seen = seen.lock().unwrap();
    let lows: Vec<u32> = seen.iter().copied().filter(|n| *n < 100).collect();
    let highs: Vec<u32> = seen.iter().copied().filter(|n| *n >= 100).collect();
    assert_eq!(lows, (0..50).collect::<Vec<_>>());
    assert_eq!(highs, (100..150).collect::<Vec<_>>());
}

// ============================================================================
// Presenter dedup across the pipeline
// ============================================================================

#[test]
fn pipeline_dedups_at_the_presenter() {
    let kernel: Kernel<u32> = Kernel::new();
    let parity = Format::new(|n: &u32| n % 2 == 0);
    let display = parity.apply(&kernel);

    let manager = Manager::new();
    manager.present(&display, Arc::new(InlineDispatcher));

    let notifications = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notifications);
    let _sub = manager.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    notifications.store(0, Ordering::SeqCst);

    // Four updates, but the mapped parity only changes twice.
    set(&kernel, Some(2));
    set(&kernel, Some(4));
    set(&kernel, Some(5));
    set(&kernel, Some(7));

    // true (from 2), then false (from 5); 4 and 7 are duplicates.
    assert_eq!(notifications.load(Ordering::SeqCst), 2);
}

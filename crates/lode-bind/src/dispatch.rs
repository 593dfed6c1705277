#![forbid(unsafe_code)]

//! Delivery contexts for presentation updates.
//!
//! The core makes no thread guarantees: observers run wherever the
//! producing side happens to be. A [`Dispatcher`] re-delivers presentation
//! work on whatever context a consumer requires. Two implementations are
//! provided:
//!
//! - [`InlineDispatcher`] runs tasks on the calling thread. This is the
//!   default and costs nothing.
//! - [`DispatchThread`] owns a dedicated delivery thread and a bounded
//!   queue. Every task submitted through it executes on that one thread,
//!   in submission order: the single-writer discipline UI toolkits tend
//!   to demand.
//!
//! # Invariants
//!
//! 1. `DispatchThread` tasks run in submission order, all on the delivery
//!    thread.
//! 2. [`DispatchThread::shutdown`] drains every task accepted before the
//!    shutdown request, then joins the thread.
//! 3. Tasks submitted after shutdown are dropped (with a debug log), never
//!    run on the caller.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

/// Capacity of the delivery queue.
///
/// Bounded so a stalled delivery thread applies backpressure to producers
/// rather than accumulating unbounded memory.
const QUEUE_CAPACITY: usize = 256;

/// A unit of presentation work.
pub type Task = Box<dyn FnOnce() + Send>;

/// Re-delivers tasks on a consumer-chosen context.
pub trait Dispatcher: Send + Sync {
    /// Submit a task for execution on this dispatcher's context.
    fn dispatch(&self, task: Task);
}

/// Runs each task immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, task: Task) {
        task();
    }
}

enum Msg {
    Run(Task),
    Shutdown,
}

/// A dedicated delivery thread.
///
/// ```
/// use lode_bind::dispatch::{Dispatcher, DispatchThread};
///
/// let delivery = DispatchThread::start();
/// delivery.dispatch(Box::new(|| {
///     // runs on the delivery thread
/// }));
/// delivery.shutdown();
/// ```
pub struct DispatchThread {
    tx: mpsc::SyncSender<Msg>,
    handle: Option<JoinHandle<()>>,
}

impl DispatchThread {
    /// Spawn the delivery thread.
    #[must_use]
    pub fn start() -> Self {
        let (tx, rx) = mpsc::sync_channel::<Msg>(QUEUE_CAPACITY);
        let handle = thread::spawn(move || {
            while let Ok(msg) = rx.recv() {
                match msg {
                    Msg::Run(task) => task(),
                    Msg::Shutdown => break,
                }
            }
            tracing::debug!(message = "dispatch_thread.stopped");
        });
        Self {
            tx,
            handle: Some(handle),
        }
    }

    /// Drain accepted tasks and join the delivery thread.
    ///
    /// Tasks already queued run before the thread exits.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.tx.send(Msg::Shutdown);
            if handle.join().is_err() {
                tracing::warn!(message = "dispatch_thread.join_panicked");
            }
        }
    }
}

impl Dispatcher for DispatchThread {
    fn dispatch(&self, task: Task) {
        if self.tx.send(Msg::Run(task)).is_err() {
            tracing::debug!(message = "dispatch_thread.task_dropped");
        }
    }
}

impl Drop for DispatchThread {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

impl std::fmt::Debug for DispatchThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchThread")
            .field("running", &self.handle.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#![forbid(unsafe_code)]

//! The observable source-of-truth cell.
//!
//! [`Kernel<T>`] holds a single optional value and publishes every
//! replacement to registered observers. It is the leaf component every other
//! part of the toolkit composes over: producers push into it through a
//! [`Feed`](crate::connector::Feed), collections and presenters subscribe to
//! it.
//!
//! # Design
//!
//! A `Kernel<T>` is a cheap clonable handle over shared interior state. The
//! slot (`Option<T>`) and the observer list live behind a single
//! `std::sync::Mutex`, so updates are applied and published atomically, one
//! at a time, in lock-acquisition order. Producers attached concurrently
//! race; the last update to take the lock wins.
//!
//! Absence is a first-class state: a freshly created cell holds `None`, and
//! a producer may deliberately publish `None` (a register clearing itself,
//! a remote value becoming unknown).
//!
//! # Invariants
//!
//! 1. At most one value is held at a time; every successful update fully
//!    replaces the prior value.
//! 2. A new observer receives the current value synchronously during
//!    [`subscribe`](Kernel::subscribe), then every subsequent change, in
//!    application order (replay-then-live).
//! 3. Observers are notified in registration order.
//! 4. A producer failure never disturbs the slot: the previous value is
//!    retained and observers are not notified through the value path.
//! 5. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//!
//! # Failure Modes
//!
//! - **Observer re-entrancy**: callbacks run while the state lock is held.
//!   A callback that calls back into the same cell (subscribe, attach, or
//!   any mutation) deadlocks. Keep callbacks passive; hand heavier work to
//!   a dispatcher.
//! - **Poisoned lock**: if an observer panics, the cell continues to serve
//!   subsequent calls from the poisoned mutex (the state itself is never
//!   left mid-update).

use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::connector::{Cancellation, Connector, Feed};
use crate::error::ErrorSink;

/// Observer callback storage. Receives the new value by reference; `None`
/// means the slot is absent.
type ObserverFn<T> = Box<dyn FnMut(Option<&T>) + Send>;

struct Observer<T> {
    id: u64,
    notify: ObserverFn<T>,
}

struct State<T> {
    value: Option<T>,
    observers: Vec<Observer<T>>,
    next_observer: u64,
}

pub(crate) struct Shared<T> {
    state: Mutex<State<T>>,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        // Keep serving after an observer panic; the slot is never left
        // mid-update because replacement happens before notification.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the slot and notify every observer, under one lock hold.
    pub(crate) fn publish(&self, value: Option<T>) {
        let mut state = self.lock();
        state.value = value;
        tracing::trace!(message = "kernel.publish", observers = state.observers.len());
        let State { value, observers, .. } = &mut *state;
        for observer in observers.iter_mut() {
            (observer.notify)(value.as_ref());
        }
    }

    fn remove_observer(&self, id: u64) {
        let mut state = self.lock();
        state.observers.retain(|observer| observer.id != id);
    }
}

/// An observable single-slot holder of an optional value.
///
/// Cloning a `Kernel` clones the *handle*, not the cell: all clones share
/// one slot and one observer list. Identity, not value, determines which
/// observers see which updates.
///
/// ```
/// use lode_core::Kernel;
///
/// let kernel: Kernel<u32> = Kernel::new();
/// assert_eq!(kernel.current(), None);
/// ```
pub struct Kernel<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Kernel<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for Kernel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Kernel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("Kernel")
            .field("value", &state.value)
            .field("observers", &state.observers.len())
            .finish()
    }
}

impl<T> Kernel<T> {
    /// Create an empty cell (`current() == None`).
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    value: None,
                    observers: Vec::new(),
                    next_observer: 0,
                }),
            }),
        }
    }

    /// The last value applied, cloned out of the slot.
    #[must_use]
    pub fn current(&self) -> Option<T>
    where
        T: Clone,
    {
        self.shared.lock().value.clone()
    }

    /// Borrowed access to the current value without cloning.
    ///
    /// The closure must not call back into this cell (see the module-level
    /// failure modes).
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.shared.lock().value.as_ref())
    }

    /// Register an observer callback.
    ///
    /// The callback is invoked with the current value before `subscribe`
    /// returns, then once per applied update, in application order. The
    /// returned [`Subscription`] unsubscribes on drop.
    #[must_use = "dropping the Subscription immediately unsubscribes"]
    pub fn subscribe(&self, mut f: impl FnMut(Option<&T>) + Send + 'static) -> Subscription
    where
        T: Send + 'static,
    {
        let mut state = self.shared.lock();
        f(state.value.as_ref());
        let id = state.next_observer;
        state.next_observer += 1;
        state.observers.push(Observer {
            id,
            notify: Box::new(f),
        });
        drop(state);

        let shared = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = shared.upgrade() {
                shared.remove_observer(id);
            }
        })
    }

    /// A pull-style rendering of the same replay-then-live contract: an
    /// iterator whose first item is the current value, followed by every
    /// subsequent emission.
    #[must_use]
    pub fn updates(&self) -> Updates<Option<T>>
    where
        T: Clone + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let sub = self.subscribe(move |value| {
            // Receiver dropped means the consumer went away; the guard in
            // Updates is gone with it, so this callback is already doomed.
            let _ = tx.send(value.cloned());
        });
        Updates { rx, _sub: sub }
    }

    /// Channel-backed emissions projected through `map` at publish time.
    pub(crate) fn updates_mapped<U, F>(&self, map: F) -> Updates<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: Fn(Option<&T>) -> U + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let sub = self.subscribe(move |value| {
            let _ = tx.send(map(value));
        });
        Updates { rx, _sub: sub }
    }

    /// Attach a producer, absorbing its failures.
    ///
    /// The connector is handed a [`Feed`] and asked to start producing.
    /// Each `Ok` item replaces the slot and is published; each `Err` item
    /// is discarded without disturbing the current value. The returned
    /// [`Cancellation`] revokes the attachment; dropping it does nothing.
    pub fn attach<C>(&self, connector: &C) -> Cancellation
    where
        C: Connector<Elem = T> + ?Sized,
    {
        self.attach_inner(connector, None)
    }

    /// Like [`attach`](Kernel::attach), but forwards the first producer
    /// failure to `sink`. The sink observes the failure; it never affects
    /// the slot.
    pub fn attach_observed<C>(&self, connector: &C, sink: ErrorSink) -> Cancellation
    where
        C: Connector<Elem = T> + ?Sized,
    {
        self.attach_inner(connector, Some(sink))
    }

    fn attach_inner<C>(&self, connector: &C, sink: Option<ErrorSink>) -> Cancellation
    where
        C: Connector<Elem = T> + ?Sized,
    {
        let live = Arc::new(AtomicBool::new(true));
        let feed = Feed::new(Arc::downgrade(&self.shared), Arc::clone(&live), sink);
        connector.connect(feed);
        Cancellation::new(live)
    }
}

/// Objects that can be observed with replay-then-live delivery.
///
/// This is the seam presentation code binds to, so derived cells and
/// presenters compose without naming concrete source types. The callback is
/// boxed for object safety; [`Kernel::subscribe`] is the ergonomic form.
pub trait Watch<T> {
    /// Register an observer; same contract as [`Kernel::subscribe`].
    fn watch(&self, f: Box<dyn FnMut(Option<&T>) + Send>) -> Subscription;
}

impl<T: Send + 'static> Watch<T> for Kernel<T> {
    fn watch(&self, f: Box<dyn FnMut(Option<&T>) + Send>) -> Subscription {
        self.subscribe(f)
    }
}

/// RAII guard for a registered observer.
///
/// Dropping the guard removes the callback before the next notification
/// cycle. [`detach`](Subscription::detach) leaves the callback registered
/// for the life of the observed cell.
#[must_use = "dropping the Subscription immediately unsubscribes"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Consume the guard, leaving the observer registered forever.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Blocking iterator over a cell's emissions.
///
/// The first item is the value at subscription time; each further item is
/// one applied update. The iterator never terminates on its own; callers
/// decide how many items to take. Dropping it unsubscribes.
pub struct Updates<U> {
    rx: mpsc::Receiver<U>,
    _sub: Subscription,
}

impl<U> Updates<U> {
    /// Non-blocking poll for the next emission.
    pub fn try_next(&self) -> Option<U> {
        self.rx.try_recv().ok()
    }

    /// Block until the next emission, up to `timeout`.
    pub fn next_timeout(&self, timeout: std::time::Duration) -> Option<U> {
        self.rx.recv_timeout(timeout).ok()
    }
}

impl<U> Iterator for Updates<U> {
    type Item = U;

    fn next(&mut self) -> Option<U> {
        self.rx.recv().ok()
    }
}

impl<U> std::fmt::Debug for Updates<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updates").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

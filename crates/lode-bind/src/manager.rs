#![forbid(unsafe_code)]

//! The UI-facing presenter.
//!
//! A [`Manager<V>`] is the last hop before a view: it tracks a watchable
//! source, drops consecutive duplicate values, and applies what remains on
//! a consumer-chosen [`Dispatcher`] context. Views read
//! [`value`](Manager::value) or subscribe for changes; they never see the
//! upstream cell.
//!
//! # Invariants
//!
//! 1. The first value received from a source is always forwarded;
//!    deduplication applies only to consecutive equal values after it.
//! 2. Forwarded assignments and the notifications they trigger run on the
//!    dispatcher's context.
//! 3. A presentation binding lives as long as the manager (or until the
//!    source is dropped); re-presenting adds a binding rather than
//!    replacing the existing one.

use std::sync::{Arc, Mutex};

use lode_core::{Action, Kernel, SetValueConnector, Subscription, Watch};

use crate::dispatch::Dispatcher;

/// Deduplicating presenter over an optional value.
///
/// ```
/// use std::sync::Arc;
///
/// use lode_bind::dispatch::InlineDispatcher;
/// use lode_bind::Manager;
/// use lode_core::{Kernel, SetValueConnector};
///
/// let source: Kernel<String> = Kernel::new();
/// let manager = Manager::new();
/// manager.present(&source, Arc::new(InlineDispatcher));
///
/// let _ = source.attach(&SetValueConnector::new(Some("ready".to_owned())));
/// assert_eq!(manager.value(), Some("ready".to_owned()));
/// ```
pub struct Manager<V> {
    cell: Kernel<V>,
    bindings: Mutex<Vec<Subscription>>,
}

impl<V> Default for Manager<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for Manager<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bindings = self
            .bindings
            .lock()
            .map(|bindings| bindings.len())
            .unwrap_or(0);
        f.debug_struct("Manager").field("bindings", &bindings).finish()
    }
}

impl<V> Manager<V> {
    /// A presenter holding no value and tracking no source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cell: Kernel::new(),
            bindings: Mutex::new(Vec::new()),
        }
    }

    /// The value most recently delivered through the dispatcher.
    #[must_use]
    pub fn value(&self) -> Option<V>
    where
        V: Clone,
    {
        self.cell.current()
    }

    /// Observe presented values; same replay-then-live contract as
    /// [`Kernel::subscribe`]. Callbacks run on whichever context delivers
    /// the presentation update.
    #[must_use = "dropping the Subscription immediately unsubscribes"]
    pub fn subscribe(&self, f: impl FnMut(Option<&V>) + Send + 'static) -> Subscription
    where
        V: Send + 'static,
    {
        self.cell.subscribe(f)
    }
}

impl<V> Manager<V>
where
    V: Clone + PartialEq + Send + 'static,
{
    /// Track `source`, delivering deduplicated values through `dispatcher`.
    ///
    /// The binding is held by the manager; dropping the manager (or the
    /// source) ends it.
    pub fn present<S>(&self, source: &S, dispatcher: Arc<dyn Dispatcher>)
    where
        S: Watch<V> + ?Sized,
    {
        let target = self.cell.clone();
        let mut last_forwarded: Option<Option<V>> = None;
        let binding = source.watch(Box::new(move |value| {
            let next = value.cloned();
            if last_forwarded.as_ref() == Some(&next) {
                tracing::trace!(message = "manager.duplicate_dropped");
                return;
            }
            last_forwarded = Some(next.clone());
            let target = target.clone();
            dispatcher.dispatch(Box::new(move || {
                Action::new(SetValueConnector::new(next), &target).execute();
            }));
        }));

        match self.bindings.lock() {
            Ok(mut bindings) => bindings.push(binding),
            // A panicked presenter elsewhere doesn't invalidate this
            // binding; keep it alive regardless.
            Err(poisoned) => poisoned.into_inner().push(binding),
        }
    }
}

impl<V: Send + 'static> Watch<V> for Manager<V> {
    fn watch(&self, f: Box<dyn FnMut(Option<&V>) + Send>) -> Subscription {
        self.cell.subscribe(f)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#![forbid(unsafe_code)]

//! The producer seam: how external sources feed a [`Kernel`].
//!
//! A [`Connector`] is something that can be asked to start producing a
//! sequence of `Result<Option<T>, ProducerError>` items. The cell never
//! knows how a producer obtains data; it only hands over a [`Feed`] (a
//! clonable push handle) and consumes whatever arrives. Producers are free
//! to move the feed to another thread and push for as long as they like.
//!
//! # Invariants
//!
//! 1. `Ok` items replace the cell's value and are published; `Err` items
//!    are absorbed without touching the value.
//! 2. A revoked attachment ([`Cancellation::cancel`] or [`Feed::cancel`])
//!    never applies another update. Updates applied before revocation are
//!    not rolled back.
//! 3. A feed whose cell has been dropped is inert: pushes are discarded.
//! 4. A registered error sink observes at most the first failure of its
//!    attachment.
//!
//! [`Kernel`]: crate::kernel::Kernel

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::error::{ErrorSink, ProducerError};
use crate::kernel::Shared;

/// An external source of values for a cell.
///
/// Implementors start producing when [`connect`](Connector::connect) is
/// called and push items through the given feed. Production may be
/// synchronous (push once and return) or long-lived (move the feed into a
/// thread or task).
///
/// ```
/// use lode_core::{Connector, Feed};
///
/// struct Countdown(u32);
///
/// impl Connector for Countdown {
///     type Elem = u32;
///
///     fn connect(&self, feed: Feed<u32>) {
///         for n in (0..=self.0).rev() {
///             feed.accept(Ok(Some(n)));
///         }
///     }
/// }
/// ```
pub trait Connector {
    /// The value type produced.
    type Elem;

    /// Start producing into `feed`.
    fn connect(&self, feed: Feed<Self::Elem>);
}

/// Push handle bound to one attachment of one cell.
///
/// Clonable so a producer can fan production out over several workers; all
/// clones share the attachment's revocation flag and error sink.
pub struct Feed<T> {
    shared: Weak<Shared<T>>,
    live: Arc<AtomicBool>,
    sink: Option<ErrorSink>,
}

impl<T> Clone for Feed<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
            live: Arc::clone(&self.live),
            sink: self.sink.clone(),
        }
    }
}

impl<T> Feed<T> {
    pub(crate) fn new(
        shared: Weak<Shared<T>>,
        live: Arc<AtomicBool>,
        sink: Option<ErrorSink>,
    ) -> Self {
        Self { shared, live, sink }
    }

    /// Push one producer item.
    ///
    /// `Ok(value)` replaces the cell's slot and notifies observers.
    /// `Err(fault)` is absorbed: the slot keeps its value, and the fault is
    /// forwarded to the attachment's error sink if one was registered (at
    /// most once per attachment).
    pub fn accept(&self, item: Result<Option<T>, ProducerError>) {
        if !self.live.load(Ordering::Acquire) {
            tracing::trace!(message = "feed.discard_revoked");
            return;
        }
        match item {
            Ok(value) => {
                if let Some(shared) = self.shared.upgrade() {
                    shared.publish(value);
                }
            }
            Err(fault) => {
                tracing::debug!(message = "feed.fault_absorbed", fault = %fault);
                if let Some(sink) = &self.sink {
                    sink.fire(fault);
                }
            }
        }
    }

    /// Revoke the attachment from the producer side. Idempotent.
    pub fn cancel(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Whether pushes through this feed still reach the cell.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire) && self.shared.strong_count() > 0
    }
}

impl<T> std::fmt::Debug for Feed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feed")
            .field("live", &self.is_live())
            .field("observed", &self.sink.is_some())
            .finish()
    }
}

/// Handle revoking one attachment.
///
/// Not an RAII guard: dropping it changes nothing, which reproduces the
/// fire-and-forget attachment most callers want. Holding it enables
/// revocation; revocation does not roll back applied updates.
#[derive(Clone)]
pub struct Cancellation {
    live: Arc<AtomicBool>,
}

impl Cancellation {
    pub(crate) fn new(live: Arc<AtomicBool>) -> Self {
        Self { live }
    }

    /// Stop further updates from this attachment. Idempotent.
    pub fn cancel(&self) {
        tracing::debug!(message = "attachment.revoked");
        self.live.store(false, Ordering::Release);
    }

    /// Whether the attachment has been revoked from either side.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        !self.live.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Cancellation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cancellation")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// The degenerate producer: emits one stored value synchronously.
///
/// This is the connector behind every [`Register`](crate::Register)
/// mutation, and a convenient way to seed a cell by hand:
///
/// ```
/// use lode_core::{Kernel, SetValueConnector};
///
/// let kernel = Kernel::new();
/// let _ = kernel.attach(&SetValueConnector::new(Some(3)));
/// assert_eq!(kernel.current(), Some(3));
/// ```
#[derive(Debug, Clone)]
pub struct SetValueConnector<T> {
    value: Option<T>,
}

impl<T> SetValueConnector<T> {
    /// A connector that will emit `value` once on connect. `None` writes
    /// absence into the cell.
    #[must_use]
    pub fn new(value: Option<T>) -> Self {
        Self { value }
    }
}

impl<T: Clone> Connector for SetValueConnector<T> {
    type Elem = T;

    fn connect(&self, feed: Feed<T>) {
        feed.accept(Ok(self.value.clone()));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

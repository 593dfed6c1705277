#![forbid(unsafe_code)]

//! Error taxonomy for the core.
//!
//! Producer failures are opaque and absorbed ([`ProducerError`]); lookup
//! failures are typed and returned to the immediate caller
//! ([`RegisterError`]). No failure here is fatal; at most it prevents a
//! future update.

use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Whatever an attached producer failed with.
///
/// The core never inspects producer failures; they are absorbed, optionally
/// surfaced through an [`ErrorSink`], and forgotten.
pub type ProducerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Typed failures of register lookups. Synchronous, pure reads; no retry
/// policy applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// No element satisfied the lookup criterion.
    #[error("no element matched the query")]
    NotFound,

    /// More than one element satisfied the filter.
    #[error("more than one element matched the filter")]
    Ambiguous,
}

/// One-shot consumer of a producer failure.
///
/// Registered per attachment via
/// [`Kernel::attach_observed`](crate::Kernel::attach_observed) or
/// [`Action::execute_observed`](crate::Action::execute_observed). The sink
/// fires at most once, with the first failure, no matter how many failures
/// the producer emits, and never affects the cell's value.
#[derive(Clone)]
pub struct ErrorSink {
    slot: Arc<Mutex<Option<Box<dyn FnOnce(ProducerError) + Send>>>>,
}

impl ErrorSink {
    /// Wrap a callback to be invoked with the first failure.
    pub fn new(on_error: impl FnOnce(ProducerError) + Send + 'static) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(Box::new(on_error)))),
        }
    }

    /// Whether the sink has already consumed a failure.
    #[must_use]
    pub fn is_spent(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_none()).unwrap_or(true)
    }

    pub(crate) fn fire(&self, fault: ProducerError) {
        let callback = match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        match callback {
            Some(callback) => callback(fault),
            None => tracing::trace!(message = "error_sink.already_spent"),
        }
    }
}

impl std::fmt::Debug for ErrorSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorSink")
            .field("spent", &self.is_spent())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

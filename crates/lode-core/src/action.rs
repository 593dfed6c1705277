#![forbid(unsafe_code)]

//! Coupling a connector to a cell.
//!
//! An [`Action`] pairs a producer with the cell it should drive, and
//! executes the attachment on demand. It exists for call sites that build
//! the pairing in one place and trigger it in another; every
//! [`Register`](crate::Register) mutation goes through one.
//!
//! Failures never reach the caller of an execute method: either they are
//! dropped outright, or the first one is handed to an [`ErrorSink`].

use crate::connector::{Cancellation, Connector};
use crate::error::ErrorSink;
use crate::kernel::Kernel;

/// A connector paired with its target cell.
///
/// ```
/// use lode_core::{Action, Kernel, SetValueConnector};
///
/// let kernel = Kernel::new();
/// Action::new(SetValueConnector::new(Some(true)), &kernel).execute();
/// assert_eq!(kernel.current(), Some(true));
/// ```
pub struct Action<C: Connector> {
    connector: C,
    kernel: Kernel<C::Elem>,
}

impl<C: Connector> std::fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action").finish_non_exhaustive()
    }
}

impl<C: Connector> Action<C> {
    /// Pair `connector` with the cell behind `kernel`.
    pub fn new(connector: C, kernel: &Kernel<C::Elem>) -> Self {
        Self {
            connector,
            kernel: kernel.clone(),
        }
    }

    /// Start the attachment, ignoring any producer failures.
    pub fn execute(self) -> Cancellation {
        self.kernel.attach(&self.connector)
    }

    /// Start the attachment, forwarding the first producer failure to
    /// `sink`.
    pub fn execute_observed(self, sink: ErrorSink) -> Cancellation {
        self.kernel.attach_observed(&self.connector, sink)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{Feed, SetValueConnector};

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn execute_drives_the_cell() {
        let kernel = Kernel::new();
        Action::new(SetValueConnector::new(Some(5)), &kernel).execute();
        assert_eq!(kernel.current(), Some(5));
    }

    #[test]
    fn execute_observed_forwards_first_failure_only() {
        struct Flaky;
        impl Connector for Flaky {
            type Elem = u32;
            fn connect(&self, feed: Feed<u32>) {
                feed.accept(Ok(Some(1)));
                feed.accept(Err("transient".into()));
                feed.accept(Err("also transient".into()));
                feed.accept(Ok(Some(2)));
            }
        }

        let kernel = Kernel::new();
        let faults = Arc::new(AtomicUsize::new(0));
        let first = Arc::new(Mutex::new(String::new()));

        let fault_count = Arc::clone(&faults);
        let fault_text = Arc::clone(&first);
        let sink = ErrorSink::new(move |fault| {
            fault_count.fetch_add(1, Ordering::SeqCst);
            *fault_text.lock().unwrap() = fault.to_string();
        });

        Action::new(Flaky, &kernel).execute_observed(sink);

        assert_eq!(faults.load(Ordering::SeqCst), 1);
        assert_eq!(*first.lock().unwrap(), "transient");
        // Failures were absorbed; production continued past them.
        assert_eq!(kernel.current(), Some(2));
    }

    #[test]
    fn failure_with_no_sink_is_silent() {
        struct Doomed;
        impl Connector for Doomed {
            type Elem = u32;
            fn connect(&self, feed: Feed<u32>) {
                feed.accept(Err("ignored".into()));
            }
        }

        let kernel = Kernel::new();
        Action::new(Doomed, &kernel).execute();
        assert_eq!(kernel.current(), None);
    }
}

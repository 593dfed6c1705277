#![forbid(unsafe_code)]

//! Pure value transformation over watchable sources.
//!
//! A [`Format<T, V>`] holds a presentation mapping. Applying it to a source
//! yields a [`Formatted<V>`]: a derived cell that tracks the source for
//! its lifetime and re-publishes mapped values under the usual
//! replay-then-live contract. Absent input maps to absent output; the
//! mapping itself never sees absence.

use std::sync::Arc;

use lode_core::{Action, Kernel, SetValueConnector, Subscription, Watch};

/// A reusable presentation mapping from `T` to `V`.
///
/// ```
/// use lode_bind::Format;
/// use lode_core::{Kernel, SetValueConnector};
///
/// let seconds: Kernel<u64> = Kernel::new();
/// let clock = Format::new(|s: &u64| format!("{:02}:{:02}", s / 60, s % 60));
/// let display = clock.apply(&seconds);
///
/// let _ = seconds.attach(&SetValueConnector::new(Some(90)));
/// assert_eq!(display.current(), Some("01:30".to_owned()));
/// ```
pub struct Format<T, V> {
    format: Arc<dyn Fn(&T) -> V + Send + Sync>,
}

impl<T, V> Clone for Format<T, V> {
    fn clone(&self) -> Self {
        Self {
            format: Arc::clone(&self.format),
        }
    }
}

impl<T, V> std::fmt::Debug for Format<T, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Format").finish_non_exhaustive()
    }
}

impl<T, V> Format<T, V>
where
    T: 'static,
    V: Clone + Send + 'static,
{
    /// Wrap a pure mapping.
    pub fn new(format: impl Fn(&T) -> V + Send + Sync + 'static) -> Self {
        Self {
            format: Arc::new(format),
        }
    }

    /// Derive a formatted cell from `source`.
    ///
    /// The derived cell holds the mapping of the source's current value
    /// immediately, and tracks every subsequent emission until it is
    /// dropped.
    #[must_use]
    pub fn apply<S>(&self, source: &S) -> Formatted<V>
    where
        S: Watch<T> + ?Sized,
    {
        let cell = Kernel::new();
        let target = cell.clone();
        let format = Arc::clone(&self.format);
        let tracking = source.watch(Box::new(move |value| {
            let mapped = value.map(|value| format(value));
            Action::new(SetValueConnector::new(mapped), &target).execute();
        }));
        Formatted {
            cell,
            _tracking: tracking,
        }
    }
}

/// A derived observable cell produced by [`Format::apply`].
///
/// Watchable like any other source, so formatted values feed presenters
/// and further formats without special plumbing.
pub struct Formatted<V> {
    cell: Kernel<V>,
    _tracking: Subscription,
}

impl<V> Formatted<V> {
    /// The mapped value of the source's last emission.
    #[must_use]
    pub fn current(&self) -> Option<V>
    where
        V: Clone,
    {
        self.cell.current()
    }

    /// Observe mapped values; same contract as [`Kernel::subscribe`].
    #[must_use = "dropping the Subscription immediately unsubscribes"]
    pub fn subscribe(&self, f: impl FnMut(Option<&V>) + Send + 'static) -> Subscription
    where
        V: Send + 'static,
    {
        self.cell.subscribe(f)
    }
}

impl<V: Send + 'static> Watch<V> for Formatted<V> {
    fn watch(&self, f: Box<dyn FnMut(Option<&V>) + Send>) -> Subscription {
        self.cell.subscribe(f)
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for Formatted<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Formatted")
            .field("current", &self.cell)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

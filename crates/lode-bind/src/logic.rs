#![forbid(unsafe_code)]

//! Boolean branch dispatch.

/// A condition with two outcome branches; evaluation runs exactly one.
///
/// Stateless by construction: the gate owns nothing but its closures, so
/// the same instance can be evaluated any number of times.
///
/// ```
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
///
/// use lode_bind::LogicGate;
///
/// let highs = Arc::new(AtomicU32::new(0));
/// let counter = Arc::clone(&highs);
/// let gate = LogicGate::new(
///     |n: &u32| *n > 100,
///     move |_| {
///         counter.fetch_add(1, Ordering::SeqCst);
///     },
///     |_| {},
/// );
///
/// gate.evaluate(250);
/// gate.evaluate(3);
/// assert_eq!(highs.load(Ordering::SeqCst), 1);
/// ```
pub struct LogicGate<I> {
    condition: Box<dyn Fn(&I) -> bool + Send + Sync>,
    on_true: Box<dyn Fn(I) + Send + Sync>,
    on_false: Box<dyn Fn(I) + Send + Sync>,
}

impl<I> LogicGate<I> {
    /// Build a gate from a predicate and its two branches.
    pub fn new(
        condition: impl Fn(&I) -> bool + Send + Sync + 'static,
        on_true: impl Fn(I) + Send + Sync + 'static,
        on_false: impl Fn(I) + Send + Sync + 'static,
    ) -> Self {
        Self {
            condition: Box::new(condition),
            on_true: Box::new(on_true),
            on_false: Box::new(on_false),
        }
    }

    /// Evaluate the predicate and hand `input` to the matching branch.
    pub fn evaluate(&self, input: I) {
        if (self.condition)(&input) {
            (self.on_true)(input);
        } else {
            (self.on_false)(input);
        }
    }
}

impl<I> std::fmt::Debug for LogicGate<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogicGate").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#![forbid(unsafe_code)]

//! A set-backed observable collection.
//!
//! [`Register<E>`] stores unique elements with fast lookup and re-expresses
//! the collection as a stream of snapshots: every mutating call publishes a
//! complete, freshly built sequence to observers. State lives in an
//! internally owned [`Kernel`] holding `Option<AHashSet<E>>`, which is never
//! exposed.
//!
//! # Invariants
//!
//! 1. The set never contains two elements that compare equal.
//! 2. Every mutating call emits, even when membership is unchanged:
//!    replacement and no-op removal still re-publish.
//! 3. `clear` resets to *absent*, not to an empty set. Observers cannot
//!    tell the difference (both arrive as an empty snapshot), but a later
//!    mutation starts from scratch either way.
//! 4. Emissions are complete snapshots; observers never see in-place
//!    mutation.
//!
//! # Identity-keyed elements
//!
//! `upsert` uses replace-on-equal semantics. When `E`'s `Eq`/`Hash` are
//! keyed on a stable identity while the rest of the payload may change,
//! upserting a modified instance with the same identity swaps it into
//! place:
//!
//! ```
//! use lode_core::Register;
//!
//! #[derive(Clone, Debug)]
//! struct Entry {
//!     id: u32,
//!     label: &'static str,
//! }
//!
//! impl PartialEq for Entry {
//!     fn eq(&self, other: &Self) -> bool {
//!         self.id == other.id
//!     }
//! }
//! impl Eq for Entry {}
//! impl std::hash::Hash for Entry {
//!     fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
//!         self.id.hash(state);
//!     }
//! }
//!
//! let register = Register::new();
//! register.upsert(Entry { id: 1, label: "draft" });
//! register.upsert(Entry { id: 1, label: "final" });
//!
//! let snapshot = register.snapshot();
//! assert_eq!(snapshot.len(), 1);
//! assert_eq!(snapshot[0].label, "final");
//! ```

use std::hash::Hash;

use ahash::AHashSet;

use crate::action::Action;
use crate::connector::SetValueConnector;
use crate::error::RegisterError;
use crate::kernel::{Kernel, Subscription, Updates};

/// A deduplicated observable collection of `E`.
///
/// Snapshot ordering is unspecified (hash-set iteration order); consumers
/// that need a stable order sort on their side.
pub struct Register<E> {
    kernel: Kernel<AHashSet<E>>,
}

impl<E> Default for Register<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Register<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.kernel.with(|set| set.map_or(0, |set| set.len()));
        f.debug_struct("Register").field("len", &len).finish()
    }
}

impl<E> Register<E> {
    /// Create a register with an absent backing set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            kernel: Kernel::new(),
        }
    }
}

impl<E> Register<E>
where
    E: Clone + Eq + Hash,
{
    /// Insert `element`, or replace the member equal to it.
    ///
    /// Always emits a fresh snapshot, even when the set already contained
    /// an identical element.
    pub fn upsert(&self, element: E) {
        let mut next = self.kernel.current().unwrap_or_default();
        next.replace(element);
        self.commit(Some(next));
    }

    /// Remove the member equal to `element`, if present.
    ///
    /// Removing from an absent set leaves it absent; removing a non-member
    /// leaves membership unchanged. Either way a snapshot is emitted.
    pub fn remove(&self, element: &E) {
        let mut current = self.kernel.current();
        if let Some(set) = current.as_mut() {
            set.remove(element);
        }
        self.commit(current);
    }

    /// Drop all elements, resetting the backing set to absent. Emits an
    /// empty snapshot.
    pub fn clear(&self) {
        self.commit(None);
    }

    /// The member equal to `element`, or [`RegisterError::NotFound`].
    pub fn find_matching(&self, element: &E) -> Result<E, RegisterError> {
        self.kernel.with(|set| {
            set.and_then(|set| set.get(element).cloned())
                .ok_or(RegisterError::NotFound)
        })
    }

    /// The sole member satisfying `filter`.
    ///
    /// Fails with [`RegisterError::NotFound`] when nothing matches and
    /// [`RegisterError::Ambiguous`] when more than one element does.
    pub fn find_where(&self, filter: impl Fn(&E) -> bool) -> Result<E, RegisterError> {
        self.kernel.with(|set| {
            let mut found = None;
            for candidate in set.into_iter().flatten() {
                if filter(candidate) {
                    if found.is_some() {
                        return Err(RegisterError::Ambiguous);
                    }
                    found = Some(candidate.clone());
                }
            }
            found.ok_or(RegisterError::NotFound)
        })
    }

    /// Whether any member satisfies `filter`. Absent counts as empty.
    pub fn contains_where(&self, filter: impl Fn(&E) -> bool) -> bool {
        self.kernel
            .with(|set| set.is_some_and(|set| set.iter().any(filter)))
    }

    /// Whether the register holds no elements. Absent counts as empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kernel.with(|set| set.is_none_or(|set| set.is_empty()))
    }

    /// The current membership as an owned sequence.
    #[must_use]
    pub fn snapshot(&self) -> Vec<E> {
        self.kernel
            .with(|set| set.map_or_else(Vec::new, |set| set.iter().cloned().collect()))
    }

    /// Route a full snapshot through the cell's producer path, so the
    /// emission discipline is identical to any other attached source.
    fn commit(&self, next: Option<AHashSet<E>>) {
        Action::new(SetValueConnector::new(next), &self.kernel).execute();
    }
}

impl<E> Register<E>
where
    E: Clone + Eq + Hash + Send + 'static,
{
    /// Register an observer over membership snapshots.
    ///
    /// Same replay-then-live contract as [`Kernel::subscribe`]: the current
    /// snapshot arrives synchronously (absent delivered as empty), then one
    /// snapshot per mutating call.
    #[must_use = "dropping the Subscription immediately unsubscribes"]
    pub fn subscribe(&self, mut f: impl FnMut(&[E]) + Send + 'static) -> Subscription {
        self.kernel.subscribe(move |set| {
            let snapshot: Vec<E> = set.map_or_else(Vec::new, |set| set.iter().cloned().collect());
            f(&snapshot);
        })
    }

    /// A pull-style iterator over membership snapshots; see
    /// [`Kernel::updates`] for the delivery contract.
    #[must_use]
    pub fn values(&self) -> Updates<Vec<E>> {
        self.kernel.updates_mapped(|set| {
            set.map_or_else(Vec::new, |set| set.iter().cloned().collect())
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

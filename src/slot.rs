#![forbid(unsafe_code)]

//! Caller-owned mutable state with change notification.
//!
//! A [`Slot<T>`] is the "external" side of a two-way attachment: it models
//! the ancestor-owned value that the synchronization policy reads and
//! conditionally writes but never owns. Handles are cheap clones of the same
//! interior, so the ancestor keeps one and hands another to
//! [`publish`](crate::sync::publish).
//!
//! Like [`ObservableBox`](crate::ObservableBox), a slot stores and notifies
//! unconditionally on every `set` — host frameworks are allowed to redeliver
//! the same `(old, new)` pair within one update pass, and the attachment's
//! listener-side equality guard is what absorbs that.

use crate::observable::{ObservableBox, Subscription};

/// Handle to caller-owned mutable state of type `T`.
pub struct Slot<T> {
    cell: ObservableBox<T>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot").field("cell", &self.cell).finish()
    }
}

impl<T: Clone + PartialEq + 'static> Slot<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            cell: ObservableBox::new(value),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.cell.value()
    }

    /// By-reference read without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.with(f)
    }

    /// Store `value` and notify subscribers with the `(old, new)` pair,
    /// even when nothing changed.
    pub fn set(&self, value: T) {
        self.cell.set_value(value);
    }

    /// Subscribe to stores. Dropping the returned guard unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&T, &T) + 'static) -> Subscription {
        self.cell.subscribe(callback)
    }

    /// Total stores performed, redundant ones included.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.cell.writes()
    }
}

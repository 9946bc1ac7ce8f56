#![forbid(unsafe_code)]

//! Observable value container with change notification.
//!
//! # Design
//!
//! [`ObservableBox<T>`] wraps a value of type `T` in shared, reference-counted
//! storage (`Rc<RefCell<..>>`). Every store notifies all live subscribers in
//! registration order with the `(old, new)` value pair — **including stores of
//! a value equal to the current one**. Suppressing redundant propagation is
//! deliberately the subscriber's responsibility: the synchronization listeners
//! in [`sync`](crate::sync) guard on equality at the receiving end, and any
//! other subscriber (a render invalidator, a logger) gets to see every write.
//!
//! Equality between two boxes is defined purely by equality of their contained
//! values; the identity of the handles is irrelevant.
//!
//! # Failure Modes
//!
//! - **Re-entrant store into the same box** from within one of its own
//!   subscriber callbacks recurses: notification never holds an interior
//!   borrow across user code, so the inner store succeeds and runs a nested
//!   notification pass before the outer one resumes. A subscriber that writes
//!   back unconditionally never converges and overflows the stack; bounding
//!   re-entrant writes is the subscriber's job (the sync listeners bound
//!   theirs with an equality guard).
//! - **Subscriber leak**: [`Subscription`] guards held indefinitely keep their
//!   callbacks registered. Dead weak entries are pruned lazily on notify.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A subscriber callback stored as a strong `Rc` by its [`Subscription`]
/// guard, handed to the box as `Weak`.
type CallbackRc<T> = Rc<dyn Fn(&T, &T)>;
type CallbackWeak<T> = Weak<dyn Fn(&T, &T)>;

/// Shared interior for [`ObservableBox<T>`].
struct BoxInner<T> {
    value: T,
    /// Total stores performed, redundant ones included.
    writes: u64,
    /// Subscribers stored as weak references. Dead entries are pruned on notify.
    subscribers: Vec<CallbackWeak<T>>,
}

/// A shared mutable container that notifies subscribers on every store.
///
/// Cloning an `ObservableBox` creates a new handle to the **same** interior —
/// both handles see the same value and share subscribers.
///
/// # Invariants
///
/// 1. `set_value(v)` stores unconditionally and notifies unconditionally,
///    even when `v` equals the current value.
/// 2. Subscribers receive `(&old, &new)` in registration order.
/// 3. `a == b` iff `a.value() == b.value()`; comparison is side-effect free.
/// 4. Dropping a [`Subscription`] removes the callback before the next
///    notification cycle.
pub struct ObservableBox<T> {
    inner: Rc<RefCell<BoxInner<T>>>,
}

// Manual Clone: shares the same Rc.
impl<T> Clone for ObservableBox<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ObservableBox<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ObservableBox")
            .field("value", &inner.value)
            .field("writes", &inner.writes)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

impl<T: PartialEq> PartialEq for ObservableBox<T> {
    /// Value equality: two boxes compare equal iff their contents do,
    /// regardless of whether they share an interior. Never notifies.
    fn eq(&self, other: &Self) -> bool {
        if Rc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        self.inner.borrow().value == other.inner.borrow().value
    }
}

impl<T: Eq> Eq for ObservableBox<T> {}

impl<T: Clone + PartialEq + 'static> ObservableBox<T> {
    /// Create a new box seeded with `value`. No subscribers are registered.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(BoxInner {
                value,
                writes: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn value(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Store a new value and notify every live subscriber with the
    /// `(old, new)` pair. The store and the notification happen even when
    /// `value` equals the current contents; receivers that care must compare
    /// for themselves.
    ///
    /// Calling this from one of this box's own subscriber callbacks is
    /// allowed and recurses (the nested notification pass completes before
    /// the outer one resumes); subscribers that write back must converge.
    pub fn set_value(&self, value: T) {
        let old = {
            let mut inner = self.inner.borrow_mut();
            let old = std::mem::replace(&mut inner.value, value);
            inner.writes += 1;
            old
        };
        self.notify(&old);
    }

    /// Subscribe to stores. The callback receives `(&old, &new)` on every
    /// `set_value`, redundant ones included.
    ///
    /// Returns a [`Subscription`] guard. Dropping the guard unsubscribes the
    /// callback (it will not be called after drop, though the dead entry may
    /// linger in the subscriber list until the next notification prunes it).
    pub fn subscribe(&self, callback: impl Fn(&T, &T) + 'static) -> Subscription {
        let strong: CallbackRc<T> = Rc::new(callback);
        let weak = Rc::downgrade(&strong);
        self.inner.borrow_mut().subscribers.push(weak);
        // Type-erase the strong Rc so Subscription stays non-generic;
        // `Rc<dyn Fn(&T, &T)>` cannot coerce to `Rc<dyn Any>` directly.
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Total number of stores performed on this box, including stores of an
    /// unchanged value. Useful as a write-counter spy in tests.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.inner.borrow().writes
    }

    /// Number of currently registered subscribers (including dead ones not
    /// yet pruned).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Create a non-owning handle to this box. Used by the ambient
    /// environment so published boxes die with their attachment.
    #[must_use]
    pub fn downgrade(&self) -> WeakBox<T> {
        WeakBox {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Notify live subscribers with `(old, current)` and prune dead entries.
    fn notify(&self, old: &T) {
        // Collect live callbacks first so no borrow is held during the calls;
        // subscribers may read this box or write other boxes/slots.
        let callbacks: Vec<CallbackRc<T>> = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|w| w.strong_count() > 0);
            inner
                .subscribers
                .iter()
                .filter_map(|w| w.upgrade())
                .collect()
        };

        let new = self.inner.borrow().value.clone();
        for cb in &callbacks {
            cb(old, &new);
        }
    }
}

/// Non-owning handle to an [`ObservableBox`].
///
/// Upgrades succeed only while at least one strong handle is alive. The
/// environment stores these so a torn-down attachment's box cannot be
/// resurrected by descendants.
pub struct WeakBox<T> {
    inner: Weak<RefCell<BoxInner<T>>>,
}

impl<T> Clone for WeakBox<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> WeakBox<T> {
    /// Attempt to recover a strong handle. Returns `None` if every strong
    /// handle has been dropped (the attachment was torn down).
    #[must_use]
    pub fn upgrade(&self) -> Option<ObservableBox<T>> {
        self.inner.upgrade().map(|inner| ObservableBox { inner })
    }
}

impl<T> std::fmt::Debug for WeakBox<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakBox")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// RAII guard for a subscriber callback.
///
/// Dropping the `Subscription` drops the strong callback `Rc`, so the `Weak`
/// entry in the box's subscriber list fails to upgrade on the next
/// notification cycle.
pub struct Subscription {
    /// Type-erased strong reference keeping the callback alive.
    _guard: Box<dyn std::any::Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn value_and_set_basic() {
        let cell = ObservableBox::new(42);
        assert_eq!(cell.value(), 42);
        assert_eq!(cell.writes(), 0);

        cell.set_value(99);
        assert_eq!(cell.value(), 99);
        assert_eq!(cell.writes(), 1);
    }

    #[test]
    fn redundant_store_still_counts_and_notifies() {
        let cell = ObservableBox::new(42);
        let fired = Rc::new(Cell::new(0u32));
        let fired_clone = Rc::clone(&fired);
        let _sub = cell.subscribe(move |_, _| fired_clone.set(fired_clone.get() + 1));

        cell.set_value(42); // Same value.
        assert_eq!(cell.writes(), 1);
        assert_eq!(fired.get(), 1, "equal store must still notify");
    }

    #[test]
    fn with_access() {
        let cell = ObservableBox::new(vec![1, 2, 3]);
        let sum = cell.with(|v| v.iter().sum::<i32>());
        assert_eq!(sum, 6);
    }

    #[test]
    fn subscriber_receives_old_and_new() {
        let cell = ObservableBox::new(1);
        let seen = Rc::new(Cell::new((0, 0)));
        let seen_clone = Rc::clone(&seen);

        let _sub = cell.subscribe(move |old, new| seen_clone.set((*old, *new)));

        cell.set_value(7);
        assert_eq!(seen.get(), (1, 7));

        cell.set_value(9);
        assert_eq!(seen.get(), (7, 9));
    }

    #[test]
    fn subscription_drop_unsubscribes() {
        let cell = ObservableBox::new(0);
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);

        let sub = cell.subscribe(move |_, _| count_clone.set(count_clone.get() + 1));

        cell.set_value(1);
        assert_eq!(count.get(), 1);

        drop(sub);

        cell.set_value(2);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn multiple_subscribers_all_fire() {
        let cell = ObservableBox::new(0);
        let a = Rc::new(Cell::new(0u32));
        let b = Rc::new(Cell::new(0u32));
        let a_clone = Rc::clone(&a);
        let b_clone = Rc::clone(&b);

        let _sub_a = cell.subscribe(move |_, _| a_clone.set(a_clone.get() + 1));
        let _sub_b = cell.subscribe(move |_, _| b_clone.set(b_clone.get() + 1));

        cell.set_value(1);
        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 1);
    }

    #[test]
    fn notification_order_is_registration_order() {
        let cell = ObservableBox::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        let log1 = Rc::clone(&log);
        let _s1 = cell.subscribe(move |_, _| log1.borrow_mut().push('A'));

        let log2 = Rc::clone(&log);
        let _s2 = cell.subscribe(move |_, _| log2.borrow_mut().push('B'));

        let log3 = Rc::clone(&log);
        let _s3 = cell.subscribe(move |_, _| log3.borrow_mut().push('C'));

        cell.set_value(1);
        assert_eq!(*log.borrow(), vec!['A', 'B', 'C']);
    }

    #[test]
    fn clone_shares_state_and_subscribers() {
        let a = ObservableBox::new(0);
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        let _sub = a.subscribe(move |_, _| count_clone.set(count_clone.get() + 1));

        let b = a.clone();
        b.set_value(42);
        assert_eq!(a.value(), 42);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn equality_is_value_based() {
        let a = ObservableBox::new(5);
        let b = ObservableBox::new(5);
        let c = ObservableBox::new(6);

        assert_eq!(a, b, "distinct boxes with equal values compare equal");
        assert_ne!(a, c);
        assert_eq!(a, a.clone(), "handle to the same interior compares equal");
    }

    #[test]
    fn equality_does_not_notify() {
        let a = ObservableBox::new(5);
        let b = ObservableBox::new(5);
        let fired = Rc::new(Cell::new(false));
        let fired_clone = Rc::clone(&fired);
        let _sub = a.subscribe(move |_, _| fired_clone.set(true));

        let _ = a == b;
        assert!(!fired.get());
        assert_eq!(a.writes(), 0);
    }

    #[test]
    fn subscriber_count_prunes_lazily() {
        let cell = ObservableBox::new(0);
        assert_eq!(cell.subscriber_count(), 0);

        let _s1 = cell.subscribe(|_, _| {});
        let s2 = cell.subscribe(|_, _| {});
        assert_eq!(cell.subscriber_count(), 2);

        drop(s2);
        // Dead subscriber not yet pruned.
        assert_eq!(cell.subscriber_count(), 2);

        cell.set_value(1);
        assert_eq!(cell.subscriber_count(), 1);
    }

    #[test]
    fn weak_handle_dies_with_strong_handles() {
        let weak = {
            let cell = ObservableBox::new(1);
            let weak = cell.downgrade();
            assert!(weak.upgrade().is_some());
            weak
        };
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn callback_may_write_another_box() {
        let a = ObservableBox::new(0);
        let b = ObservableBox::new(0);
        let b_clone = b.clone();
        let _sub = a.subscribe(move |_, new| b_clone.set_value(*new * 2));

        a.set_value(21);
        assert_eq!(b.value(), 42);
    }

    #[test]
    fn reentrant_store_from_own_subscriber_recurses() {
        let cell = ObservableBox::new(0);
        let cell_clone = cell.clone();
        // Converging write-back: bump until a ceiling, then stop.
        let _sub = cell.subscribe(move |_, new| {
            if *new < 3 {
                cell_clone.set_value(*new + 1);
            }
        });

        cell.set_value(1);
        assert_eq!(cell.value(), 3, "nested stores apply before the outer set returns");
        assert_eq!(cell.writes(), 3);
    }

    #[test]
    fn debug_format() {
        let cell = ObservableBox::new(42);
        let dbg = format!("{cell:?}");
        assert!(dbg.contains("ObservableBox"));
        assert!(dbg.contains("42"));
        assert!(dbg.contains("writes"));
    }
}

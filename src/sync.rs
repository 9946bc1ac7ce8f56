#![forbid(unsafe_code)]

//! Two-way synchronization between a [`Slot`] and a published
//! [`ObservableBox`].
//!
//! # Mechanism
//!
//! [`publish`] seeds a fresh box from the slot's current value, registers one
//! listener on each side, and extends the caller's [`Environment`] with a
//! weak handle to the box. The two listeners mirror each other:
//!
//! - slot → box: on every slot store, write the new value into the box
//!   *unless the box already holds it*.
//! - box → slot: on every box store, write the new value into the slot
//!   *unless the slot already holds it*.
//!
//! That mutual equality guard is the entire loop-termination argument. A
//! change originating on side X propagates to side Y exactly once: after the
//! propagating write the sides are equal, so when Y's store re-enters X's
//! listener (notification is synchronous and re-entrant, and both sides
//! notify even on redundant stores), the guard observes equality and performs
//! no further write. The same guard absorbs hosts that redeliver an
//! `(old, new)` pair within one update pass.
//!
//! # Invariants
//!
//! 1. At publish time, `box.value() == slot.get()`.
//! 2. One originating write causes at most one store on the opposite side.
//! 3. Propagation completes within the originating `set` call (synchronous);
//!    there is no deferred pass.
//! 4. Dropping the [`Attachment`] releases both listeners and the box; the
//!    environment frame's weak handle dies with it.
//!
//! # Failure Modes
//!
//! None recoverable. Descendant access after teardown panics in
//! [`Environment::lookup`]; that is a lifecycle bug in the surrounding
//! composition, not a runtime condition.

use tracing::trace;

use crate::env::Environment;
use crate::observable::{ObservableBox, Subscription};
use crate::slot::Slot;

/// Live two-way attachment for one subtree.
///
/// Owns the published box and both directional listeners. Dropping it tears
/// the attachment down: listeners stop firing and the box becomes
/// unreachable through any environment that still references it.
pub struct Attachment<T: Clone + PartialEq + 'static> {
    cell: ObservableBox<T>,
    _slot_to_cell: Subscription,
    _cell_to_slot: Subscription,
}

impl<T: Clone + PartialEq + 'static> Attachment<T> {
    /// The published box. Ancestor-side introspection; descendants should go
    /// through an [`Accessor`](crate::accessor::Accessor) instead.
    #[must_use]
    pub fn cell(&self) -> &ObservableBox<T> {
        &self.cell
    }
}

impl<T: Clone + PartialEq + 'static> std::fmt::Debug for Attachment<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment").finish_non_exhaustive()
    }
}

impl<T: Clone + PartialEq + 'static> Drop for Attachment<T> {
    fn drop(&mut self) {
        trace!(ty = std::any::type_name::<T>(), "attachment torn down");
    }
}

/// Attach two-way synchronization between `slot` and a freshly created
/// observable box, publishing the box into `env` for descendants.
///
/// Returns the child environment to hand to the subtree, plus the
/// [`Attachment`] the caller must keep alive for as long as the subtree is
/// mounted.
#[must_use]
pub fn publish<T: Clone + PartialEq + 'static>(
    env: &Environment,
    slot: &Slot<T>,
) -> (Environment, Attachment<T>) {
    let cell = ObservableBox::new(slot.get());
    let child = env.extend(cell.downgrade());
    trace!(ty = std::any::type_name::<T>(), "published observable box");

    // slot → box
    let cell_fwd = cell.clone();
    let slot_to_cell = slot.subscribe(move |_old, new| {
        if cell_fwd.with(|v| v == new) {
            trace!(
                ty = std::any::type_name::<T>(),
                "slot store already converged, suppressed"
            );
            return;
        }
        trace!(ty = std::any::type_name::<T>(), "slot → box");
        cell_fwd.set_value(new.clone());
    });

    // box → slot
    let slot_back = slot.clone();
    let cell_to_slot = cell.subscribe(move |_old, new| {
        if slot_back.with(|v| v == new) {
            trace!(
                ty = std::any::type_name::<T>(),
                "box store already converged, suppressed"
            );
            return;
        }
        trace!(ty = std::any::type_name::<T>(), "box → slot");
        slot_back.set(new.clone());
    });

    (
        child,
        Attachment {
            cell,
            _slot_to_cell: slot_to_cell,
            _cell_to_slot: cell_to_slot,
        },
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_box_from_slot() {
        let slot = Slot::new(17);
        let env = Environment::new();
        let (child, attachment) = publish(&env, &slot);

        assert_eq!(attachment.cell().value(), 17);
        assert_eq!(child.lookup::<i32>().unwrap().value(), 17);
    }

    #[test]
    fn slot_change_propagates_to_box() {
        let slot = Slot::new(0);
        let (_child, attachment) = publish(&Environment::new(), &slot);

        slot.set(5);
        assert_eq!(attachment.cell().value(), 5);
    }

    #[test]
    fn box_change_propagates_to_slot() {
        let slot = Slot::new(0);
        let (_child, attachment) = publish(&Environment::new(), &slot);

        attachment.cell().set_value(7);
        assert_eq!(slot.get(), 7);
    }

    #[test]
    fn propagation_terminates_without_ping_pong() {
        let slot = Slot::new(0);
        let (_child, attachment) = publish(&Environment::new(), &slot);

        slot.set(5);
        // One originating store + at most one propagated store per side.
        assert_eq!(slot.writes(), 1);
        assert_eq!(attachment.cell().writes(), 1);

        attachment.cell().set_value(9);
        assert_eq!(attachment.cell().writes(), 2);
        assert_eq!(slot.writes(), 2);
    }

    #[test]
    fn redundant_slot_store_does_not_write_box() {
        let slot = Slot::new(3);
        let (_child, attachment) = publish(&Environment::new(), &slot);

        slot.set(3); // No change; slot still notifies.
        assert_eq!(slot.writes(), 1);
        assert_eq!(attachment.cell().writes(), 0, "guard must suppress");
    }

    #[test]
    fn redundant_box_store_does_not_write_slot() {
        let slot = Slot::new(3);
        let (_child, attachment) = publish(&Environment::new(), &slot);

        attachment.cell().set_value(3);
        assert_eq!(attachment.cell().writes(), 1);
        assert_eq!(slot.writes(), 0, "guard must suppress");
    }

    #[test]
    fn drop_disconnects_both_directions() {
        let slot = Slot::new(1);
        let probe = {
            let (_child, attachment) = publish(&Environment::new(), &slot);
            slot.set(2);
            assert_eq!(attachment.cell().value(), 2);
            attachment.cell().clone()
        };
        // Attachment dropped; `probe` keeps the interior alive so we can
        // observe that the listeners, not the storage, were released.
        slot.set(9);
        assert_eq!(probe.value(), 2, "slot → box must stop after teardown");

        probe.set_value(4);
        assert_eq!(slot.get(), 9, "box → slot must stop after teardown");
    }

    #[test]
    fn nested_publish_syncs_independently() {
        let outer_slot = Slot::new(10);
        let inner_slot = Slot::new(20);
        let root = Environment::new();

        let (mid, _outer) = publish(&root, &outer_slot);
        let (leaf, _inner) = publish(&mid, &inner_slot);

        // The inner box shadows the outer one for the leaf subtree.
        inner_slot.set(21);
        assert_eq!(leaf.lookup::<i32>().unwrap().value(), 21);
        assert_eq!(mid.lookup::<i32>().unwrap().value(), 10);

        // The outer pair still syncs through its own box.
        outer_slot.set(11);
        assert_eq!(mid.lookup::<i32>().unwrap().value(), 11);
        assert_eq!(inner_slot.get(), 21);
    }
}

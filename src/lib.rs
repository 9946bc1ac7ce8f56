#![forbid(unsafe_code)]

//! Two-way state binding through an ambient, type-keyed environment.
//!
//! This crate keeps an ancestor-owned mutable value and an observable proxy
//! convergent, and makes that proxy reachable anywhere in a subtree without
//! parameter threading:
//!
//! - [`ObservableBox`]: a shared value container that notifies subscribers
//!   with `(old, new)` on every store, equal stores included.
//! - [`Slot`]: the caller-owned external value being synchronized.
//! - [`Environment`]: an immutable-extend, type-keyed registry with lexical
//!   shadowing, passed explicitly down the composition tree.
//! - [`publish`] / [`Attachment`]: seeds a box from a slot, wires the two
//!   equality-guarded listeners, and scopes everything to the attachment's
//!   lifetime.
//! - [`Accessor`]: descendant-side `get`/`set` over the ambient box.
//!
//! # Architecture
//!
//! Everything is single-threaded `Rc`/`RefCell`; nothing blocks, suspends, or
//! spawns. Notification is synchronous and re-entrant within the triggering
//! call stack, and the listener-side equality guards are what make that loop
//! terminate: a change propagates across the attachment exactly once, after
//! which both sides are equal and redelivery is absorbed.
//!
//! # Usage
//!
//! ```
//! use ambient_bind::{Accessor, Environment, Slot, sync::publish};
//!
//! // Ancestor: owns the slot, publishes it for the subtree.
//! let slot = Slot::new(0i32);
//! let (subtree_env, _attachment) = publish(&Environment::new(), &slot);
//!
//! // Descendant: plain get/set, no parameter threading.
//! let counter = Accessor::<i32>::new(&subtree_env);
//! assert_eq!(counter.get(), 0);
//!
//! slot.set(5);
//! assert_eq!(counter.get(), 5);
//!
//! counter.set(7);
//! assert_eq!(slot.get(), 7);
//! ```
//!
//! # Invariants
//!
//! 1. After `publish`, the box's value equals the slot's value at that
//!    instant, and they stay convergent while the attachment lives.
//! 2. One originating write causes at most one store on the opposite side.
//! 3. Box equality is value equality; handle identity never matters.
//! 4. A nested publish of the same type shadows the outer one for its own
//!    subtree only.
//! 5. Dropping the [`Attachment`] releases both listeners and the box;
//!    descendant access past that point panics.

pub mod accessor;
pub mod env;
pub mod observable;
pub mod slot;
pub mod sync;

pub use accessor::Accessor;
pub use env::Environment;
pub use observable::{ObservableBox, Subscription, WeakBox};
pub use slot::Slot;
pub use sync::{Attachment, publish};

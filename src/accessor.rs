#![forbid(unsafe_code)]

//! Descendant-facing read/write projection over the ambient box.
//!
//! An [`Accessor<T>`] captures an [`Environment`] and resolves the published
//! box of type `T` on every call, so ordinary `get`/`set` syntax reaches the
//! same box instance an ancestor published — writes are indistinguishable
//! from direct box mutation and drive the attachment's box → slot listener
//! identically.
//!
//! Using an accessor where no ancestor published a box of the expected type
//! is a programming error in the hierarchy's construction and panics at the
//! first access.

use std::marker::PhantomData;

use crate::env::Environment;
use crate::observable::ObservableBox;

/// Read/write handle to the ambient published value of type `T`.
pub struct Accessor<T> {
    env: Environment,
    _marker: PhantomData<T>,
}

impl<T> Clone for Accessor<T> {
    fn clone(&self) -> Self {
        Self {
            env: self.env.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Accessor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessor")
            .field("ty", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Accessor<T> {
    /// Create an accessor over `env`. Resolution happens per call, not here,
    /// so constructing an accessor in a scope with no publication is fine as
    /// long as it is never used.
    #[must_use]
    pub fn new(env: &Environment) -> Self {
        Self {
            env: env.clone(),
            _marker: PhantomData,
        }
    }

    /// Read the ambient value.
    ///
    /// # Panics
    ///
    /// Panics if no ancestor published a box of type `T`, or if the
    /// publishing attachment was torn down.
    #[must_use]
    pub fn get(&self) -> T {
        self.resolve().value()
    }

    /// Read the ambient value by reference.
    ///
    /// # Panics
    ///
    /// Same conditions as [`get`](Self::get).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.resolve().with(f)
    }

    /// Write the ambient value. Triggers the same notification path as any
    /// other box mutation, so the change flows back to the external slot.
    ///
    /// # Panics
    ///
    /// Same conditions as [`get`](Self::get).
    pub fn set(&self, value: T) {
        self.resolve().set_value(value);
    }

    fn resolve(&self) -> ObservableBox<T> {
        self.env.lookup::<T>().unwrap_or_else(|| {
            panic!(
                "no {} published in the ambient environment; \
                 an ancestor must publish before descendants read or write",
                std::any::type_name::<T>()
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

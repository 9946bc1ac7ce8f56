#![forbid(unsafe_code)]

//! Ambient, type-keyed environment with lexical shadowing.
//!
//! # Design
//!
//! An [`Environment`] is a persistent chain of frames, each mapping one
//! `TypeId` to a published [`WeakBox`]. Publishing never mutates the parent:
//! it allocates a new frame pointing at the old head and returns a *child*
//! environment, so sibling subtrees and ancestors are unaffected. Lookup
//! walks the chain from the innermost frame outward; the first frame keyed by
//! the requested type wins, which yields lexical-scoping-style shadowing —
//! a nested publish of the same type hides the outer one for its descendants
//! only, it never merges with it.
//!
//! Frames hold *weak* handles. The strong handle lives in the
//! [`Attachment`](crate::sync::Attachment) that published the box, so when the
//! owning subtree detaches, the box dies even if stale environments linger.
//!
//! # Invariants
//!
//! 1. `Clone` is a cheap handle copy; environments are value-passed down the
//!    composition tree.
//! 2. At most one box per type is visible from a given environment
//!    (innermost publish wins).
//! 3. `lookup` never allocates and never mutates.
//!
//! # Failure Modes
//!
//! - Lookup of a type whose frame exists but whose attachment was torn down
//!   **panics**: only a lifecycle bug in the surrounding composition can
//!   retain an environment past its attachment.

use std::any::{Any, TypeId};
use std::rc::Rc;

use crate::observable::{ObservableBox, WeakBox};

/// One published entry: a type key and the type-erased weak box handle.
struct Frame {
    key: TypeId,
    entry: Rc<dyn Any>,
    parent: Option<Rc<Frame>>,
}

/// An ambient, type-keyed registry of published observable boxes.
///
/// Passed explicitly down the composition tree in place of a framework's
/// implicit environment. An empty environment publishes nothing.
#[derive(Clone, Default)]
pub struct Environment {
    head: Option<Rc<Frame>>,
}

impl Environment {
    /// An empty root environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend this environment with a published box, returning the child
    /// environment for descendants. The parent is untouched.
    pub(crate) fn extend<T: Clone + PartialEq + 'static>(&self, weak: WeakBox<T>) -> Self {
        Self {
            head: Some(Rc::new(Frame {
                key: TypeId::of::<T>(),
                entry: Rc::new(weak),
                parent: self.head.clone(),
            })),
        }
    }

    /// Look up the innermost published box of type `T`.
    ///
    /// Returns `None` when no ancestor published a box of this type.
    ///
    /// # Panics
    ///
    /// Panics if a box of type `T` *was* published here but its attachment
    /// has since been torn down. Reaching such a frame means a descendant
    /// outlived its subtree, which is a bug in the caller's lifecycle
    /// management, not a runtime condition to recover from.
    #[must_use]
    pub fn lookup<T: Clone + PartialEq + 'static>(&self) -> Option<ObservableBox<T>> {
        let key = TypeId::of::<T>();
        let mut frame = self.head.as_deref();
        while let Some(f) = frame {
            if f.key == key {
                let weak = f
                    .entry
                    .downcast_ref::<WeakBox<T>>()
                    .unwrap_or_else(|| {
                        panic!(
                            "environment frame for {} holds a mismatched entry",
                            std::any::type_name::<T>()
                        )
                    });
                return Some(weak.upgrade().unwrap_or_else(|| {
                    panic!(
                        "published {} used after its attachment was torn down",
                        std::any::type_name::<T>()
                    )
                }));
            }
            frame = f.parent.as_deref();
        }
        None
    }

    /// Number of frames visible from this environment (shadowed frames
    /// included). Diagnostic only.
    #[must_use]
    pub(crate) fn depth(&self) -> usize {
        let mut n = 0;
        let mut frame = self.head.as_deref();
        while let Some(f) = frame {
            n += 1;
            frame = f.parent.as_deref();
        }
        n
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("depth", &self.depth())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

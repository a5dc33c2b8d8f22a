// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payload types stored in a [`Context`](crate::Context).
//!
//! Any `'static` type can ride along in a context once it implements the
//! [`Element`] marker trait.  Elements are looked up by their concrete type and
//! edited by identity, so there is nothing else they have to provide.
//!
//! ```
//! use ambient_context::{Context, Element};
//!
//! #[derive(Debug)]
//! struct TenantId(u32);
//! impl Element for TenantId {}
//!
//! let ctx = Context::of(TenantId(7));
//! assert_eq!(ctx.find::<TenantId>().map(|t| t.0), Some(7));
//! ```
//!
//! # Thread-sync elements
//!
//! Some code doesn't know about contexts and reads its own thread-local state
//! directly.  An element that must mirror itself into such state implements
//! [`ThreadSync`] and advertises it through [`Element::as_thread_sync`]:
//!
//! ```
//! use ambient_context::{Context, DynThreadSync, Element, ThreadSync};
//! use std::cell::RefCell;
//!
//! thread_local! {
//!     static LEGACY_USER: RefCell<Option<String>> = const { RefCell::new(None) };
//! }
//!
//! #[derive(Debug)]
//! struct User(String);
//!
//! impl ThreadSync for User {
//!     type Saved = Option<String>;
//!     fn on_enter(&self) -> Self::Saved {
//!         LEGACY_USER.with(|u| u.replace(Some(self.0.clone())))
//!     }
//!     fn on_exit(&self, saved: Self::Saved) {
//!         LEGACY_USER.with(|u| *u.borrow_mut() = saved);
//!     }
//! }
//!
//! impl Element for User {
//!     fn as_thread_sync(&self) -> Option<&dyn DynThreadSync> {
//!         Some(self)
//!     }
//! }
//!
//! let ctx = Context::of(User("alice".to_string()));
//! ctx.propagate_with(|| {
//!     LEGACY_USER.with(|u| assert_eq!(u.borrow().as_deref(), Some("alice")));
//! });
//! LEGACY_USER.with(|u| assert!(u.borrow().is_none()));
//! ```

use std::any::Any;
use std::fmt::Debug;

/// A unit of ambient payload.
///
/// Elements should be immutable values: one context may be active on several
/// threads at the same time, and every thread sees the same element instances.
pub trait Element: Any + Debug + Send + Sync {
    /// Returns the element's [`ThreadSync`] capability, if it has one.
    ///
    /// Contexts ask this once, when they are built, and skip the thread-sync
    /// pass entirely on activation when no element answers `Some`.
    fn as_thread_sync(&self) -> Option<&dyn DynThreadSync> {
        None
    }
}

/// Projects an element into separate, mutable thread-local state for as long
/// as a context holding it is active.
///
/// `on_enter` runs once per activation, and the value it returns is handed
/// back to `on_exit` when the activation's [`Scope`](crate::Scope) closes.
///
/// Within one context, elements are entered in insertion order and exited in
/// the *same* order, not reversed.  Two thread-sync elements that touch the
/// same underlying state should not rely on nested unwinding.
pub trait ThreadSync {
    /// Whatever `on_enter` displaced and `on_exit` needs to put back.
    type Saved: 'static;

    fn on_enter(&self) -> Self::Saved;

    fn on_exit(&self, saved: Self::Saved);
}

/// Type-erased state returned by [`DynThreadSync::enter`].
#[derive(Debug)]
pub struct SavedState(Box<dyn Any>);

/// Object-safe form of [`ThreadSync`].
///
/// Implemented for every [`ThreadSync`] type; element authors only name it in
/// the return type of [`Element::as_thread_sync`].
pub trait DynThreadSync {
    fn enter(&self) -> SavedState;

    fn exit(&self, saved: SavedState);
}

impl<T: ThreadSync> DynThreadSync for T {
    fn enter(&self) -> SavedState {
        SavedState(Box::new(self.on_enter()))
    }

    fn exit(&self, saved: SavedState) {
        match saved.0.downcast::<T::Saved>() {
            Ok(saved) => self.on_exit(*saved),
            Err(_) => {
                let expected = std::any::type_name::<T::Saved>();
                logwise::warn_sync!(
                    "Discarding thread-sync state that was not produced by this element (expected {expected})",
                    expected = expected
                );
            }
        }
    }
}

/// Downcasts a stored element to its concrete type.
#[inline]
pub(crate) fn downcast<T: Element>(element: &dyn Element) -> Option<&T> {
    let any: &dyn Any = element;
    any.downcast_ref::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct Plain;
    impl Element for Plain {}

    // 0 means on_exit never ran
    #[derive(Debug, Default)]
    struct Counter {
        entered: AtomicU32,
        exited_with: AtomicU32,
    }

    impl ThreadSync for Counter {
        type Saved = u32;
        fn on_enter(&self) -> u32 {
            (self.entered.fetch_add(1, Ordering::Relaxed) + 1) * 10
        }
        fn on_exit(&self, saved: u32) {
            self.exited_with.store(saved, Ordering::Relaxed);
        }
    }

    impl Element for Counter {
        fn as_thread_sync(&self) -> Option<&dyn DynThreadSync> {
            Some(self)
        }
    }

    #[test]
    fn plain_elements_have_no_capability() {
        assert!(Plain.as_thread_sync().is_none());
    }

    #[test]
    fn erased_state_round_trips_to_on_exit() {
        let counter = Counter::default();
        let sync = counter.as_thread_sync().unwrap();
        let saved = sync.enter();
        sync.exit(saved);
        assert_eq!(counter.exited_with.load(Ordering::Relaxed), 10);
    }

    #[test]
    fn mismatched_state_is_dropped() {
        let counter = Counter::default();
        counter.exit(SavedState(Box::new("not a u32")));
        assert_eq!(counter.exited_with.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn downcast_by_concrete_type() {
        let plain: &dyn Element = &Plain;
        assert!(downcast::<Plain>(plain).is_some());
        assert!(downcast::<Counter>(plain).is_none());
    }
}

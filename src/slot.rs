// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-thread storage for the active [`Context`].
//!
//! Each thread holds at most one context reference.  Two backings implement the
//! same `get`/`set`/`remove` interface:
//!
//! - [`SlotBacking::Native`]: a `const`-initialized `thread_local!` cell.
//! - [`SlotBacking::Shared`]: a process-wide map keyed by [`ThreadId`], guarded
//!   by a [`wasm_safe_mutex::Mutex`] so it can be used from the wasm main thread.
//!
//! The backing is chosen once, the first time any thread touches the slot.  The
//! native slot is probed and the shared map is used if the probe fails (for
//! example when the first activation happens inside a thread-local destructor).
//! The `portable_slot` feature skips the probe and always picks the shared map.
//! Both behave identically; only their cost differs.

use crate::Context;
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::thread::ThreadId;

/// Which storage strategy holds each thread's active context.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlotBacking {
    /// Native thread-local storage.
    Native,
    /// Shared registry keyed by thread ID.
    Shared,
}

/// The calling thread's storage is gone, so nothing was stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SlotUnavailable;

/// Uniform access to "the active context of the calling thread".
pub(crate) trait ThreadLocalSlot: Sync {
    fn backing(&self) -> SlotBacking;

    fn get(&self) -> Option<Context>;

    /// Stores `context`, returning whatever it displaced.
    ///
    /// Fails when the calling thread's storage has already been torn down; the
    /// context is dropped in that case.
    fn set(&self, context: Context) -> Result<Option<Context>, SlotUnavailable>;

    /// Clears the entry for this thread, returning what was there.
    fn remove(&self) -> Option<Context>;
}

thread_local! {
    static NATIVE: Cell<Option<Context>> = const { Cell::new(None) };
}

#[derive(Debug)]
pub(crate) struct NativeSlot;

impl ThreadLocalSlot for NativeSlot {
    fn backing(&self) -> SlotBacking {
        SlotBacking::Native
    }

    #[inline]
    fn get(&self) -> Option<Context> {
        NATIVE
            .try_with(|cell| {
                let current = cell.take();
                let copy = current.clone();
                cell.set(current);
                copy
            })
            .unwrap_or(None)
    }

    #[inline]
    fn set(&self, context: Context) -> Result<Option<Context>, SlotUnavailable> {
        // The closure only runs if storage is still alive; otherwise the
        // context is dropped with it.
        NATIVE
            .try_with(|cell| cell.replace(Some(context)))
            .map_err(|_| {
                logwise::warn_sync!(
                    "Thread-local storage is gone on this thread; the context was not stored"
                );
                SlotUnavailable
            })
    }

    #[inline]
    fn remove(&self) -> Option<Context> {
        NATIVE.try_with(|cell| cell.take()).unwrap_or(None)
    }
}

pub(crate) struct SharedSlot {
    contexts: wasm_safe_mutex::Mutex<HashMap<ThreadId, Context>>,
}

impl SharedSlot {
    pub(crate) fn new() -> Self {
        SharedSlot {
            contexts: wasm_safe_mutex::Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.contexts.lock_sync().len()
    }
}

impl ThreadLocalSlot for SharedSlot {
    fn backing(&self) -> SlotBacking {
        SlotBacking::Shared
    }

    fn get(&self) -> Option<Context> {
        let id = std::thread::current().id();
        self.contexts.lock_sync().get(&id).cloned()
    }

    fn set(&self, context: Context) -> Result<Option<Context>, SlotUnavailable> {
        let id = std::thread::current().id();
        Ok(self.contexts.lock_sync().insert(id, context))
    }

    fn remove(&self) -> Option<Context> {
        let id = std::thread::current().id();
        self.contexts.lock_sync().remove(&id)
    }
}

static SLOT: OnceLock<&'static dyn ThreadLocalSlot> = OnceLock::new();
static SHARED: OnceLock<SharedSlot> = OnceLock::new();

fn shared() -> &'static SharedSlot {
    SHARED.get_or_init(SharedSlot::new)
}

fn select() -> &'static dyn ThreadLocalSlot {
    if cfg!(feature = "portable_slot") {
        logwise::debuginternal_sync!("portable_slot enabled; using the shared context slot");
        return shared();
    }
    match NATIVE.try_with(|_| ()) {
        Ok(()) => {
            logwise::debuginternal_sync!("Using the native thread-local context slot");
            &NativeSlot
        }
        Err(_) => {
            logwise::debuginternal_sync!(
                "Native thread-local storage unavailable; using the shared context slot"
            );
            shared()
        }
    }
}

/// The process-wide slot, selected on first use.
#[inline]
pub(crate) fn slot() -> &'static dyn ThreadLocalSlot {
    *SLOT.get_or_init(select)
}

/// Returns the backing selected for this process.
///
/// # Examples
///
/// ```
/// use ambient_context::slot::{selected_backing, SlotBacking};
///
/// let backing = selected_backing();
/// assert!(matches!(backing, SlotBacking::Native | SlotBacking::Shared));
/// // Selection happens once.
/// assert_eq!(backing, selected_backing());
/// ```
pub fn selected_backing() -> SlotBacking {
    slot().backing()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Context, Element};

    #[derive(Debug)]
    struct Marker(&'static str);
    impl Element for Marker {}

    fn exercise(slot: &dyn ThreadLocalSlot) {
        assert!(slot.get().is_none());

        let first = Context::of(Marker("first"));
        assert_eq!(slot.set(first.clone()), Ok(None));
        assert_eq!(slot.get(), Some(first.clone()));

        let second = Context::of(Marker("second"));
        assert_eq!(slot.set(second.clone()), Ok(Some(first)));
        assert_eq!(slot.get(), Some(second.clone()));

        assert_eq!(slot.remove(), Some(second));
        assert!(slot.get().is_none());
        assert!(slot.remove().is_none());
    }

    #[test]
    fn shared_slot_get_set_remove() {
        let slot = SharedSlot::new();
        exercise(&slot);
        assert_eq!(slot.len(), 0);
    }

    #[test]
    fn shared_slot_is_per_thread() {
        let slot = std::sync::Arc::new(SharedSlot::new());
        let ctx = Context::of(Marker("main"));
        assert_eq!(slot.set(ctx.clone()), Ok(None));

        let remote = slot.clone();
        std::thread::spawn(move || {
            assert!(remote.get().is_none());
            assert_eq!(remote.set(Context::of(Marker("worker"))), Ok(None));
            assert_eq!(
                remote.get().and_then(|c| c.find::<Marker>().map(|m| m.0)),
                Some("worker")
            );
            remote.remove();
        })
        .join()
        .unwrap();

        assert_eq!(slot.get(), Some(ctx));
        slot.remove();
        assert_eq!(slot.len(), 0);
    }

    #[test]
    fn native_slot_get_set_remove() {
        // Runs on a fresh thread so the process-wide slot's state is untouched.
        std::thread::spawn(|| exercise(&NativeSlot)).join().unwrap();
    }

    #[test]
    fn selection_is_stable() {
        let first = selected_backing();
        let from_other_thread = std::thread::spawn(selected_backing).join().unwrap();
        assert_eq!(first, from_other_thread);
        if cfg!(feature = "portable_slot") {
            assert_eq!(first, SlotBacking::Shared);
        } else {
            assert_eq!(first, SlotBacking::Native);
        }
    }
}

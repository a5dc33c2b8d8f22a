// SPDX-License-Identifier: MIT OR Apache-2.0

//! The guard returned by [`Context::activate`].

use std::fmt::Debug;
use std::marker::PhantomData;

use super::context_impl::Context;
use crate::element::SavedState;
use crate::slot::ThreadLocalSlot;

/// Everything needed to undo one activation.
struct Restore {
    slot: &'static dyn ThreadLocalSlot,
    context: Context,
    prev: Option<Context>,
    /// One entry per thread-sync element of `context` that was entered, in order.
    saved: Vec<SavedState>,
}

impl Debug for Restore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Restore")
            .field("backing", &self.slot.backing())
            .field("context", &self.context)
            .field("prev", &self.prev)
            .field("saved", &self.saved)
            .finish()
    }
}

impl Restore {
    fn release(self) {
        let Restore {
            slot,
            context,
            prev,
            saved,
        } = self;

        if !saved.is_empty() {
            for (sync, saved) in context.thread_sync_elements().zip(saved) {
                sync.exit(saved);
            }
        }

        #[cfg(debug_assertions)]
        {
            if slot.get().as_ref() != Some(&context) {
                logwise::warn_sync!(
                    "Closing a scope whose context is no longer current; scopes were closed out of order"
                );
            }
        }
        match prev {
            Some(prev) => {
                let _ = slot.set(prev);
            }
            None => {
                slot.remove();
            }
        }
    }
}

/// Keeps a [`Context`] current on this thread.
///
/// Returned by [`Context::activate`].  Dropping the scope, or calling
/// [`close`](Scope::close), exits the context's thread-sync elements and
/// restores whatever was current before the activation.  Because `close` takes
/// the scope by value and drop runs at most once, each activation is undone
/// exactly once, including during unwinding.
///
/// A scope belongs to the thread that created it and is not `Send`.
///
/// Scopes should be closed in the reverse order they were opened.  Each scope
/// puts back exactly the context it displaced, whatever is current at the
/// time, and a warning is logged in debug builds when that context is not its
/// own.  Closing an outer scope first therefore leaves the thread holding a
/// stale context: with `a` then `b` active, closing `a` clears the thread and
/// closing `b` afterwards makes `a` current again, where it stays on a pooled
/// thread after every scope is gone.
#[derive(Debug)]
#[must_use = "dropping a Scope immediately restores the previous context"]
pub struct Scope {
    restore: Option<Restore>,
    _not_send: PhantomData<*const ()>,
}

impl Scope {
    /// A scope that restores nothing.
    pub(crate) fn noop() -> Scope {
        Scope {
            restore: None,
            _not_send: PhantomData,
        }
    }

    pub(crate) fn activated(
        slot: &'static dyn ThreadLocalSlot,
        context: Context,
        prev: Option<Context>,
    ) -> Scope {
        Scope {
            restore: Some(Restore {
                slot,
                context,
                prev,
                saved: Vec::new(),
            }),
            _not_send: PhantomData,
        }
    }

    pub(crate) fn push_saved(&mut self, saved: SavedState) {
        if let Some(restore) = &mut self.restore {
            restore.saved.push(saved);
        }
    }

    /// Whether closing this scope does nothing.
    ///
    /// True when the activation hit the fast path: the context was empty, or
    /// was already current.
    pub fn is_noop(&self) -> bool {
        self.restore.is_none()
    }

    /// The context this scope activated, or `None` for a no-op scope.
    pub fn context(&self) -> Option<&Context> {
        self.restore.as_ref().map(|r| &r.context)
    }

    /// Restores the previous context now.
    pub fn close(self) {
        drop(self)
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if let Some(restore) = self.restore.take() {
            restore.release();
        }
    }
}

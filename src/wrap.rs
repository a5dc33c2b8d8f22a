// SPDX-License-Identifier: MIT OR Apache-2.0

//! Carrying a context across scheduling boundaries.
//!
//! A closure handed to a thread pool, a timer, or another thread runs wherever
//! and whenever the scheduler decides, with that thread's ambient state.  The
//! functions here capture a [`Context`] when the work is *created* and
//! activate it when the work *runs*:
//!
//! ```rust
//! use ambient_context::{wrap_runnable, Context, Element};
//!
//! #[derive(Debug)]
//! struct Principal(&'static str);
//! impl Element for Principal {}
//!
//! let ctx = Context::of(Principal("alice"));
//! let job = wrap_runnable(ctx, || {
//!     assert_eq!(Context::current().unwrap().get::<Principal>().unwrap().0, "alice");
//! });
//! std::thread::spawn(move || job.call_once()).join().unwrap();
//! ```
//!
//! The context is released when the work returns or panics; errors and panics
//! from the work reach the caller unchanged.

use crate::Context;

/// Deferred work bundled with the context it should run under.
///
/// Which call method is available depends on what `F` is: [`call_once`]
/// for `FnOnce`, [`call_mut`] for `FnMut`, [`call`] for `Fn`, and
/// [`apply`] for `Fn(A)`.  Each one activates the captured context, runs the
/// work, and closes the scope before returning.
///
/// When built by [`wrap_current_or_identity`] on a thread with no active
/// context, there is nothing to activate and the work is called directly.
///
/// [`call_once`]: Wrapped::call_once
/// [`call_mut`]: Wrapped::call_mut
/// [`call`]: Wrapped::call
/// [`apply`]: Wrapped::apply
#[derive(Debug, Clone)]
pub struct Wrapped<F> {
    context: Option<Context>,
    f: F,
}

impl<F> Wrapped<F> {
    /// The captured context, if any.
    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    /// Unwraps the work, discarding the captured context.
    pub fn into_inner(self) -> F {
        self.f
    }
}

impl<F, R> Wrapped<F>
where
    F: FnOnce() -> R,
{
    /// Runs the work once under the captured context.
    pub fn call_once(self) -> R {
        let Wrapped { context, f } = self;
        let _scope = context.as_ref().map(Context::activate);
        f()
    }

    /// Turns this into a plain closure, e.g. for [`std::thread::spawn`].
    pub fn into_fn(self) -> impl FnOnce() -> R {
        move || self.call_once()
    }
}

impl<F, R> Wrapped<F>
where
    F: FnMut() -> R,
{
    /// Runs the work under the captured context, keeping it for another call.
    pub fn call_mut(&mut self) -> R {
        let _scope = self.context.as_ref().map(Context::activate);
        (self.f)()
    }
}

impl<F, R> Wrapped<F>
where
    F: Fn() -> R,
{
    /// Runs the work under the captured context through a shared reference,
    /// so one `Wrapped` can be called from several threads.
    pub fn call(&self) -> R {
        let _scope = self.context.as_ref().map(Context::activate);
        (self.f)()
    }
}

impl<F> Wrapped<F> {
    /// Calls the wrapped function with `arg` under the captured context.
    pub fn apply<A, R>(&self, arg: A) -> R
    where
        F: Fn(A) -> R,
    {
        let _scope = self.context.as_ref().map(Context::activate);
        (self.f)(arg)
    }
}

/// Wraps work that returns nothing.
///
/// `f` may be any closure.  The returned [`Wrapped`] offers
/// [`call`](Wrapped::call) or [`call_mut`](Wrapped::call_mut) when `f` can be
/// called more than once, so a callback wrapped at creation time can be run
/// repeatedly by a timer or a pool.
pub fn wrap_runnable<F>(context: Context, f: F) -> Wrapped<F> {
    Wrapped {
        context: Some(context),
        f,
    }
}

/// Wraps work that produces a value.
pub fn wrap_supplier<F>(context: Context, f: F) -> Wrapped<F> {
    Wrapped {
        context: Some(context),
        f,
    }
}

/// Wraps fallible work.  The error is returned to the caller as-is, after the
/// context has been released.
///
/// ```rust
/// use ambient_context::{wrap_callable, Context, Element};
///
/// #[derive(Debug)]
/// struct Attempt(u32);
/// impl Element for Attempt {}
///
/// let job = wrap_callable(Context::of(Attempt(3)), || -> Result<u32, String> {
///     Err(format!("attempt {} failed", Context::current().unwrap().get::<Attempt>().unwrap().0))
/// });
/// assert_eq!(job.call_once(), Err("attempt 3 failed".to_string()));
/// assert!(Context::try_current().is_none());
/// ```
pub fn wrap_callable<F>(context: Context, f: F) -> Wrapped<F> {
    Wrapped {
        context: Some(context),
        f,
    }
}

/// Wraps a function of one argument; call it with [`Wrapped::apply`].
pub fn wrap_function<F, A, R>(context: Context, f: F) -> Wrapped<F>
where
    F: Fn(A) -> R,
{
    Wrapped {
        context: Some(context),
        f,
    }
}

/// Wraps `f` with the current context if one is active.
///
/// With no active context the result calls `f` directly, without touching
/// thread-local state.
pub fn wrap_current_or_identity<F>(f: F) -> Wrapped<F> {
    Wrapped {
        context: Context::try_current(),
        f,
    }
}

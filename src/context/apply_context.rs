// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async context preservation.

use std::future::Future;
use std::pin::Pin;
use std::task::Poll;

use super::context_impl::Context;

/// A [`Future`] wrapper that preserves context across async executor boundaries.
///
/// Executors may poll a future on a different thread each time, and none of
/// them know about the ambient context.  `ApplyContext` activates its context
/// for the duration of every poll and restores the poller's own context
/// afterwards.
///
/// # Examples
///
/// ```rust
/// use ambient_context::{ApplyContext, Context, Element};
///
/// #[derive(Debug)]
/// struct RequestId(u64);
/// impl Element for RequestId {}
///
/// async fn handler() -> u64 {
///     Context::current().unwrap().get::<RequestId>().unwrap().0
/// }
///
/// # async fn example() {
/// let ctx = Context::of(RequestId(7));
/// let id = ApplyContext::new(ctx, handler()).await;
/// assert_eq!(id, 7);
/// # }
/// ```
///
/// [`Context::apply`] is shorthand for `ApplyContext::new(context.clone(), future)`.
///
/// # Implementation Details
///
/// Each poll:
/// 1. Activates the wrapped context (a no-op if it is already current)
/// 2. Polls the inner future
/// 3. Closes the scope, restoring the poller's context
///
/// A [`Scope`](crate::Scope) opened inside the inner future must not be held
/// across an `.await`; it would outlive the poll that opened it.
#[derive(Debug)]
pub struct ApplyContext<F>(Context, F);

impl<F> ApplyContext<F> {
    /// Creates a new `ApplyContext` wrapper.
    pub fn new(context: Context, f: F) -> Self {
        Self(context, f)
    }

    /// The context activated around each poll.
    pub fn context(&self) -> &Context {
        &self.0
    }
}

impl<F> Future for ApplyContext<F>
where
    F: Future,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        // SAFETY: the inner future is never moved out of `self`; the context is
        // only borrowed.
        let (context, fut) = unsafe {
            let d = self.get_unchecked_mut();
            (&d.0, Pin::new_unchecked(&mut d.1))
        };
        let _scope = context.activate();
        fut.poll(cx)
    }
}

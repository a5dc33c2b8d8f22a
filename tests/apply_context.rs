// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keeping a context current across the polls of a future.

use ambient_context::{ApplyContext, Context, Element};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll, Waker};
use std::thread;

#[derive(Debug, PartialEq)]
struct RequestId(u64);
impl Element for RequestId {}

fn request_id() -> Option<u64> {
    Context::try_current().and_then(|c| c.find::<RequestId>().map(|r| r.0))
}

/// Returns `Pending` once, then completes.
struct YieldOnce(bool);

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<()> {
        if self.0 {
            Poll::Ready(())
        } else {
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

#[test_executors::async_test]
async fn apply_context_activates_during_poll() {
    let ctx = Context::of(RequestId(7));
    let seen = ctx.apply(async { request_id() }).await;
    assert_eq!(seen, Some(7));
    assert_eq!(request_id(), None);
}

#[test_executors::async_test]
async fn nested_apply_prefers_inner_context() {
    let outer = Context::of(RequestId(1));
    let inner = Context::of(RequestId(2));
    let seen = ApplyContext::new(outer, async move {
        let before = request_id();
        let during = inner.apply(async { request_id() }).await;
        (before, during, request_id())
    })
    .await;
    assert_eq!(seen, (Some(1), Some(2), Some(1)));
}

#[test]
fn context_is_restored_between_polls_and_follows_the_future() {
    let ctx = Context::of(RequestId(42));
    let mut fut = Box::pin(ctx.apply(async {
        let first = request_id();
        YieldOnce(false).await;
        (first, request_id())
    }));

    let mut cx = TaskContext::from_waker(Waker::noop());
    assert!(fut.as_mut().poll(&mut cx).is_pending());
    assert_eq!(request_id(), None);

    // Finish on a different thread, which has a context of its own.
    let (result, after) = thread::spawn(move || {
        let _theirs = Context::of(RequestId(99)).activate();
        let mut cx = TaskContext::from_waker(Waker::noop());
        let result = match fut.as_mut().poll(&mut cx) {
            Poll::Ready(v) => v,
            Poll::Pending => panic!("future should be ready after one yield"),
        };
        (result, request_id())
    })
    .join()
    .unwrap();

    assert_eq!(result, (Some(42), Some(42)));
    assert_eq!(after, Some(99));
}

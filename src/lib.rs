//SPDX-License-Identifier: MIT OR Apache-2.0
/*!
# ambient_context

ambient_context carries request-scoped state through a call chain, and across thread hops, without
passing it as a parameter.

# Development status

ambient_context is experimental and the API may change.

# The problem

A request arrives.  Somewhere near the top, you know the trace ID, the authenticated user, the tenant.
Twenty calls down, a database helper wants the tenant and a log line wants the trace ID.  You can add
a parameter to all twenty functions, or you can make the state *ambient*: established once, readable
anywhere below.

Ambient state is usually a thread-local, and naive thread-locals have problems:

* Nested activations must restore the outer state exactly, on every exit path, panics included.
* Work handed to a thread pool runs with the *pool thread's* state, not the caller's.
* Pooled threads keep whatever was left in their thread-local, and leak it into the next job.
* Some libraries already read their own thread-local and don't know about yours.

# The design

A [`Context`] is an immutable, ordered list of [`Element`]s.  Editing returns a new context; nothing
is ever mutated in place, so one context can be active on many threads at once.

[`Context::activate`] makes a context current on the calling thread and returns a [`Scope`].  Dropping
the scope puts back whatever was current before.  When the outermost scope closes, the thread's entry
is removed, not reset.

```rust
use ambient_context::{Context, Element};

#[derive(Debug)]
struct UserId(&'static str);
impl Element for UserId {}

let ctx = Context::empty().with_element(UserId("u1"));
let scope = ctx.activate();
assert_eq!(Context::current().unwrap().get::<UserId>().unwrap().0, "u1");
scope.close();
assert!(Context::try_current().is_none());
```

Lookups scan from the oldest element, so the earliest element of a type wins.

# Crossing threads

[`wrap_runnable`], [`wrap_supplier`], [`wrap_callable`] and [`wrap_function`] capture a context
when work is created and activate it when the work runs, wherever that is.  [`wrap_current_or_identity`]
captures whatever is current, and costs nothing when nothing is.  For futures, [`ApplyContext`]
activates the context around every poll.

# Legacy thread-locals

An element that implements [`ThreadSync`] is told when a context holding it becomes current
(`on_enter`) and when it stops being current (`on_exit`), so it can mirror itself into
thread-local state owned by code that doesn't know about contexts.  Contexts remember whether they
hold any such element, and skip the pass entirely when they don't.

# Errors

[`Context::current`] fails with [`NoActiveContext`]; [`Context::get`] fails with [`ElementNotFound`].
They are separate types, since "nothing is active" and "this piece is missing" usually call
for different handling.

# Storage

The per-thread slot is a native `thread_local!` when available and a shared, thread-keyed map
otherwise; see [`slot`].  The `portable_slot` feature forces the latter.
*/

pub mod context;
mod element;
mod error;
pub mod slot;
mod wrap;

logwise::declare_logging_domain!();

pub use context::{ApplyContext, Context, MutableContextBuilder, Scope};
pub use element::{DynThreadSync, Element, SavedState, ThreadSync};
pub use error::{ContextError, ElementNotFound, NoActiveContext};
pub use wrap::{
    Wrapped, wrap_callable, wrap_current_or_identity, wrap_function, wrap_runnable, wrap_supplier,
};

// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thread-scoped ambient context.
//!
//! This module provides the core of the crate: an immutable [`Context`] that a
//! thread can make *current*, so that code deep in a call chain can read
//! request-scoped state without it being passed through every signature.
//!
//! # Overview
//!
//! - [`Context`]: an immutable, ordered collection of [`Element`](crate::Element)s.
//!   Edits return new contexts.
//! - [`Scope`]: the guard returned by [`Context::activate`].  Dropping it
//!   restores whatever was current before.
//! - [`MutableContextBuilder`]: accumulates several edits before a single
//!   activation.
//! - [`ApplyContext`]: a [`Future`] wrapper that keeps a context current
//!   across polls on any executor thread.
//!
//! # Thread-Local Context Management
//!
//! Each thread has at most one current context.  Activations nest: every
//! [`Scope`] remembers the context it displaced and puts it back when closed.
//! When the outermost scope closes, the thread's entry is removed rather than
//! reset, so pooled threads don't carry a stale context into their next job.
//!
//! ```rust
//! use ambient_context::{Context, Element};
//!
//! #[derive(Debug)]
//! struct Tenant(&'static str);
//! impl Element for Tenant {}
//!
//! assert!(Context::try_current().is_none());
//!
//! let ctx = Context::current_or_empty().with_element(Tenant("acme"));
//! {
//!     let _scope = ctx.activate();
//!     let tenant = Context::current().unwrap();
//!     assert_eq!(tenant.get::<Tenant>().unwrap().0, "acme");
//! }
//!
//! assert!(Context::try_current().is_none());
//! ```
//!
//! # Precedence
//!
//! Lookups scan from the oldest element, so an element established further out
//! wins over a later addition of the same type.  Use
//! [`Context::replace_element`] to override deliberately.
//!
//! # Async Context Preservation
//!
//! ```rust
//! use ambient_context::{Context, Element};
//! # async fn async_operation() {}
//!
//! #[derive(Debug)]
//! struct Tenant(&'static str);
//! impl Element for Tenant {}
//!
//! # async fn example() {
//! let ctx = Context::of(Tenant("acme"));
//! ctx.apply(async_operation()).await;
//! # }
//! ```

mod apply_context;
mod builder;
mod context_impl;
mod scope;


// Re-export public types
pub use apply_context::ApplyContext;
pub use builder::MutableContextBuilder;
pub use context_impl::Context;
pub use scope::Scope;

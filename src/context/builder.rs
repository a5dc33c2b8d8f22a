// SPDX-License-Identifier: MIT OR Apache-2.0

//! Incremental context editing.

use std::sync::Arc;

use super::context_impl::Context;
use super::scope::Scope;
use crate::element::Element;

/// Accumulates edits to a [`Context`] before it is activated.
///
/// Holds exactly one context and swaps it for the result of each edit, so a
/// chain of interceptors can each contribute elements without threading the
/// intermediate contexts through by hand.  This is a single-owner construction
/// helper; share the finished [`Context`], not the builder.
///
/// # Examples
///
/// ```rust
/// use ambient_context::{Context, Element, MutableContextBuilder};
///
/// #[derive(Debug)]
/// struct TraceId(u64);
/// impl Element for TraceId {}
///
/// #[derive(Debug)]
/// struct Locale(&'static str);
/// impl Element for Locale {}
///
/// let mut builder = MutableContextBuilder::from_current();
/// builder.add(TraceId(42)).add(Locale("en_US"));
///
/// let ctx = builder.snapshot();
/// assert_eq!(ctx.len(), 2);
/// ctx.propagate_with(|| {
///     assert_eq!(Context::current().unwrap().get::<Locale>().unwrap().0, "en_US");
/// });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MutableContextBuilder {
    context: Context,
}

impl MutableContextBuilder {
    /// Starts from `initial`.
    pub fn of(initial: Context) -> Self {
        MutableContextBuilder { context: initial }
    }

    /// Starts from the current context of this thread, or the empty context.
    pub fn from_current() -> Self {
        Self::of(Context::current_or_empty())
    }

    /// Appends `element`.  See [`Context::with_element`].
    pub fn add<E: Element>(&mut self, element: E) -> &mut Self {
        self.context = self.context.with_element(element);
        self
    }

    /// Adds an element the caller keeps a handle to, so it can later be passed
    /// to [`remove`](Self::remove) or [`replace`](Self::replace).
    pub fn add_shared<E: Element>(&mut self, element: Arc<E>) -> &mut Self {
        self.context = self.context.with_shared(element);
        self
    }

    /// Removes `element`, matched by identity.  See [`Context::without_element`].
    pub fn remove<E: Element>(&mut self, element: &E) -> &mut Self {
        self.context = self.context.without_element(element);
        self
    }

    /// Swaps `old` for `new` in place, matched by identity.  See
    /// [`Context::replace_element`].
    pub fn replace<E: Element, N: Element>(&mut self, old: &E, new: N) -> &mut Self {
        self.context = self.context.replace_element(old, new);
        self
    }

    /// The context accumulated so far.  Does not activate it.
    pub fn snapshot(&self) -> Context {
        self.context.clone()
    }

    /// Borrows the accumulated context.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Consumes the builder, returning the accumulated context.
    pub fn into_context(self) -> Context {
        self.context
    }

    /// Activates the accumulated context.  See [`Context::activate`].
    pub fn activate(&self) -> Scope {
        self.context.activate()
    }
}

impl From<Context> for MutableContextBuilder {
    fn from(context: Context) -> Self {
        Self::of(context)
    }
}

impl From<MutableContextBuilder> for Context {
    fn from(builder: MutableContextBuilder) -> Self {
        builder.into_context()
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core Context implementation.

use std::fmt::Debug;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

use super::apply_context::ApplyContext;
use super::scope::Scope;
use crate::element::{self, DynThreadSync, Element};
use crate::error::{ContextError, ElementNotFound, NoActiveContext};
use crate::slot::{ThreadLocalSlot, slot};
use crate::wrap::{self, Wrapped};

/// Internal context data.
///
/// Never mutated once built; every edit produces a new `ContextInner`.
pub(crate) struct ContextInner {
    pub(crate) elements: Box<[Arc<dyn Element>]>,
    /// Whether any element answers [`Element::as_thread_sync`].
    pub(crate) requires_thread_sync: bool,
}

/// An immutable, ordered collection of ambient [`Element`]s.
///
/// A `Context` becomes the *current* context of a thread through
/// [`activate`](Context::activate), and stays current until the returned
/// [`Scope`] is closed.  Code further down the call chain reads it back with
/// [`Context::current`] or [`Context::try_current`] instead of receiving it as
/// a parameter.
///
/// Contexts are cheap to clone (Arc-based) and may be active on many threads
/// at once.  Equality and hashing compare identity, not contents: two contexts
/// are equal only if one is a clone of the other.
///
/// # Examples
///
/// ```rust
/// use ambient_context::{Context, Element};
///
/// #[derive(Debug)]
/// struct UserId(&'static str);
/// impl Element for UserId {}
///
/// let ctx = Context::empty().with_element(UserId("u1"));
/// let scope = ctx.activate();
/// assert_eq!(Context::current().unwrap().get::<UserId>().unwrap().0, "u1");
/// scope.close();
/// assert!(Context::try_current().is_none());
/// ```
#[derive(Clone)]
pub struct Context {
    pub(crate) inner: Arc<ContextInner>,
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Context {}

impl Hash for Context {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state);
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("elements", &self.inner.elements)
            .field("requires_thread_sync", &self.inner.requires_thread_sync)
            .finish()
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::empty()
    }
}

static EMPTY: LazyLock<Context> = LazyLock::new(|| Context::build(Box::new([]), false));

#[inline]
fn is_thread_sync(element: &dyn Element) -> bool {
    element.as_thread_sync().is_some()
}

impl Context {
    fn build(elements: Box<[Arc<dyn Element>]>, requires_thread_sync: bool) -> Context {
        Context {
            inner: Arc::new(ContextInner {
                elements,
                requires_thread_sync,
            }),
        }
    }

    fn from_elements(elements: Box<[Arc<dyn Element>]>) -> Context {
        let requires_thread_sync = elements.iter().any(|e| is_thread_sync(&**e));
        Self::build(elements, requires_thread_sync)
    }

    /// Returns the shared empty context.
    ///
    /// Every call returns the same instance, so `Context::empty() == Context::empty()`.
    #[inline]
    pub fn empty() -> Context {
        EMPTY.clone()
    }

    /// A context holding exactly one element.
    pub fn of<E: Element>(element: E) -> Context {
        let element: Arc<dyn Element> = Arc::new(element);
        Self::from_elements(Box::new([element]))
    }

    /// Returns the context active on this thread.
    ///
    /// # Errors
    ///
    /// [`NoActiveContext`] if nothing is active.  Use this where a context is
    /// expected by construction, and [`try_current`](Context::try_current) or
    /// [`current_or_empty`](Context::current_or_empty) elsewhere.
    #[inline]
    pub fn current() -> Result<Context, NoActiveContext> {
        Self::try_current().ok_or(NoActiveContext)
    }

    /// Returns the context active on this thread, if any.
    #[inline]
    pub fn try_current() -> Option<Context> {
        slot().get()
    }

    /// Returns the context active on this thread, or [`Context::empty`].
    #[inline]
    pub fn current_or_empty() -> Context {
        Self::try_current().unwrap_or_else(Context::empty)
    }

    /// Whether a non-empty context is active on this thread.
    #[inline]
    pub fn exists() -> bool {
        Self::try_current().is_some_and(|c| !c.is_empty())
    }

    /// Looks up an element of the active context and passes it to `f`.
    ///
    /// # Errors
    ///
    /// [`ContextError::NoActiveContext`] if nothing is active, or
    /// [`ContextError::ElementNotFound`] if the active context has no `T`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ambient_context::{Context, ContextError, Element};
    ///
    /// #[derive(Debug)]
    /// struct RequestId(u64);
    /// impl Element for RequestId {}
    ///
    /// assert!(matches!(
    ///     Context::with_current(|r: &RequestId| r.0),
    ///     Err(ContextError::NoActiveContext(_))
    /// ));
    ///
    /// let id = Context::of(RequestId(9)).propagate_with(|| Context::with_current(|r: &RequestId| r.0));
    /// assert_eq!(id, Ok(9));
    /// ```
    pub fn with_current<T: Element, R>(f: impl FnOnce(&T) -> R) -> Result<R, ContextError> {
        let context = Self::current()?;
        let element = context.get::<T>()?;
        Ok(f(element))
    }

    /// Returns a new context with `element` appended.
    ///
    /// Earlier elements of the same type keep precedence in [`find`](Context::find).
    pub fn with_element<E: Element>(&self, element: E) -> Context {
        self.with_shared(Arc::new(element))
    }

    /// Like [`with_element`](Context::with_element), for an element the caller
    /// keeps a handle to.
    ///
    /// The handle can later identify the element to
    /// [`without_element`](Context::without_element) or
    /// [`replace_element`](Context::replace_element).
    pub fn with_shared<E: Element>(&self, element: Arc<E>) -> Context {
        let element: Arc<dyn Element> = element;
        let requires_thread_sync = self.inner.requires_thread_sync || is_thread_sync(&*element);
        let mut elements = Vec::with_capacity(self.inner.elements.len() + 1);
        elements.extend(self.inner.elements.iter().cloned());
        elements.push(element);
        Self::build(elements.into_boxed_slice(), requires_thread_sync)
    }

    /// Returns a new context without `element`.
    ///
    /// `element` is matched by identity: it must be a reference obtained from
    /// this context (through [`find`](Context::find) or [`get`](Context::get))
    /// or the handle passed to [`with_shared`](Context::with_shared).  If no
    /// element matches, the result holds the same elements as `self`.
    pub fn without_element<E: Element>(&self, element: &E) -> Context {
        let elements: Box<[Arc<dyn Element>]> = self
            .inner
            .elements
            .iter()
            .filter(|e| !is_same(e, element))
            .cloned()
            .collect();
        if !self.inner.requires_thread_sync {
            Self::build(elements, false)
        } else {
            Self::from_elements(elements)
        }
    }

    /// Returns a new context with `old` swapped for `new` at the same position.
    ///
    /// `old` is matched by identity, as in [`without_element`](Context::without_element).
    /// If no element matches, the result holds the same elements as `self` and
    /// `new` is dropped.
    pub fn replace_element<E: Element, N: Element>(&self, old: &E, new: N) -> Context {
        let Some(index) = self.position_of(old) else {
            return Self::build(
                self.inner.elements.clone(),
                self.inner.requires_thread_sync,
            );
        };
        let new: Arc<dyn Element> = Arc::new(new);
        let mut elements = self.inner.elements.clone();
        let removed_sync = is_thread_sync(&*elements[index]);
        let added_sync = is_thread_sync(&*new);
        elements[index] = new;
        if removed_sync {
            Self::from_elements(elements)
        } else {
            Self::build(elements, self.inner.requires_thread_sync || added_sync)
        }
    }

    fn position_of<E: Element>(&self, element: &E) -> Option<usize> {
        self.inner.elements.iter().position(|e| is_same(e, element))
    }

    /// Returns the first element of type `T`, scanning from the oldest.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ambient_context::{Context, Element};
    ///
    /// #[derive(Debug)]
    /// struct Principal(&'static str);
    /// impl Element for Principal {}
    ///
    /// let ctx = Context::empty()
    ///     .with_element(Principal("outer"))
    ///     .with_element(Principal("inner"));
    /// assert_eq!(ctx.find::<Principal>().unwrap().0, "outer");
    /// ```
    #[inline]
    pub fn find<T: Element>(&self) -> Option<&T> {
        self.inner
            .elements
            .iter()
            .find_map(|e| element::downcast::<T>(&**e))
    }

    /// Every element of type `T`, oldest first.
    pub fn find_all<T: Element>(&self) -> impl Iterator<Item = &T> {
        self.inner
            .elements
            .iter()
            .filter_map(|e| element::downcast::<T>(&**e))
    }

    /// Returns the first element of type `T`.
    ///
    /// # Errors
    ///
    /// [`ElementNotFound`] if the context has no `T`.
    #[inline]
    pub fn get<T: Element>(&self) -> Result<&T, ElementNotFound> {
        self.find::<T>().ok_or_else(ElementNotFound::of::<T>)
    }

    /// All elements, oldest first.
    pub fn elements(&self) -> impl Iterator<Item = &dyn Element> {
        self.inner.elements.iter().map(|e| &**e)
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.elements.len()
    }

    /// Whether this context has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.elements.is_empty()
    }

    /// Whether activating this context runs [`ThreadSync`](crate::ThreadSync) callbacks.
    #[inline]
    pub fn requires_thread_sync(&self) -> bool {
        self.inner.requires_thread_sync
    }

    pub(crate) fn thread_sync_elements(&self) -> impl Iterator<Item = &dyn DynThreadSync> {
        self.inner.elements.iter().filter_map(|e| e.as_thread_sync())
    }

    /// Makes this the current context of the calling thread until the returned
    /// [`Scope`] is closed.
    ///
    /// Activating an empty context, or the context that is already current, does
    /// not touch thread-local state and returns a no-op scope.
    ///
    /// The same no-op scope is returned when the thread's storage has already
    /// been torn down and the context cannot be stored.
    ///
    /// Otherwise the previous context is remembered, this one is stored, and
    /// every thread-sync element is entered in order.  Closing the scope exits
    /// those elements in the same order and puts the previous context back.  If
    /// there was no previous context, the thread's entry is removed entirely.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ambient_context::{Context, Element};
    ///
    /// #[derive(Debug)]
    /// struct Tag(&'static str);
    /// impl Element for Tag {}
    ///
    /// let outer = Context::of(Tag("outer"));
    /// let inner = outer.with_element(Tag("inner"));
    ///
    /// let a = outer.activate();
    /// {
    ///     let _b = inner.activate();
    ///     assert_eq!(Context::current().unwrap(), inner);
    /// }
    /// assert_eq!(Context::current().unwrap(), outer);
    /// a.close();
    /// assert!(!Context::exists());
    /// ```
    pub fn activate(&self) -> Scope {
        self.activate_in(slot())
    }

    pub(crate) fn activate_in(&self, slot: &'static dyn ThreadLocalSlot) -> Scope {
        if self.is_empty() {
            return Scope::noop();
        }
        let prev = slot.get();
        if prev.as_ref() == Some(self) {
            return Scope::noop();
        }
        if slot.set(self.clone()).is_err() {
            // Nothing was stored, so there is nothing to enter or restore.
            return Scope::noop();
        }
        let mut scope = Scope::activated(slot, self.clone(), prev);
        if self.inner.requires_thread_sync {
            // Entered one at a time so a panicking on_enter still exits the
            // elements before it when the scope unwinds.
            for sync in self.thread_sync_elements() {
                scope.push_saved(sync.enter());
            }
        }
        scope
    }

    /// Runs `f` with this context active and returns its result.
    ///
    /// The context is released when `f` returns or panics.
    #[inline]
    pub fn propagate_with<R>(&self, f: impl FnOnce() -> R) -> R {
        let _scope = self.activate();
        f()
    }

    /// Captures this context around `f`, to be run later, possibly elsewhere.
    ///
    /// See [`wrap_runnable`](crate::wrap_runnable).
    pub fn wrap<F>(&self, f: F) -> Wrapped<F> {
        wrap::wrap_runnable(self.clone(), f)
    }

    /// Captures this context around a value-producing `f`.
    ///
    /// See [`wrap_supplier`](crate::wrap_supplier).
    pub fn wrap_supplying<F>(&self, f: F) -> Wrapped<F> {
        wrap::wrap_supplier(self.clone(), f)
    }

    /// Wraps `future` so this context is active during each of its polls.
    pub fn apply<F: Future>(&self, future: F) -> ApplyContext<F> {
        ApplyContext::new(self.clone(), future)
    }
}

#[inline]
fn is_same<E: Element>(stored: &Arc<dyn Element>, element: &E) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(stored), element as *const E)
}

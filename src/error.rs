// SPDX-License-Identifier: MIT OR Apache-2.0

//! Failure kinds for reading ambient state.
//!
//! "Nothing is active" and "something is active but lacks this element" are
//! separate types, so a caller can tell them apart without inspecting messages.

/// No context has been activated on the calling thread.
///
/// Returned by [`Context::current`](crate::Context::current).  Use
/// [`Context::try_current`](crate::Context::try_current) or
/// [`Context::current_or_empty`](crate::Context::current_or_empty) when a
/// missing context is not an error.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[error("no context is active on this thread")]
pub struct NoActiveContext;

/// The context does not contain an element of the requested type.
///
/// Returned by [`Context::get`](crate::Context::get).
/// [`Context::find`](crate::Context::find) is the non-failing alternative.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[error("no element of type `{type_name}` in the context")]
pub struct ElementNotFound {
    /// [`std::any::type_name`] of the requested element type.
    pub type_name: &'static str,
}

impl ElementNotFound {
    pub(crate) fn of<T: ?Sized>() -> Self {
        ElementNotFound {
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// Either failure kind, for operations that read the active context and then
/// look up an element in it.
#[non_exhaustive]
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextError {
    #[error(transparent)]
    NoActiveContext(#[from] NoActiveContext),

    #[error(transparent)]
    ElementNotFound(#[from] ElementNotFound),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Missing;

    #[test]
    fn element_not_found_names_the_type() {
        let e = ElementNotFound::of::<Missing>();
        assert!(e.type_name.ends_with("Missing"));
        assert!(e.to_string().contains("Missing"));
    }

    #[test]
    fn kinds_stay_distinct_through_conversion() {
        let a: ContextError = NoActiveContext.into();
        let b: ContextError = ElementNotFound::of::<Missing>().into();
        assert!(matches!(a, ContextError::NoActiveContext(_)));
        assert!(matches!(b, ContextError::ElementNotFound(_)));
        assert_ne!(a, b);
        assert_eq!(a.to_string(), NoActiveContext.to_string());
    }
}

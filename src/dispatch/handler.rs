//! Handler types.

use std::sync::Arc;

use crate::dispatch::context::Context;

/// A request handler or middleware.
///
/// Middleware wraps the rest of the chain by calling [`Context::next`] and
/// doing more work once it returns.
pub type HandlerFunc = Arc<dyn Fn(&mut Context) + Send + Sync>;

/// An immutable, shareable chain of handlers in execution order.
pub type HandlersChain = Arc<[HandlerFunc]>;

/// Wrap a closure as a [`HandlerFunc`].
pub fn handler<F>(f: F) -> HandlerFunc
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Concatenate two handler lists into a new one.
pub(crate) fn combine(first: &[HandlerFunc], second: &[HandlerFunc]) -> Vec<HandlerFunc> {
    let mut merged = Vec::with_capacity(first.len() + second.len());
    merged.extend_from_slice(first);
    merged.extend_from_slice(second);
    merged
}

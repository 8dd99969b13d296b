//! Route registration errors.
//!
//! Every variant is a programmer error in the route definitions. The
//! panicking registration API turns them into a startup abort; the fallible
//! API hands them back so config-driven callers can report them.

use thiserror::Error;

/// Error produced while inserting a route template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The template does not begin with `/`.
    #[error("path must begin with '/' in path '{path}'")]
    InvalidPath { path: String },

    /// The HTTP method string is empty.
    #[error("HTTP method can not be empty (path '{path}')")]
    EmptyMethod { path: String },

    /// No handler was supplied for the route.
    #[error("there must be at least one handler for path '{path}'")]
    EmptyHandlers { path: String },

    /// The composed chain would reach the abort sentinel.
    #[error("too many handlers ({count}) for path '{path}', limit is {limit}")]
    TooManyHandlers {
        path: String,
        count: usize,
        limit: usize,
    },

    /// The exact template is already registered for this method.
    #[error("handlers are already registered for path '{path}'")]
    DuplicateRoute { path: String },

    /// A wildcard collides with an existing wildcard or static sibling.
    #[error("'{segment}' in new path '{path}' conflicts with existing route '{existing}'")]
    WildcardConflict {
        segment: String,
        path: String,
        existing: String,
    },

    /// More than one `:` or `*` marker within one segment.
    #[error("only one wildcard per path segment is allowed, has: '{segment}' in path '{path}'")]
    MultipleWildcards { segment: String, path: String },

    /// A `:` or `*` marker without a name.
    #[error("wildcards must be named with a non-empty name in path '{path}'")]
    UnnamedWildcard { path: String },

    /// A catch-all is followed by more path.
    #[error("catch-all routes are only allowed at the end of the path in path '{path}'")]
    CatchAllNotLast { path: String },

    /// A catch-all is not directly preceded by `/`.
    #[error("no / before catch-all in path '{path}'")]
    CatchAllMissingSlash { path: String },
}

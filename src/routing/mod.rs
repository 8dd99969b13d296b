//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (startup, &mut Router):
//!     method + template + handlers
//!     → router.rs (compose global/group/route chain, check limits)
//!     → table.rs (per-method tree, created lazily)
//!     → tree.rs (split on common prefix, insert wildcards, bubble priority)
//!
//! Request (&Router, any number of tasks):
//!     method + path
//!     → cache.rs (LRU hit for static routes)
//!     → tree.rs (walk, capture params into a pooled buffer)
//!     → other methods scanned on a miss (405 vs 404)
//!     → dispatch (run the chain)
//! ```
//!
//! # Design Decisions
//! - Conflicting templates are rejected at registration, never at lookup
//! - Static children are tried by first byte; the single wildcard child is exclusive
//! - No regex, no backtracking: lookup cost is linear in the path length
//! - Deterministic: the same request always resolves to the same route

pub mod cache;
pub mod error;
pub mod group;
pub mod params;
pub mod router;
pub mod table;
pub mod tree;

pub use cache::{CacheStats, LruCache, RouteCache};
pub use error::RouteError;
pub use group::RouteGroup;
pub use params::{Param, Params, ParamsPool};
pub use router::{Resolution, ResolvedRoute, RouteInfo, Router, Routes};
pub use table::RouteTable;
pub use tree::Tree;

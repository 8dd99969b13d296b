//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Resolved route (handlers + params)
//!     → context.rs (request-scoped cursor, params, response buffer)
//!     → next(): run handlers in order, each may call next() itself
//!     → abort() or a written response ends the chain
//!     → response.rs (status, headers, body) → HTTP adapter
//! ```
//!
//! # Design Decisions
//! - Handlers are synchronous closures; routing and dispatch never suspend
//! - Chain order is fixed at registration: global, group (outer to inner), route

pub mod context;
pub mod handler;
pub mod response;

pub use context::{run_chain, Context, RequestParts, ABORT_INDEX};
pub use handler::{handler, HandlerFunc, HandlersChain};
pub use response::{Response, ResponseWriter};

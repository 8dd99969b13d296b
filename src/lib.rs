//! Radix-tree HTTP request routing.
//!
//! Registers method + path templates (`/users/:id`, `/files/*path`) with
//! ordered handler chains, resolves requests through an LRU cache and a
//! per-method radix tree, and runs the resolved chain with `next`/`abort`
//! semantics. An axum adapter, TOML configuration and hot reload make it
//! runnable as a server.

// Core subsystems
pub mod dispatch;
pub mod routing;

// Server surface
pub mod config;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::AppConfig;
pub use dispatch::{handler, Context, HandlerFunc, RequestParts, Response};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{Resolution, RouteError, RouteGroup, Router, Routes};

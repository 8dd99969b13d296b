//! Route registration, lookup and dispatch.
//!
//! # Responsibilities
//! - Compose handler chains (global, group, route) and register them
//! - Resolve a method + path through the cache, then the per-method trees
//! - Distinguish "no such path" from "path exists under another method"
//! - Run the resolved chain, or the 404/405 chains, and produce a response
//!
//! # Design Decisions
//! - Registration takes `&mut self`, serving takes `&self`; a live router is
//!   never mutated, reloads build a new one and swap it in
//! - Only zero-parameter matches are cached, keyed by method + request path
//! - The cross-method scan for 405 only runs after a miss

use std::sync::Arc;

use axum::http::{header, HeaderValue, StatusCode};
use serde::Serialize;

use crate::config::schema::{RouterConfig, TrailingSlash};
use crate::dispatch::context::{run_chain, Context, RequestParts, ABORT_INDEX};
use crate::dispatch::handler::{combine, HandlerFunc, HandlersChain};
use crate::dispatch::response::Response;
use crate::observability::metrics;
use crate::routing::cache::{CacheStats, RouteCache};
use crate::routing::error::RouteError;
use crate::routing::group::{join_paths, RouteGroup};
use crate::routing::params::{Params, ParamsPool};
use crate::routing::table::RouteTable;

/// Methods registered by [`Routes::any`].
pub const ANY_METHODS: [&str; 9] = [
    "GET", "POST", "PUT", "PATCH", "HEAD", "OPTIONS", "DELETE", "CONNECT", "TRACE",
];

const DEFAULT_404_BODY: &str = "404 page not found";
const DEFAULT_405_BODY: &str = "405 method not allowed";

/// Value stored in the trees and the cache for one registered route.
#[derive(Clone)]
pub struct RouteEntry {
    pub handlers: HandlersChain,
    pub template: Arc<str>,
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("template", &self.template)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// A successful lookup.
pub struct ResolvedRoute {
    /// Composed chain to run.
    pub handlers: HandlersChain,
    /// Captured wildcard values, in capture order.
    pub params: Params,
    /// Template that matched, e.g. `/users/:id`.
    pub template: Arc<str>,
}

impl std::fmt::Debug for ResolvedRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedRoute")
            .field("template", &self.template)
            .field("params", &self.params)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Outcome of [`Router::resolve`].
#[derive(Debug)]
pub enum Resolution {
    Found(ResolvedRoute),
    /// The path matches under other methods only.
    MethodNotAllowed { allowed: Vec<String> },
    NotFound,
}

/// Summary of one registered route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub method: String,
    pub path: String,
    pub handler_count: usize,
}

/// Registration surface shared by [`Router`] and [`RouteGroup`].
///
/// Handler lists accept anything convertible to `Vec<HandlerFunc>`, so both
/// arrays and vectors work: `router.get("/ping", [handler(pong)])`.
pub trait Routes {
    /// Register `handlers` for `method` + `path`, reporting configuration errors.
    fn try_handle<H>(&mut self, method: &str, path: &str, handlers: H) -> Result<(), RouteError>
    where
        H: Into<Vec<HandlerFunc>>;

    /// Register a route. A configuration error aborts the process.
    fn handle<H>(&mut self, method: &str, path: &str, handlers: H) -> &mut Self
    where
        H: Into<Vec<HandlerFunc>>,
    {
        if let Err(e) = self.try_handle(method, path, handlers) {
            tracing::error!(method = %method, path = %path, error = %e, "Route registration failed");
            panic!("{e}");
        }
        self
    }

    fn get<H: Into<Vec<HandlerFunc>>>(&mut self, path: &str, handlers: H) -> &mut Self {
        self.handle("GET", path, handlers)
    }

    fn post<H: Into<Vec<HandlerFunc>>>(&mut self, path: &str, handlers: H) -> &mut Self {
        self.handle("POST", path, handlers)
    }

    fn put<H: Into<Vec<HandlerFunc>>>(&mut self, path: &str, handlers: H) -> &mut Self {
        self.handle("PUT", path, handlers)
    }

    fn patch<H: Into<Vec<HandlerFunc>>>(&mut self, path: &str, handlers: H) -> &mut Self {
        self.handle("PATCH", path, handlers)
    }

    fn delete<H: Into<Vec<HandlerFunc>>>(&mut self, path: &str, handlers: H) -> &mut Self {
        self.handle("DELETE", path, handlers)
    }

    fn head<H: Into<Vec<HandlerFunc>>>(&mut self, path: &str, handlers: H) -> &mut Self {
        self.handle("HEAD", path, handlers)
    }

    fn options<H: Into<Vec<HandlerFunc>>>(&mut self, path: &str, handlers: H) -> &mut Self {
        self.handle("OPTIONS", path, handlers)
    }

    /// Register the same chain under every method in [`ANY_METHODS`].
    fn any<H: Into<Vec<HandlerFunc>>>(&mut self, path: &str, handlers: H) -> &mut Self {
        let handlers = handlers.into();
        for method in ANY_METHODS {
            self.handle(method, path, handlers.clone());
        }
        self
    }
}

/// Internal lookup result; the entry is cloned out so the cache lock is not held.
enum Lookup {
    Found(RouteEntry),
    MethodNotAllowed(Vec<String>),
    NotFound,
}

/// The routing engine.
pub struct Router {
    table: RouteTable<RouteEntry>,
    middleware: Vec<HandlerFunc>,
    not_found: Vec<HandlerFunc>,
    no_method: Vec<HandlerFunc>,
    all_not_found: HandlersChain,
    all_no_method: HandlersChain,
    cache: RouteCache<RouteEntry>,
    params_pool: ParamsPool,
    routes: Vec<RouteInfo>,
    config: RouterConfig,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.len())
            .field("middleware", &self.middleware.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            table: RouteTable::new(),
            middleware: Vec::new(),
            not_found: Vec::new(),
            no_method: Vec::new(),
            all_not_found: Arc::from(Vec::new()),
            all_no_method: Arc::from(Vec::new()),
            cache: RouteCache::new(config.cache_capacity),
            params_pool: ParamsPool::default(),
            routes: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Append global middleware. It wraps routes registered after this call
    /// and the 404/405 chains.
    pub fn middleware(&mut self, handler: HandlerFunc) -> &mut Self {
        self.middleware.push(handler);
        self.rebuild_error_chains();
        self
    }

    /// Handlers run when no route matches.
    pub fn not_found<H: Into<Vec<HandlerFunc>>>(&mut self, handlers: H) -> &mut Self {
        self.not_found = handlers.into();
        self.rebuild_error_chains();
        self
    }

    /// Handlers run when the path matches under other methods only.
    pub fn no_method<H: Into<Vec<HandlerFunc>>>(&mut self, handlers: H) -> &mut Self {
        self.no_method = handlers.into();
        self.rebuild_error_chains();
        self
    }

    /// Open a group whose routes share `prefix` and group middleware.
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        let base = join_paths("/", prefix);
        RouteGroup::new(self, base, Vec::new())
    }

    fn rebuild_error_chains(&mut self) {
        self.all_not_found = combine(&self.middleware, &self.not_found).into();
        self.all_no_method = combine(&self.middleware, &self.no_method).into();
    }

    /// Register a fully joined path with the group's handlers in between
    /// global middleware and the route's own handlers.
    pub(crate) fn add_route(
        &mut self,
        method: &str,
        path: &str,
        scoped: &[HandlerFunc],
        handlers: Vec<HandlerFunc>,
    ) -> Result<(), RouteError> {
        if handlers.is_empty() {
            return Err(RouteError::EmptyHandlers {
                path: path.to_owned(),
            });
        }

        let mut chain = combine(&self.middleware, scoped);
        chain.extend(handlers);
        let limit = ABORT_INDEX as usize - 1;
        if chain.len() > limit {
            return Err(RouteError::TooManyHandlers {
                path: path.to_owned(),
                count: chain.len(),
                limit,
            });
        }

        let handler_count = chain.len();
        let entry = RouteEntry {
            handlers: chain.into(),
            template: Arc::from(path),
        };
        let wildcards = match self.table.insert(method, path, entry) {
            Ok(wildcards) => wildcards,
            Err(e) => {
                tracing::error!(method = %method, path = %path, error = %e, "Route rejected");
                return Err(e);
            }
        };

        self.params_pool.reserve_slots(wildcards);
        self.cache.clear();
        self.routes.push(RouteInfo {
            method: method.to_owned(),
            path: path.to_owned(),
            handler_count,
        });

        tracing::debug!(
            method = %method,
            path = %path,
            handlers = handler_count,
            wildcards = wildcards,
            "Route registered"
        );
        Ok(())
    }

    /// Resolve a request without running anything.
    pub fn resolve(&self, method: &str, path: &str) -> Resolution {
        let mut params = self.params_pool.acquire();
        match self.lookup(method, path, &mut params) {
            Lookup::Found(entry) => Resolution::Found(ResolvedRoute {
                handlers: entry.handlers,
                params,
                template: entry.template,
            }),
            Lookup::MethodNotAllowed(allowed) => {
                self.params_pool.release(params);
                Resolution::MethodNotAllowed { allowed }
            }
            Lookup::NotFound => {
                self.params_pool.release(params);
                Resolution::NotFound
            }
        }
    }

    /// Whether `path` matches a route under some method other than `method`.
    pub fn other_method_exists(&self, method: &str, path: &str) -> bool {
        self.table.other_method_exists(method, path)
    }

    /// Every method with a route matching `path`.
    pub fn allowed_methods(&self, path: &str) -> Vec<String> {
        self.table
            .allowed_methods(path, None)
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    /// Registered routes in registration order.
    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Resolve and run a request to completion.
    pub fn serve(&self, request: RequestParts) -> Response {
        let mut params = self.params_pool.acquire();
        let lookup = self.lookup(request.method.as_str(), request.path(), &mut params);
        let mut ctx = Context::new(request, params);

        match lookup {
            Lookup::Found(entry) => {
                ctx.set_template(entry.template);
                run_chain(entry.handlers, &mut ctx);
            }
            Lookup::MethodNotAllowed(allowed) => {
                if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
                    ctx.header(header::ALLOW, value);
                }
                serve_error(
                    &mut ctx,
                    self.all_no_method.clone(),
                    StatusCode::METHOD_NOT_ALLOWED,
                    DEFAULT_405_BODY,
                );
            }
            Lookup::NotFound => {
                serve_error(
                    &mut ctx,
                    self.all_not_found.clone(),
                    StatusCode::NOT_FOUND,
                    DEFAULT_404_BODY,
                );
            }
        }

        let (response, params) = ctx.finish();
        self.params_pool.release(params);
        response
    }

    fn lookup(&self, method: &str, path: &str, params: &mut Params) -> Lookup {
        let key = self
            .cache
            .is_enabled()
            .then(|| RouteCache::<RouteEntry>::key(method, path));

        if let Some(key) = &key {
            if let Some(entry) = self.cache.get(key) {
                metrics::record_lookup("cache_hit");
                return Lookup::Found(entry);
            }
        }

        let mark = params.len();
        if let Some(entry) = self.find(method, path, params) {
            if let Some(key) = key {
                if params.len() == mark {
                    self.cache.put(key, entry.clone());
                }
            }
            metrics::record_lookup("found");
            return Lookup::Found(entry);
        }

        if self.config.handle_method_not_allowed {
            let allowed = self.allowed_for_mismatch(method, path);
            if !allowed.is_empty() {
                metrics::record_lookup("method_not_allowed");
                return Lookup::MethodNotAllowed(allowed);
            }
        }

        metrics::record_lookup("not_found");
        Lookup::NotFound
    }

    /// Other methods matching `path`, under the same trailing slash policy as `find`.
    fn allowed_for_mismatch(&self, method: &str, path: &str) -> Vec<String> {
        let mut allowed: Vec<String> = self
            .table
            .allowed_methods(path, Some(method))
            .into_iter()
            .map(str::to_owned)
            .collect();

        if self.config.trailing_slash == TrailingSlash::Lenient && path != "/" {
            let toggled = toggle_trailing_slash(path);
            for other in self.table.allowed_methods(&toggled, Some(method)) {
                if !allowed.iter().any(|m| m == other) {
                    allowed.push(other.to_owned());
                }
            }
        }
        allowed
    }

    fn find(&self, method: &str, path: &str, params: &mut Params) -> Option<RouteEntry> {
        if let Some(found) = self.table.find(method, path, params) {
            return Some(found.value.clone());
        }
        if self.config.trailing_slash == TrailingSlash::Lenient && path != "/" {
            let toggled = toggle_trailing_slash(path);
            if let Some(found) = self.table.find(method, &toggled, params) {
                return Some(found.value.clone());
            }
        }
        None
    }
}

impl Routes for Router {
    fn try_handle<H>(&mut self, method: &str, path: &str, handlers: H) -> Result<(), RouteError>
    where
        H: Into<Vec<HandlerFunc>>,
    {
        self.add_route(method, path, &[], handlers.into())
    }
}

/// Run an error chain; write the default body if nothing else did.
fn serve_error(ctx: &mut Context, handlers: HandlersChain, status: StatusCode, default_body: &str) {
    ctx.status(status);
    run_chain(handlers, ctx);
    if ctx.response().is_written() {
        return;
    }
    if ctx.response().status() == status {
        ctx.string(status, default_body);
    } else {
        ctx.response_mut().write_header_now();
    }
}

fn toggle_trailing_slash(path: &str) -> String {
    match path.strip_suffix('/') {
        Some(trimmed) => trimmed.to_owned(),
        None => format!("{path}/"),
    }
}

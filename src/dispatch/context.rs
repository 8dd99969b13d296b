//! Request-scoped dispatch state.
//!
//! # Responsibilities
//! - Carry the request, captured params and the resolved handler chain
//! - Drive the chain with `next()` and stop it with `abort()`
//! - Buffer the response handlers produce
//!
//! # Design Decisions
//! - The cursor starts at -1; `next()` is plain recursion, not a coroutine
//! - `abort()` parks the cursor at [`ABORT_INDEX`], past any allowed chain
//! - A committed response ends the chain the same way, without an explicit abort
//! - Each request owns its context, so a panicking handler can only poison its own

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{header, Extensions, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use serde::Serialize;

use crate::dispatch::handler::HandlersChain;
use crate::dispatch::response::{Response, ResponseWriter};
use crate::routing::params::Params;

/// Cursor value meaning "chain finished". Chains must stay shorter than this.
pub const ABORT_INDEX: isize = 63;

/// The parts of an inbound request the dispatch loop needs.
#[derive(Debug, Clone)]
pub struct RequestParts {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RequestParts {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }
}

/// State shared by every handler of one request.
pub struct Context {
    request: RequestParts,
    params: Params,
    handlers: HandlersChain,
    index: isize,
    template: Option<Arc<str>>,
    response: ResponseWriter,
    extensions: Extensions,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.request.method)
            .field("path", &self.request.uri.path())
            .field("params", &self.params)
            .field("handlers", &self.handlers.len())
            .field("index", &self.index)
            .field("template", &self.template)
            .finish()
    }
}

impl Context {
    pub fn new(request: RequestParts, params: Params) -> Self {
        Self {
            request,
            params,
            handlers: Arc::from(Vec::new()),
            index: -1,
            template: None,
            response: ResponseWriter::new(),
            extensions: Extensions::new(),
        }
    }

    /// Install a chain and rewind the cursor.
    pub fn set_handlers(&mut self, handlers: HandlersChain) {
        self.handlers = handlers;
        self.index = -1;
    }

    pub(crate) fn set_template(&mut self, template: Arc<str>) {
        self.template = Some(template);
    }

    /// Run the remaining handlers.
    ///
    /// Called by the dispatcher to start the chain, and by middleware to run
    /// everything after itself before continuing.
    pub fn next(&mut self) {
        self.index += 1;
        while self.index < self.handlers.len() as isize {
            let handler = self.handlers[self.index as usize].clone();
            handler(self);
            if self.response.is_written() {
                self.index = ABORT_INDEX;
                return;
            }
            self.index += 1;
        }
    }

    /// Skip every handler after the current one.
    pub fn abort(&mut self) {
        self.index = ABORT_INDEX;
    }

    pub fn is_aborted(&self) -> bool {
        self.index >= ABORT_INDEX
    }

    /// Set the status, commit it and abort.
    pub fn abort_with_status(&mut self, status: StatusCode) {
        self.response.set_status(status);
        self.response.write_header_now();
        self.abort();
    }

    /// Write a JSON body and abort.
    pub fn abort_with_json<T: Serialize>(&mut self, status: StatusCode, body: &T) {
        self.abort();
        self.json(status, body);
    }

    pub fn request(&self) -> &RequestParts {
        &self.request
    }

    pub fn method(&self) -> &Method {
        &self.request.method
    }

    pub fn path(&self) -> &str {
        self.request.uri.path()
    }

    /// Captured value for a wildcard name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub(crate) fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    /// Template of the matched route, e.g. `/users/:id`.
    pub fn full_path(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// Position of the handler currently running, -1 before the chain starts.
    pub fn handler_index(&self) -> isize {
        self.index
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    pub fn response(&self) -> &ResponseWriter {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ResponseWriter {
        &mut self.response
    }

    pub fn status(&mut self, status: StatusCode) {
        self.response.set_status(status);
    }

    pub fn header(&mut self, name: header::HeaderName, value: HeaderValue) {
        self.response.insert_header(name, value);
    }

    /// Write a plain-text body.
    pub fn string(&mut self, status: StatusCode, body: impl AsRef<str>) {
        self.write_with_type(status, "text/plain; charset=utf-8", body.as_ref().as_bytes());
    }

    /// Write a JSON body.
    pub fn json<T: Serialize>(&mut self, status: StatusCode, body: &T) {
        match serde_json::to_vec(body) {
            Ok(bytes) => self.write_with_type(status, "application/json", &bytes),
            Err(e) => {
                tracing::error!(error = %e, path = %self.path(), "Failed to serialize JSON response");
                self.abort_with_status(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    }

    /// Write raw bytes with an explicit content type.
    pub fn data(&mut self, status: StatusCode, content_type: &str, body: &[u8]) {
        self.write_with_type(status, content_type, body);
    }

    fn write_with_type(&mut self, status: StatusCode, content_type: &str, body: &[u8]) {
        self.response.set_status(status);
        if !self.response.headers().contains_key(header::CONTENT_TYPE) {
            if let Ok(value) = HeaderValue::from_str(content_type) {
                self.response.insert_header(header::CONTENT_TYPE, value);
            }
        }
        self.response.write(body);
    }

    /// Finish the request: hand back the response and the params buffer.
    pub fn finish(self) -> (Response, Params) {
        (self.response.into_response(), self.params)
    }
}

/// Run a resolved chain from the start.
pub fn run_chain(handlers: HandlersChain, ctx: &mut Context) {
    ctx.set_handlers(handlers);
    ctx.next();
}

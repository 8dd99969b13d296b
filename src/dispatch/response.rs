//! Buffered response writer.
//!
//! # Responsibilities
//! - Collect status, headers and body produced by handlers
//! - Track whether output has been committed
//!
//! # Design Decisions
//! - Setting the status or a header does not commit; writing body bytes or
//!   calling `write_header_now` does
//! - Once committed the status is frozen; later changes are logged and dropped

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

/// Final response produced by a dispatched request.
pub type Response = axum::http::Response<Bytes>;

#[derive(Debug)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    written: bool,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            written: false,
        }
    }
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Set the status code if nothing has been written yet.
    pub fn set_status(&mut self, status: StatusCode) {
        if self.written && self.status != status {
            tracing::warn!(
                current = %self.status,
                ignored = %status,
                "Response already written, status change ignored"
            );
            return;
        }
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Commit the status line without a body.
    pub fn write_header_now(&mut self) {
        self.written = true;
    }

    /// Append body bytes, committing the response.
    pub fn write(&mut self, bytes: &[u8]) {
        self.written = true;
        self.body.extend_from_slice(bytes);
    }

    /// Whether output has been produced.
    pub fn is_written(&self) -> bool {
        self.written
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_response(self) -> Response {
        let mut response = axum::http::Response::new(Bytes::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

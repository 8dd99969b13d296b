//! Request identification.
//!
//! # Responsibilities
//! - Assign every inbound request an `x-request-id` (UUID v4)
//! - Keep an ID supplied by the client or an upstream proxy
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The same ID is echoed on the response for correlation

use axum::http::{HeaderMap, HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs, preserving one already present.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, request: &Request<B>) -> Option<RequestId> {
        if let Some(existing) = request.headers().get(&X_REQUEST_ID) {
            return Some(RequestId::new(existing.clone()));
        }
        let value = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(value))
    }
}

/// Request ID from a header map, or `"-"` when absent.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generates_uuid_when_missing() {
        let request = Request::builder().uri("/").body(()).unwrap();
        let id = UuidRequestId.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
    }

    #[test]
    fn test_preserves_existing_id() {
        let request = Request::builder()
            .uri("/")
            .header("x-request-id", "abc-123")
            .body(())
            .unwrap();
        let id = UuidRequestId.make_request_id(&request).unwrap();
        assert_eq!(id.header_value(), "abc-123");
        assert_eq!(request_id(request.headers()), "abc-123");
    }
}

//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated `AppConfig` into a ready-to-serve `Router`
//! - Install request-logging middleware ahead of every route
//! - Compile `[[routes]]` stubs into handlers
//!
//! # Design Decisions
//! - Fail fast: any route conflict is fatal and reported as `ConfigError::Route`
//! - The same function builds the initial router and every hot-reloaded one

use std::time::Instant;

use axum::http::StatusCode;

use crate::config::loader::ConfigError;
use crate::config::schema::{AppConfig, RouteConfig};
use crate::dispatch::{handler, Context, HandlerFunc};
use crate::routing::params::Params;
use crate::routing::router::{Router, Routes, ANY_METHODS};

/// Build a router from configuration.
pub fn build_router(config: &AppConfig) -> Result<Router, ConfigError> {
    let mut router = Router::new(config.router.clone());
    router.middleware(request_logger());

    for route in &config.routes {
        let stub = stub_handler(route);
        let method = route.method.to_ascii_uppercase();
        if method == "ANY" {
            for method in ANY_METHODS {
                router.try_handle(method, &route.path, [stub.clone()])?;
            }
        } else {
            router.try_handle(&method, &route.path, [stub])?;
        }
    }

    tracing::info!(
        routes = router.routes().len(),
        cache_capacity = config.router.cache_capacity,
        trailing_slash = ?config.router.trailing_slash,
        "Router built"
    );
    Ok(router)
}

/// Middleware logging each dispatched request with its matched template.
pub fn request_logger() -> HandlerFunc {
    handler(|ctx: &mut Context| {
        let start = Instant::now();
        ctx.next();
        tracing::debug!(
            method = %ctx.method(),
            path = %ctx.path(),
            route = ctx.full_path().unwrap_or("-"),
            status = ctx.response().status().as_u16(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Request dispatched"
        );
    })
}

fn stub_handler(route: &RouteConfig) -> HandlerFunc {
    let status = StatusCode::from_u16(route.status).unwrap_or(StatusCode::OK);
    let body = route.body.clone();
    let content_type = route.content_type.clone();

    handler(move |ctx: &mut Context| {
        let rendered = render_body(&body, ctx.params());
        ctx.data(status, &content_type, rendered.as_bytes());
    })
}

/// Replace each `{name}` in `template` with the captured parameter `name`.
///
/// The template is scanned once, so captured values are pasted verbatim even
/// when they contain braces. Placeholders without a matching parameter are
/// left as written.
pub fn render_body(template: &str, params: &Params) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match params.get(name) {
                    Some(value) => rendered.push_str(value),
                    None => {
                        rendered.push('{');
                        rendered.push_str(name);
                        rendered.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                rendered.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    rendered.push_str(rest);
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::dispatch::RequestParts;
    use axum::http::{header, Method, Uri};

    fn serve(router: &Router, method: Method, path: &'static str) -> crate::dispatch::Response {
        router.serve(RequestParts::new(method, Uri::from_static(path)))
    }

    #[test]
    fn test_render_body() {
        let mut params = Params::new();
        params.push("id", "42");
        params.push("path", "a/b");
        assert_eq!(render_body("user {id} at {path}", &params), "user 42 at a/b");
        assert_eq!(render_body("{missing}", &params), "{missing}");
        assert_eq!(render_body("", &params), "");
        assert_eq!(render_body("{id} {unclosed", &params), "42 {unclosed");
    }

    #[test]
    fn test_render_body_pastes_captured_braces_verbatim() {
        let mut params = Params::new();
        params.push("x", "{rest}");
        params.push("rest", "zzz");
        assert_eq!(render_body("{x}-{rest}", &params), "{rest}-zzz");

        // Order of captures does not matter either
        let mut params = Params::new();
        params.push("a", "z");
        params.push("b", "{a}");
        assert_eq!(render_body("{a}/{b}", &params), "z/{a}");
    }

    #[test]
    fn test_stub_routes_serve_configured_responses() {
        let config = parse_config(
            r#"
            [[routes]]
            path = "/users/:id"
            body = "user {id}"

            [[routes]]
            method = "post"
            path = "/users"
            status = 201
            content_type = "application/json"
            body = '{"created":true}'

            [[routes]]
            method = "ANY"
            path = "/echo/*rest"
            body = "{rest}"
            "#,
        )
        .unwrap();
        let router = build_router(&config).unwrap();

        let response = serve(&router, Method::GET, "/users/7");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"user 7");

        let response = serve(&router, Method::POST, "/users");
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let response = serve(&router, Method::DELETE, "/echo/x/y");
        assert_eq!(response.body().as_ref(), b"x/y");

        // request logger + stub
        assert!(router.routes().iter().all(|r| r.handler_count == 2));
    }

    #[test]
    fn test_conflicting_routes_fail_the_build() {
        let config = parse_config(
            r#"
            [[routes]]
            path = "/users/:id"

            [[routes]]
            path = "/users/:name"
            "#,
        )
        .unwrap();

        let err = build_router(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Route(_)));
        assert!(err.to_string().contains("conflicts with existing route"));
    }
}

//! Route groups: a shared path prefix plus group middleware.

use crate::dispatch::handler::HandlerFunc;
use crate::routing::error::RouteError;
use crate::routing::router::{Router, Routes};

/// A prefix and middleware stack applied to every route registered through it.
///
/// Groups borrow the router mutably, so they exist only during registration.
/// Nested groups inherit the parent's middleware ahead of their own.
pub struct RouteGroup<'r> {
    router: &'r mut Router,
    base_path: String,
    handlers: Vec<HandlerFunc>,
}

impl<'r> RouteGroup<'r> {
    pub(crate) fn new(router: &'r mut Router, base_path: String, handlers: Vec<HandlerFunc>) -> Self {
        Self {
            router,
            base_path,
            handlers,
        }
    }

    /// Absolute prefix of this group.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Append group middleware. It wraps routes registered afterwards.
    pub fn middleware(&mut self, handler: HandlerFunc) -> &mut Self {
        self.handlers.push(handler);
        self
    }

    /// Open a nested group below this one.
    pub fn group(&mut self, relative: &str) -> RouteGroup<'_> {
        let base_path = join_paths(&self.base_path, relative);
        let handlers = self.handlers.clone();
        RouteGroup::new(&mut *self.router, base_path, handlers)
    }
}

impl Routes for RouteGroup<'_> {
    fn try_handle<H>(&mut self, method: &str, path: &str, handlers: H) -> Result<(), RouteError>
    where
        H: Into<Vec<HandlerFunc>>,
    {
        let absolute = join_paths(&self.base_path, path);
        self.router
            .add_route(method, &absolute, &self.handlers, handlers.into())
    }
}

/// Join a group prefix and a relative path.
///
/// Exactly one `/` separates the parts, and a trailing `/` on `relative`
/// is kept.
pub fn join_paths(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_owned();
    }

    let base = base.trim_end_matches('/');
    let relative = relative.trim_start_matches('/');
    let mut joined = String::with_capacity(base.len() + relative.len() + 1);
    joined.push_str(base);
    joined.push('/');
    joined.push_str(relative);
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::context::RequestParts;
    use crate::dispatch::handler::handler;
    use axum::http::{Method, StatusCode, Uri};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/", "api"), "/api");
        assert_eq!(join_paths("/", "/"), "/");
        assert_eq!(join_paths("/api", ""), "/api");
        assert_eq!(join_paths("/api", "/users"), "/api/users");
        assert_eq!(join_paths("/api/", "/users/"), "/api/users/");
        assert_eq!(join_paths("/api", "/"), "/api/");
        assert_eq!(join_paths("/api", ":id"), "/api/:id");
    }

    #[test]
    fn test_nested_group_middleware_order() {
        let trace = Arc::new(Mutex::new(Vec::<&'static str>::new()));
        let tag = |name: &'static str| {
            let trace = trace.clone();
            handler(move |ctx| {
                trace.lock().unwrap().push(name);
                ctx.next();
            })
        };

        let mut router = Router::default();
        router.middleware(tag("global"));
        {
            let mut api = router.group("/api");
            api.middleware(tag("api"));
            let mut v1 = api.group("v1");
            v1.middleware(tag("v1"));
            v1.get("/users/:id", [handler(|ctx| ctx.string(StatusCode::OK, "user"))]);
        }

        let route = &router.routes()[0];
        assert_eq!(route.path, "/api/v1/users/:id");
        assert_eq!(route.handler_count, 4);

        let response = router.serve(RequestParts::new(
            Method::GET,
            Uri::from_static("/api/v1/users/3"),
        ));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*trace.lock().unwrap(), vec!["global", "api", "v1"]);
    }

    #[test]
    fn test_group_middleware_does_not_leak_to_siblings() {
        let mut router = Router::default();
        let ok = || handler(|ctx| ctx.string(StatusCode::OK, "ok"));
        {
            let mut admin = router.group("/admin");
            admin.middleware(handler(|ctx| ctx.abort_with_status(StatusCode::UNAUTHORIZED)));
            admin.get("/stats", [ok()]);
        }
        router.group("/public").get("/stats", [ok()]);

        let denied = router.serve(RequestParts::new(Method::GET, Uri::from_static("/admin/stats")));
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let allowed = router.serve(RequestParts::new(Method::GET, Uri::from_static("/public/stats")));
        assert_eq!(allowed.status(), StatusCode::OK);
    }
}

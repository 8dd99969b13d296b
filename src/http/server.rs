//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with a single catch-all handler
//! - Wire up middleware (request ID, tracing, timeout, panic recovery)
//! - Hand each request to the currently loaded routing engine
//! - Swap in a freshly built engine when configuration changes
//! - Bind server to listener and shut down gracefully

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{AppConfig, ConfigError};
use crate::dispatch::RequestParts;
use crate::http::request::{request_id, UuidRequestId};
use crate::lifecycle::startup::build_router;
use crate::observability::metrics;
use crate::routing::Router as RadixRouter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ArcSwap<RadixRouter>>,
    pub max_body_bytes: usize,
}

/// HTTP front end for the routing engine.
pub struct HttpServer {
    app: Router,
    router: Arc<ArcSwap<RadixRouter>>,
    config: AppConfig,
}

impl HttpServer {
    /// Create a server whose routes come from `config.routes`.
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        let router = build_router(&config)?;
        Ok(Self::with_router(config, router))
    }

    /// Create a server around a router built in code.
    pub fn with_router(config: AppConfig, router: RadixRouter) -> Self {
        let router = Arc::new(ArcSwap::from_pointee(router));
        let state = AppState {
            router: router.clone(),
            max_body_bytes: config.server.max_body_bytes,
        };
        let app = Self::build_app(&config, state);
        Self {
            app,
            router,
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_app(config: &AppConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .with_state(state)
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id(request.headers()),
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The Axum application with all layers, for embedding or in-process tests.
    pub fn app(&self) -> Router {
        self.app.clone()
    }

    /// Handle for swapping the routing engine while serving.
    pub fn router_handle(&self) -> Arc<ArcSwap<RadixRouter>> {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Each config received on `config_updates` is turned into a new router
    /// and swapped in; a config that fails to build is logged and ignored.
    /// Server settings (bind address, timeouts) only apply at startup.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<AppConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let handle = self.router_handle();
        let reloader = tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                match build_router(&new_config) {
                    Ok(router) => {
                        let routes = router.routes().len();
                        handle.store(Arc::new(router));
                        tracing::info!(routes = routes, "Router reloaded");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Rejected config update, keeping current router");
                    }
                }
            }
        });

        let result = axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Graceful shutdown started");
            })
            .await;

        reloader.abort();
        result?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: buffer the request and dispatch it through the router.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let (parts, body) = request.into_parts();
    let method = parts.method.clone();

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id(&parts.headers),
                error = %e,
                "Failed to read request body"
            );
            metrics::record_request(method.as_str(), 413, start_time);
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
        }
    };

    let request = RequestParts {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body,
    };

    let router = state.router.load();
    let response = router.serve(request);

    metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
    response.map(Body::from)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> axum::http::Response<String> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");

    let mut response = axum::http::Response::new("500 internal server error".to_string());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

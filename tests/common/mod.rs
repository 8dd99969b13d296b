//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use radix_router::config::AppConfig;
use radix_router::http::HttpServer;
use radix_router::lifecycle::Shutdown;
use radix_router::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A server running on an ephemeral port.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub config_tx: mpsc::UnboundedSender<AppConfig>,
    pub router: Arc<ArcSwap<Router>>,
    pub shutdown: Shutdown,
    pub task: tokio::task::JoinHandle<Result<(), std::io::Error>>,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server task to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.task).await;
    }
}

/// Start a server whose routes come from `config`.
#[allow(dead_code)]
pub async fn start_from_config(config: AppConfig) -> TestServer {
    let server = HttpServer::new(config).expect("config should build");
    start(server).await
}

/// Start a server around a router built in code.
#[allow(dead_code)]
pub async fn start_with_router(router: Router) -> TestServer {
    start(HttpServer::with_router(AppConfig::default(), router)).await
}

async fn start(server: HttpServer) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let router = server.router_handle();
    let shutdown = Shutdown::new();
    let (config_tx, config_updates) = mpsc::unbounded_channel();
    let server_shutdown = shutdown.subscribe();

    let task = tokio::spawn(async move { server.run(listener, config_updates, server_shutdown).await });

    TestServer {
        addr,
        config_tx,
        router,
        shutdown,
        task,
    }
}

/// HTTP client that never pools connections across tests.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Poll `check` until it returns true or the deadline passes.
#[allow(dead_code)]
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..50 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

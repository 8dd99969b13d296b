//! Integration tests driving the HTTP adapter over real sockets.

use axum::http::StatusCode;
use radix_router::config::{parse_config, AppConfig};
use radix_router::{handler, Router, Routes};

mod common;

const STUB_CONFIG: &str = r#"
[[routes]]
path = "/users/:id"
body = "user {id}"

[[routes]]
path = "/files/*path"
body = "file {path}"

[[routes]]
path = "/health"
content_type = "application/json"
body = '{"status":"ok"}'

[[routes]]
method = "PUT"
path = "/health"
status = 204
"#;

fn stub_config() -> AppConfig {
    parse_config(STUB_CONFIG).unwrap()
}

#[tokio::test]
async fn test_serves_stub_routes_with_params() {
    let server = common::start_from_config(stub_config()).await;
    let client = common::client();

    let res = client.get(server.url("/users/42")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "user 42");

    let res = client.get(server.url("/files/docs/guide.md")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "file docs/guide.md");

    let res = client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    server.stop().await;
}

#[tokio::test]
async fn test_not_found_and_method_not_allowed() {
    let server = common::start_from_config(stub_config()).await;
    let client = common::client();

    let res = client.get(server.url("/nowhere")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "404 page not found");

    let res = client.post(server.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()["allow"], "GET, PUT");

    server.stop().await;
}

#[tokio::test]
async fn test_request_id_is_preserved() {
    let server = common::start_from_config(stub_config()).await;

    let res = common::client()
        .get(server.url("/health"))
        .header("x-request-id", "trace-me-123")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-me-123");

    server.stop().await;
}

#[tokio::test]
async fn test_handler_panic_becomes_500() {
    let mut router = Router::default();
    router.get("/boom", [handler(|_| panic!("handler exploded"))]);
    router.get("/fine", [handler(|ctx| ctx.string(StatusCode::OK, "fine"))]);

    let server = common::start_with_router(router).await;
    let client = common::client();

    let res = client.get(server.url("/boom")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // The router is still usable afterwards
    let res = client.get(server.url("/fine")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "fine");

    server.stop().await;
}

#[tokio::test]
async fn test_request_body_reaches_handlers() {
    let mut router = Router::default();
    router.post(
        "/echo",
        [handler(|ctx| {
            let body = ctx.request().body.clone();
            ctx.data(StatusCode::OK, "application/octet-stream", &body);
        })],
    );

    let server = common::start_with_router(router).await;
    let res = common::client()
        .post(server.url("/echo"))
        .body("ping")
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "ping");

    server.stop().await;
}

#[tokio::test]
async fn test_config_update_swaps_router() {
    let server = common::start_from_config(stub_config()).await;
    let client = common::client();

    let res = client.get(server.url("/v2/ping")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let updated = parse_config(
        r#"
        [[routes]]
        path = "/v2/ping"
        body = "pong"
        "#,
    )
    .unwrap();
    server.config_tx.send(updated).unwrap();

    let url = server.url("/v2/ping");
    let swapped = common::eventually(|| {
        let client = client.clone();
        let url = url.clone();
        async move {
            match client.get(&url).send().await {
                Ok(res) => res.status() == StatusCode::OK,
                Err(_) => false,
            }
        }
    })
    .await;
    assert!(swapped, "new router was never installed");

    // Old routes are gone with the old router
    let res = client.get(server.url("/users/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn test_invalid_update_keeps_current_router() {
    let server = common::start_from_config(stub_config()).await;

    let mut conflicting = AppConfig::default();
    conflicting.routes = parse_config(
        r#"
        [[routes]]
        path = "/a/:x"

        [[routes]]
        path = "/a/:y"
        "#,
    )
    .unwrap()
    .routes;
    server.config_tx.send(conflicting).unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let res = common::client().get(server.url("/users/7")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn test_router_handle_swap() {
    let server = common::start_from_config(stub_config()).await;
    let client = common::client();

    let res = client.get(server.url("/swapped")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let mut replacement = Router::default();
    replacement.get("/swapped", [handler(|ctx| ctx.string(StatusCode::OK, "yes"))]);
    server.router.store(std::sync::Arc::new(replacement));

    let res = client.get(server.url("/swapped")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "yes");

    server.stop().await;
}

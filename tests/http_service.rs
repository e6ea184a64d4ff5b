//! The HTTP surface, driven in-process.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use tower::ServiceExt;

use site_router::HttpServer;

use common::{config, router, template_dir};

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn request(method: &str, path: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::HOST, "a.example.com")
        .header("x-forwarded-proto", "https")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_matched_route() {
    let dir = template_dir();
    let app = HttpServer::new(router(config(dir.path()))).app();

    let response = app.oneshot(request("GET", "/foo/5")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = json_body(response).await;
    assert_eq!(body["outcome"], "matched");
    assert_eq!(body["strategy"], "rule");
    assert_eq!(body["route"], json!({"action": "entries/edit", "params": {"id": "5"}}));
    assert_eq!(body["site"]["handle"], "default");
    assert_eq!(body["facts"]["path"], "foo/5");
}

#[tokio::test]
async fn test_not_found() {
    let dir = template_dir();
    let app = HttpServer::new(router(config(dir.path()))).app();

    let response = app.oneshot(request("PUT", "/foo/5")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["outcome"], "not_found");
    assert!(body.get("route").is_none());
}

#[tokio::test]
async fn test_path_traversal_is_rejected() {
    let dir = template_dir();
    let app = HttpServer::new(router(config(dir.path()))).app();

    let response = app.oneshot(request("GET", "/pages/../secrets")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("path traversal"));
}

#[tokio::test]
async fn test_form_body_and_request_id_propagation() {
    let dir = template_dir();
    let app = HttpServer::new(router(config(dir.path()))).app();

    let request = Request::builder()
        .method("POST")
        .uri("/blog/hello")
        .header(header::HOST, "a.example.com")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-request-id", "req-42")
        .body(Body::from("action=entries/save-entry"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-42");

    let body = json_body(response).await;
    assert_eq!(body["site"]["handle"], "blog");
    assert_eq!(body["facts"]["is_action_request"], true);
    assert_eq!(body["facts"]["action_segments"], json!(["entries", "save-entry"]));
    assert_eq!(body["route"]["action"], "blog/post");
}

#[tokio::test]
async fn test_status_and_sites() {
    let dir = template_dir();
    let server = HttpServer::new(router(config(dir.path())));

    let response = server.app().oneshot(request("GET", "/_router/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"initialized": false, "sites": 3, "rules": 3, "cp_rules": 1})
    );

    let response = server.app().oneshot(request("GET", "/_router/status")).await.unwrap();
    assert_eq!(json_body(response).await["initialized"], true);

    let response = server.app().oneshot(request("GET", "/_router/sites")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let handles: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|site| site["handle"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(handles, vec!["default", "blog", "de"]);
}

#[tokio::test]
async fn test_configuration_error_is_500() {
    let dir = template_dir();
    let mut config = config(dir.path());
    config.sites.iter_mut().for_each(|site| site.primary = false);
    let app = HttpServer::new(router(config)).app();

    let response = app.oneshot(request("GET", "/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(response).await["error"].is_string());
}

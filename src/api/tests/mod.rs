use super::*;
use crate::config::Config;
use crate::pipeline::test_helpers::{TestService, create_test_service};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;


/// Boundary used by the hand-built multipart bodies below
const BOUNDARY: &str = "kgm2flac-test-boundary";

/// Build a multipart/form-data body carrying the given (filename, bytes)
/// pairs in repeated `files` fields
fn multipart_body(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (filename, bytes) in parts {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Build a POST /api/convert request from multipart parts
fn convert_request(parts: &[(&str, &[u8])]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/convert")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .expect("request builds")
}

/// A router over a fake-backed service, plus the fixture handles
fn test_router(config: Config) -> (axum::Router, TestService) {
    let t = create_test_service(config);
    let router = create_router(t.service.clone());
    (router, t)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _t) = test_router(Config::default());

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_index_page_advertises_limits() {
    let mut config = Config::default();
    config.limits.max_files = 7;
    config.limits.max_file_size = 64 << 20;
    let (app, _t) = test_router(config);

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(content_type.starts_with("text/html"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let page = String::from_utf8(body.to_vec()).unwrap();
    assert!(page.contains("7 files"), "page must advertise max_files");
    assert!(page.contains("64 MB"), "page must advertise max_file_size");
    assert!(page.contains("/api/convert"));
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let (app, _t) = test_router(Config::default());

    let request = Request::builder()
        .uri("/openapi.json")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["paths"]["/api/convert"].is_object());
}

#[tokio::test]
async fn test_cors_headers_present_when_enabled() {
    let mut config = Config::default();
    config.server.cors_enabled = true;
    config.server.cors_origins = vec!["*".to_string()];
    let (app, _t) = test_router(config);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_api_server_spawns() {
    let mut config = Config::default();
    // Port 0 = OS assigns a free port
    config.server.bind_address = "127.0.0.1:0".parse().unwrap();
    let t = create_test_service(config);

    let api_handle = tokio::spawn({
        let service = t.service.clone();
        async move { start_api_server(service).await }
    });

    // Give it a moment to start
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    api_handle.abort();
}

use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::app;
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

// --- diagnostics ---

#[tokio::test]
async fn root_reports_cluster_info() {
    let resp = app().oneshot(empty_request("GET", "/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let info = body_json(resp).await;
    assert_eq!(info["cluster_name"], "mock-cluster");
}

#[tokio::test]
async fn echo_reflects_method_query_headers_and_body() {
    let req = Request::builder()
        .method("PUT")
        .uri("/_echo/some/path?scroll=1m&q=a%2Fb")
        .header("x-opaque-id", "trace-1")
        .body(r#"{"field":"a/b"}"#.to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echoed = body_json(resp).await;
    assert_eq!(echoed["method"], "PUT");
    assert_eq!(echoed["path"], "/_echo/some/path");
    assert_eq!(echoed["query"]["scroll"], "1m");
    assert_eq!(echoed["query"]["q"], "a/b");
    assert_eq!(echoed["headers"]["x-opaque-id"], "trace-1");
    assert_eq!(echoed["body"], r#"{"field":"a/b"}"#);
}

#[tokio::test]
async fn fail_answers_bad_gateway_html() {
    let resp = app().oneshot(empty_request("GET", "/_fail")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body = body_bytes(resp).await;
    assert!(body.starts_with(b"<html>"));
}

#[tokio::test]
async fn slow_waits_requested_delay() {
    let started = std::time::Instant::now();
    let resp = app().oneshot(empty_request("GET", "/_slow?ms=50")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(started.elapsed() >= std::time::Duration::from_millis(50));
}

// --- documents ---

#[tokio::test]
async fn create_doc_returns_201() {
    let resp = app()
        .oneshot(json_request("POST", "/logs/_doc", r#"{"msg":"hello"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    assert_eq!(created["result"], "created");
    assert_eq!(created["_index"], "logs");
    assert!(created["_id"].is_string());
}

#[tokio::test]
async fn create_doc_malformed_json_returns_parse_error() {
    let resp = app()
        .oneshot(json_request("POST", "/logs/_doc", "{broken"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "parse_exception");
}

#[tokio::test]
async fn get_doc_not_found() {
    let resp = app().oneshot(empty_request("GET", "/logs/_doc/1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["found"], false);
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn search_unknown_index_returns_error_body() {
    let resp = app().oneshot(empty_request("GET", "/nope/_search")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "index_not_found_exception");
}

#[tokio::test]
async fn delete_unknown_index_returns_error_body() {
    let resp = app().oneshot(empty_request("DELETE", "/nope")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- full document lifecycle ---

#[tokio::test]
async fn document_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // put with explicit id
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("PUT", "/logs/_doc/1", r#"{"path":"/var/log/syslog"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    // put again — updated
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("PUT", "/logs/_doc/1", r#"{"path":"/var/log/auth.log"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["result"], "updated");

    // get
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/logs/_doc/1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched = body_json(resp).await;
    assert_eq!(fetched["_source"]["path"], "/var/log/auth.log");

    // search with scroll
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/logs/_search?scroll=1m"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let found = body_json(resp).await;
    assert_eq!(found["hits"]["total"]["value"], 1);
    assert_eq!(found["_scroll_id"], "scroll-logs");

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", "/logs/_doc/1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["result"], "deleted");

    // delete again — not found
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", "/logs/_doc/1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // drop the index
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", "/logs"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["acknowledged"], true);
}

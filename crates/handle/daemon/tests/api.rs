//! HTTP scenarios against the full router

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use handle_daemon::{build_engine, create_router, AppState, DaemonConfig};
use handle_engine::InMemoryHandleService;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const GOOGLE: &str = r#"[{"index":1,"type":"URL","data":"http://www.google.de"}]"#;

fn app_with(config: DaemonConfig) -> Router {
    let engine = build_engine(&config, Arc::new(InMemoryHandleService::new())).unwrap();
    create_router(AppState::new(Arc::new(engine)), config.server.max_body_size)
}

fn app() -> Router {
    app_with(DaemonConfig::default())
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn values_of(app: &Router, uri: &str) -> Vec<Value> {
    let response = send(app, empty_request("GET", uri)).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await.as_array().unwrap().clone()
}

fn index_of(value: &Value) -> u64 {
    value["index"].as_u64().unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = send(&app(), empty_request("GET", "/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "handled");
}

#[tokio::test]
async fn test_replace_creates_then_updates() {
    let app = app();

    let response = send(&app, json_request("PUT", "/handles/10876/test-001", GOOGLE)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/handles/10876/test-001"
    );

    let values = values_of(&app, "/handles/10876/test-001").await;
    assert_eq!(values.len(), 2);
    assert_eq!(values[0]["type"], "URL");
    assert_eq!(values[0]["data"], "http://www.google.de");
    assert_eq!(values[1]["index"], 100);
    assert_eq!(values[1]["type"], "HS_ADMIN");
    let admin_before = values[1].clone();

    let response = send(&app, json_request("PUT", "/handles/10876/test-001", GOOGLE)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let values = values_of(&app, "/handles/10876/test-001").await;
    assert_eq!(values.len(), 2);
    let url = values.iter().find(|v| index_of(v) == 1).unwrap();
    assert_eq!(url["type"], "URL");
    let admin = values.iter().find(|v| index_of(v) == 100).unwrap();
    assert_eq!(admin, &admin_before);
}

#[tokio::test]
async fn test_merge_tombstone_removes_value() {
    let app = app();
    send(&app, json_request("PUT", "/handles/10876/test-001", GOOGLE)).await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/handles/10876/test-001",
            r#"[{"index":1,"type":"","data":""}]"#,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let values = values_of(&app, "/handles/10876/test-001").await;
    assert_eq!(values.len(), 1);
    assert_eq!(values[0]["type"], "HS_ADMIN");
}

#[tokio::test]
async fn test_merge_removing_sole_admin_is_rejected() {
    let app = app();
    send(&app, json_request("PUT", "/handles/10876/test-001", GOOGLE)).await;
    let before = values_of(&app, "/handles/10876/test-001").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/handles/10876/test-001",
            r#"[{"index":100,"type":"","data":""}]"#,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "INVARIANT_VIOLATION");

    assert_eq!(values_of(&app, "/handles/10876/test-001").await, before);
}

#[tokio::test]
async fn test_merge_on_absent_handle_is_not_found() {
    let response = send(&app(), json_request("POST", "/handles/10876/missing", GOOGLE)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_if_none_match_on_existing_handle() {
    let app = app();
    send(&app, json_request("PUT", "/handles/10876/test-001", GOOGLE)).await;
    let before = values_of(&app, "/handles/10876/test-001").await;

    let mut request = json_request(
        "PUT",
        "/handles/10876/test-001",
        r#"[{"index":2,"type":"EMAIL","data":"a@b.c"}]"#,
    );
    request
        .headers_mut()
        .insert(header::IF_NONE_MATCH, "*".parse().unwrap());
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    assert_eq!(body_json(response).await["code"], "PRECONDITION_FAILED");

    assert_eq!(values_of(&app, "/handles/10876/test-001").await, before);
}

#[tokio::test]
async fn test_if_match_on_absent_handle() {
    let mut request = json_request("PUT", "/handles/10876/absent", GOOGLE);
    request
        .headers_mut()
        .insert(header::IF_MATCH, "*".parse().unwrap());
    let response = send(&app(), request).await;
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn test_get_never_created_handle() {
    let response = send(&app(), empty_request("GET", "/handles/10876/never")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_get_single_index() {
    let app = app();
    send(&app, json_request("PUT", "/handles/10876/a", GOOGLE)).await;

    let values = values_of(&app, "/handles/1:10876/a").await;
    assert_eq!(values.len(), 1);
    assert_eq!(values[0]["data"], "http://www.google.de");

    let response = send(&app, empty_request("GET", "/handles/7:10876/a")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_references() {
    let app = app();

    let response = send(&app, empty_request("GET", "/handles/x:10876/a")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "MALFORMED_REFERENCE");

    let response = send(&app, json_request("PUT", "/handles/1:10876/a", GOOGLE)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, empty_request("GET", "/handles/10876")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bad_bodies() {
    let app = app();

    let response = send(
        &app,
        json_request("PUT", "/handles/10876/a", r#"{"index":1}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALUE_SET_PARSE_ERROR");

    let response = send(
        &app,
        json_request("PUT", "/handles/10876/a", r#"[{"index":-1,"type":"URL","data":"x"}]"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        json_request("PUT", "/handles/10876/a", r#"[{"index":1,"type":"","data":""}]"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("PUT")
        .uri("/handles/10876/a")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(GOOGLE))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let response = send(&app, empty_request("PUT", "/handles/10876/a")).await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let response = send(&app, empty_request("GET", "/handles/10876/a")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_index_and_handle() {
    let app = app();
    send(&app, json_request("PUT", "/handles/10876/a", GOOGLE)).await;

    let response = send(&app, empty_request("DELETE", "/handles/100:10876/a")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(&app, empty_request("DELETE", "/handles/5:10876/a")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, empty_request("DELETE", "/handles/1:10876/a")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(values_of(&app, "/handles/10876/a").await.len(), 1);

    let response = send(&app, empty_request("DELETE", "/handles/10876/a")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, empty_request("GET", "/handles/10876/a")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, empty_request("DELETE", "/handles/10876/a")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_batch_single_generated_handle() {
    let mut config = DaemonConfig::default();
    config.generator.default = "counter".to_string();
    let app = app_with(config);

    let response = send(&app, json_request("POST", "/handles/10876", GOOGLE)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/handles/10876/1"
    );

    let response = send(&app, json_request("POST", "/handles/10876/", GOOGLE)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/handles/10876/2"
    );

    assert_eq!(values_of(&app, "/handles/10876/2").await.len(), 2);
}

#[tokio::test]
async fn test_batch_uuid_generator_by_query() {
    let mut config = DaemonConfig::default();
    config.generator.default = "counter".to_string();
    let app = app_with(config);

    let response = send(
        &app,
        json_request("POST", "/handles/10876?generator=uuid", GOOGLE),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(location.starts_with("/handles/10876/"));
    assert_eq!(location.len(), "/handles/10876/".len() + 36);

    let response = send(
        &app,
        json_request("POST", "/handles/10876?generator=nope", GOOGLE),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "UNKNOWN_GENERATOR");
}

#[tokio::test]
async fn test_batch_of_descriptors() {
    let app = app();
    send(&app, json_request("PUT", "/handles/10876/existing", GOOGLE)).await;

    let body = json!([
        {"handle": "10876/fresh", "values": [{"index": 1, "type": "URL", "data": "http://a"}]},
        {"handle": "10876/existing", "values": [{"index": 100, "type": "URL", "data": "x"}]},
        {"values": [{"index": 1, "type": "URL", "data": "http://b"}]}
    ]);
    let response = send(&app, json_request("POST", "/handles/10876", &body.to_string())).await;
    assert_eq!(response.status(), StatusCode::OK);

    let results = body_json(response).await;
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["handle"], "10876/fresh");
    assert_eq!(results[0]["status"], "created");
    assert_eq!(results[1]["status"], "failed");
    assert_eq!(results[1]["code"], "INVARIANT_VIOLATION");
    assert_eq!(results[2]["status"], "created");
    assert!(results[2]["handle"].as_str().unwrap().starts_with("10876/"));

    assert_eq!(values_of(&app, "/handles/10876/fresh").await.len(), 2);
}

#[tokio::test]
async fn test_batch_validation_rejects_whole_request() {
    let app = app();
    let body = json!([
        {"handle": "10876/ok", "values": []},
        {"handle": "20000/elsewhere", "values": []}
    ]);
    let response = send(&app, json_request("POST", "/handles/10876", &body.to_string())).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "MALFORMED_REFERENCE");

    let response = send(&app, empty_request("GET", "/handles/10876/ok")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_root_batch_requires_names() {
    let app = app();

    let response = send(&app, json_request("POST", "/handles", GOOGLE)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json!([
        {"handle": "10876/one", "values": [{"index": 1, "type": "URL", "data": "http://a"}]},
        {"handle": "20000/two", "values": []}
    ]);
    let response = send(&app, json_request("POST", "/handles", &body.to_string())).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(values_of(&app, "/handles/20000/two").await.len(), 1);
}

#[tokio::test]
async fn test_body_limit() {
    let mut config = DaemonConfig::default();
    config.server.max_body_size = 16;
    let response = send(
        &app_with(config),
        json_request("PUT", "/handles/10876/a", GOOGLE),
    )
    .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

//! HTTP adapter behavior that is decided before any SQL runs.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{get, json_body, router, send};

#[tokio::test]
async fn health_and_version() {
    let app = router();
    let res = get(&app, "/health").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["status"], "ok");

    let res = get(&app, "/version").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["name"], "schema-query");
}

#[tokio::test]
async fn ready_reports_unreachable_database() {
    let res = get(&router(), "/ready").await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(res).await;
    assert_eq!(body["database"], "unavailable");
    assert_eq!(body["entities"], 2);
}

#[tokio::test]
async fn unknown_entity_is_not_found() {
    let res = get(&router(), "/ghosts?title=x").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(res).await["error"]["code"], "not_found");
}

#[tokio::test]
async fn malformed_id_is_not_found() {
    let res = get(&router(), "/posts/not-a-number").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn entity_without_table_is_a_config_error() {
    let res = get(&router(), "/orphans").await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(res).await["error"]["code"], "config_error");
}

#[tokio::test]
async fn body_must_be_an_object() {
    let req = Request::post("/posts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("[1, 2]"))
        .unwrap();
    let res = send(&router(), req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["error"]["code"], "bad_request");
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let big = format!("{{\"title\":\"{}\"}}", "x".repeat(2 * 1024 * 1024));
    let req = Request::post("/posts")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, big.len())
        .body(Body::from(big))
        .unwrap();
    let res = send(&router(), req).await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

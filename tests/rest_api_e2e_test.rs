//! End-to-end tests for the HTTP/JSON surface

use http::StatusCode;
use serde_json::json;

use toolcast_integration_tests::{
    app_from_manifest, get, post_json, seed_users, send, SQLITE_MANIFEST,
};

#[tokio::test]
async fn test_simple_sql_invoke() {
    let (router, _state) = app_from_manifest(SQLITE_MANIFEST).await;
    seed_users(&router).await;

    let (status, body) = send(
        &router,
        post_json("/api/tool/get_user/invoke", &json!({"id": 1})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!("[{\"id\":1,\"name\":\"Alice\"}]"));
}

#[tokio::test]
async fn test_missing_required_parameter_is_400() {
    let (router, _state) = app_from_manifest(SQLITE_MANIFEST).await;
    seed_users(&router).await;

    let (status, body) = send(&router, post_json("/api/tool/get_user/invoke", &json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("parameter \"id\" is required"));
}

#[tokio::test]
async fn test_type_mismatch_is_400() {
    let (router, _state) = app_from_manifest(SQLITE_MANIFEST).await;
    seed_users(&router).await;

    let (status, _body) = send(
        &router,
        post_json("/api/tool/get_user/invoke", &json!({"id": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_tool_is_404() {
    let (router, _state) = app_from_manifest(SQLITE_MANIFEST).await;

    let (status, body) = send(&router, post_json("/api/tool/nope/invoke", &json!({}))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("tool with name \"nope\" does not exist"));
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let (router, _state) = app_from_manifest(SQLITE_MANIFEST).await;

    let request = http::Request::builder()
        .method("POST")
        .uri("/api/tool/get_user/invoke")
        .header("Content-Type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let (status, _body) = send(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_backend_error_is_500_with_message() {
    let (router, _state) = app_from_manifest(SQLITE_MANIFEST).await;

    let (status, body) = send(
        &router,
        post_json("/api/tool/exec_sql/invoke", &json!({"sql": "SELEC 1"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("syntax error"));
}

#[tokio::test]
async fn test_empty_rowset_marker_is_stable() {
    let (router, _state) = app_from_manifest(SQLITE_MANIFEST).await;
    seed_users(&router).await;

    let (status, body) = send(
        &router,
        post_json("/api/tool/get_user/invoke", &json!({"id": 999})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    // The sqlite kinds return a marker, not an empty array; agents parse it
    assert_eq!(body["result"], json!("\"The query returned 0 rows.\""));
}

#[tokio::test]
async fn test_tool_manifest_route() {
    let (router, _state) = app_from_manifest(SQLITE_MANIFEST).await;

    let (status, body) = send(&router, get("/api/tool/get_user/")).await;

    assert_eq!(status, StatusCode::OK);
    let manifest = &body["tools"]["get_user"];
    assert_eq!(manifest["description"], json!("Look up a user by id"));
    assert_eq!(manifest["parameters"][0]["name"], json!("id"));
    assert_eq!(manifest["parameters"][0]["type"], json!("integer"));
    assert_eq!(manifest["parameters"][0]["required"], json!(true));
}

#[tokio::test]
async fn test_toolset_route_aggregates_manifests() {
    let (router, _state) = app_from_manifest(SQLITE_MANIFEST).await;

    let (status, body) = send(&router, get("/api/toolset/default")).await;
    assert_eq!(status, StatusCode::OK);
    let tools = body["tools"].as_object().unwrap();
    assert_eq!(tools.len(), 2);
    assert!(tools.contains_key("get_user"));
    assert!(tools.contains_key("exec_sql"));

    let (status, body) = send(&router, get("/api/toolset")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tools"].as_object().unwrap().len(), 3);

    let (status, _body) = send(&router, get("/api/toolset/absent")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_prebuilt_list_tables() {
    let (router, _state) = app_from_manifest(SQLITE_MANIFEST).await;
    seed_users(&router).await;

    let (status, body) = send(&router, post_json("/api/tool/list_tables/invoke", &json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    let rows: serde_json::Value =
        serde_json::from_str(body["result"].as_str().unwrap()).unwrap();
    assert_eq!(rows, json!([{"name": "users"}]));
}

#[tokio::test]
async fn test_healthz() {
    let (router, _state) = app_from_manifest(SQLITE_MANIFEST).await;
    let (status, body) = send(&router, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
}

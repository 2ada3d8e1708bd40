//! Registry swap on reload

use http::StatusCode;
use serde_json::json;

use toolcast_integration_tests::{app_from_manifest, get, post_json, seed_users, send};

const FIRST: &str = r#"
sources:
  db1: {kind: sqlite, database: ":memory:"}
tools:
  exec_sql:
    kind: sqlite-execute-sql
    source: db1
    description: Run arbitrary SQL
"#;

const SECOND: &str = r#"
sources:
  db1: {kind: sqlite, database: ":memory:"}
tools:
  exec_sql:
    kind: sqlite-execute-sql
    source: db1
    description: Run arbitrary SQL
  list_tables:
    kind: sqlite-list-tables
    source: db1
"#;

#[tokio::test]
async fn test_swap_changes_visible_catalog() {
    let (router, state) = app_from_manifest(FIRST).await;

    let (_, body) = send(&router, get("/api/toolset")).await;
    assert_eq!(body["tools"].as_object().unwrap().len(), 1);

    let next = toolcast_config::load_str(SECOND).await.unwrap();
    state.registry().swap(next).await;

    // The already-built router sees the new generation
    let (_, body) = send(&router, get("/api/toolset")).await;
    assert_eq!(body["tools"].as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_load_leaves_registry_untouched() {
    let (router, _state) = app_from_manifest(FIRST).await;

    let err = toolcast_config::load_str("tools:\n  t1: {kind: no-such-kind}\n").await;
    assert!(err.is_err());

    let (status, _body) = send(&router, get("/api/tool/exec_sql/")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_new_generation_gets_fresh_sources() {
    let (router, state) = app_from_manifest(FIRST).await;
    seed_users(&router).await;

    let next = toolcast_config::load_str(FIRST).await.unwrap();
    state.registry().swap(next).await;

    // The swapped-in sqlite database is a different in-memory instance
    let (status, body) = send(
        &router,
        post_json("/api/tool/exec_sql/invoke", &json!({"sql": "SELECT * FROM users"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("users"));
}

//! Shared helpers for the integration tests

use axum::body::Body;
use axum::Router;
use http::{Request, Response};
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde_json::Value;
use tower::ServiceExt;

use toolcast_server::AppState;

/// Kind factories register once per test binary.
static REGISTER: Lazy<()> = Lazy::new(|| {
    toolcast_sources::register_all();
    toolcast_tools::register_all();
    toolcast_auth::register_all();
});

/// Build an in-process app from a manifest document.
pub async fn app_from_manifest(manifest: &str) -> (Router, AppState) {
    Lazy::force(&REGISTER);
    let registry = toolcast_config::load_str(manifest)
        .await
        .expect("manifest should load");
    let state = AppState::new(registry);
    (toolcast_server::build_router(state.clone()), state)
}

/// One-shot a request and decode the JSON body.
pub async fn send(router: &Router, request: Request<Body>) -> (http::StatusCode, Value) {
    let response: Response<_> = router
        .clone()
        .oneshot(request)
        .await
        .expect("infallible service");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).to_string(),
        ))
    };
    (status, value)
}

/// POST helper carrying a JSON body.
pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

/// GET helper.
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

/// Manifest used by most tests: an in-memory sqlite database with a typed
/// lookup tool, an operator execute-sql tool, and a greeting prompt.
pub const SQLITE_MANIFEST: &str = r#"
sources:
  db1:
    kind: sqlite
    database: ":memory:"
tools:
  get_user:
    kind: sqlite-sql
    source: db1
    description: Look up a user by id
    statement: "SELECT id, name FROM users WHERE id = ?"
    parameters:
      - {name: id, type: integer, description: user id}
  exec_sql:
    kind: sqlite-execute-sql
    source: db1
    description: Run arbitrary SQL
  list_tables:
    kind: sqlite-list-tables
    source: db1
prompts:
  greet:
    kind: custom
    description: Greets someone by name
    messages:
      - {role: user, content: "Hello, {{.name}}"}
    arguments:
      - {name: name, description: who to greet}
toolsets:
  default: [get_user, exec_sql]
"#;

/// Seed the users table through the execute-sql tool.
pub async fn seed_users(router: &Router) {
    for statement in [
        "CREATE TABLE users (id INTEGER, name TEXT)",
        "INSERT INTO users (id, name) VALUES (1, 'Alice')",
        "INSERT INTO users (id, name) VALUES (2, 'Bob')",
    ] {
        let (status, body) = send(
            router,
            post_json(
                "/api/tool/exec_sql/invoke",
                &serde_json::json!({ "sql": statement }),
            ),
        )
        .await;
        assert_eq!(status, http::StatusCode::OK, "seed failed: {body}");
    }
}

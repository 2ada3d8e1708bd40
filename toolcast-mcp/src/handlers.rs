//! Axum handlers for the MCP endpoint
//!
//! `POST /mcp` carries one JSON-RPC document; `GET /mcp` upgrades to an
//! SSE notification stream; `DELETE /mcp` drops the session named by the
//! `Mcp-Session-Id` header.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{delete, get, post},
    Json, Router,
};
use futures_util::stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::debug;

use crate::jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::server::{McpBackend, McpServer};

/// Session header defined by the streamable HTTP transport
pub const SESSION_HEADER: &str = "Mcp-Session-Id";

/// Application state exposing the MCP server
pub trait McpState: Clone + Send + Sync + 'static {
    type Backend: McpBackend;

    fn mcp_server(&self) -> &McpServer<Self::Backend>;
}

/// Routes for the MCP endpoint
pub fn mcp_routes<S>() -> Router<S>
where
    S: McpState,
{
    Router::new()
        .route("/mcp", post(mcp_post_handler::<S>))
        .route("/mcp", get(mcp_sse_handler::<S>))
        .route("/mcp", delete(mcp_delete_handler::<S>))
}

/// JSON-RPC over HTTP POST
pub async fn mcp_post_handler<S>(
    State(state): State<S>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: McpState,
{
    let server = state.mcp_server();

    // Parse failures must come back as JSON-RPC errors, not HTTP ones
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            let response =
                JsonRpcResponse::error(JsonRpcError::parse_error(e.to_string()), None);
            return Json(response).into_response();
        }
    };

    if let Some(session_id) = header_value(&headers, SESSION_HEADER) {
        // Unknown or expired ids fall through: the request still runs and
        // the client simply has no session state behind it
        server.sessions().touch(&session_id).await;
    }

    let outcome = server.handle_request(request, &headers).await;

    let mut response = match outcome.response {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    };

    if let Some(session_id) = outcome.new_session_id {
        if let Ok(value) = session_id.parse() {
            response.headers_mut().insert(SESSION_HEADER, value);
        }
    }

    response
}

/// SSE notification stream
pub async fn mcp_sse_handler<S>(State(state): State<S>, headers: HeaderMap) -> Response
where
    S: McpState,
{
    let server = state.mcp_server();

    if let Some(session_id) = header_value(&headers, SESSION_HEADER) {
        if server.sessions().touch(&session_id).await.is_none() {
            return (StatusCode::NOT_FOUND, "unknown session").into_response();
        }
        debug!(session = %session_id, "sse stream attached");
    }

    // Tool calls still arrive via POST; this stream only announces the
    // message endpoint and then carries keep-alives
    let endpoint = stream::iter(vec![Ok::<Event, Infallible>(
        Event::default().event("endpoint").data("/mcp"),
    )]);
    let open = stream::pending::<Result<Event, Infallible>>();

    Sse::new(futures_util::StreamExt::chain(endpoint, open))
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("keep-alive"),
        )
        .into_response()
}

/// Explicit session teardown
pub async fn mcp_delete_handler<S>(State(state): State<S>, headers: HeaderMap) -> Response
where
    S: McpState,
{
    let Some(session_id) = header_value(&headers, SESSION_HEADER) else {
        return (StatusCode::BAD_REQUEST, "session id required").into_response();
    };

    if state.mcp_server().sessions().remove(&session_id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::NOT_FOUND, "unknown session").into_response()
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

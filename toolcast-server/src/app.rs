//! Router assembly

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the full application router: JSON surface plus MCP endpoint.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/api/tool/{name}/", get(handlers::get_tool_manifest))
        .route("/api/tool/{name}/invoke", post(handlers::invoke_tool))
        .route("/api/toolset", get(handlers::get_default_toolset_manifest))
        .route("/api/toolset/{name}", get(handlers::get_toolset_manifest))
        .merge(toolcast_mcp::mcp_routes::<AppState>())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

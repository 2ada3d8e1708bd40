//! MCP protocol surface for toolcast
//!
//! JSON-RPC 2.0 framing, MCP method dispatch with protocol-version
//! negotiation, a session table for the streamable HTTP transport, and
//! Axum handlers for `POST`/`GET`(SSE)/`DELETE` on `/mcp`.
//!
//! The application supplies a [`McpBackend`] implementation; everything
//! protocol-shaped lives here.

pub mod handlers;
pub mod jsonrpc;
pub mod protocol;
pub mod server;
pub mod session;

pub use handlers::{mcp_routes, McpState, SESSION_HEADER};
pub use jsonrpc::{ErrorCode, JsonRpcError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
pub use protocol::{
    negotiate_protocol_version, CallResult, InitializeParams, InitializeResult, ServerCapabilities,
    ServerInfo, ToolContent, DEFAULT_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS,
};
pub use server::{DispatchOutcome, McpBackend, McpServer};
pub use session::{McpSession, SessionManager};

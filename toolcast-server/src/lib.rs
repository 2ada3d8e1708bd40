//! toolcast server
//!
//! The invocation pipeline shared by both wire surfaces, the HTTP/JSON
//! surface, router assembly, registry hot-swap, and startup/lifecycle.

pub mod app;
pub mod errors;
pub mod handlers;
pub mod mcp_backend;
pub mod pipeline;
pub mod startup;
pub mod state;

pub use app::build_router;
pub use pipeline::{invoke_tool, render_prompt, verify_headers, AuthOutcome};
pub use startup::{reload, serve};
pub use state::{AppState, RegistryHandle, SERVER_VERSION};

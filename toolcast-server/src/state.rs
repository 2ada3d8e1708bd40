//! Application state
//!
//! The live registry sits behind a shared lock holding an `Arc`: readers
//! clone the `Arc` and drop the lock immediately, the reload path swaps
//! the pointer. In-flight requests keep their original registry (and its
//! sources) until they complete.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use toolcast_core::registry::Registry;
use toolcast_mcp::{McpServer, McpState, ServerInfo, SessionManager};

use crate::mcp_backend::PipelineBackend;

/// Server version reported on both wire surfaces
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared handle to the current registry generation
#[derive(Clone)]
pub struct RegistryHandle {
    inner: Arc<RwLock<Arc<Registry>>>,
}

impl RegistryHandle {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    /// Snapshot of the current generation
    pub async fn current(&self) -> Arc<Registry> {
        self.inner.read().await.clone()
    }

    /// Swap in a freshly-initialized registry.
    pub async fn swap(&self, next: Arc<Registry>) {
        let mut guard = self.inner.write().await;
        let previous = std::mem::replace(&mut *guard, next);
        drop(guard);
        info!(
            tools = previous.tool_count(),
            "registry swapped; previous generation retires with its in-flight requests"
        );
    }
}

/// Everything the routers need
#[derive(Clone)]
pub struct AppState {
    registry: RegistryHandle,
    mcp: Arc<McpServer<PipelineBackend>>,
}

impl AppState {
    pub fn new(registry: Arc<Registry>) -> Self {
        let handle = RegistryHandle::new(registry);
        let backend = PipelineBackend::new(handle.clone());
        let mcp = McpServer::new(
            backend,
            SessionManager::default(),
            ServerInfo {
                name: "toolcast".to_string(),
                version: SERVER_VERSION.to_string(),
            },
        );
        Self {
            registry: handle,
            mcp: Arc::new(mcp),
        }
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }
}

impl McpState for AppState {
    type Backend = PipelineBackend;

    fn mcp_server(&self) -> &McpServer<Self::Backend> {
        &self.mcp
    }
}

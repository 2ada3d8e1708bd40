//! Bridges the MCP surface onto the invocation pipeline

use async_trait::async_trait;
use http::HeaderMap;
use serde_json::Value;

use toolcast_core::error::ToolcastResult;
use toolcast_core::params::JsonMap;
use toolcast_core::prompt::{McpPromptManifest, PromptMessage};
use toolcast_core::tool::McpToolManifest;
use toolcast_mcp::McpBackend;

use crate::pipeline;
use crate::state::RegistryHandle;

/// [`McpBackend`] implementation backed by the live registry
pub struct PipelineBackend {
    registry: RegistryHandle,
}

impl PipelineBackend {
    pub fn new(registry: RegistryHandle) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl McpBackend for PipelineBackend {
    async fn list_tools(&self) -> Vec<McpToolManifest> {
        let registry = self.registry.current().await;
        let mut manifests: Vec<McpToolManifest> =
            registry.tools().map(|tool| tool.mcp_manifest()).collect();
        manifests.sort_by(|a, b| a.name.cmp(&b.name));
        manifests
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: &JsonMap,
        headers: &HeaderMap,
    ) -> ToolcastResult<Value> {
        let registry = self.registry.current().await;
        pipeline::invoke_tool(&registry, name, arguments, headers).await
    }

    async fn list_prompts(&self) -> Vec<McpPromptManifest> {
        let registry = self.registry.current().await;
        let mut manifests: Vec<McpPromptManifest> =
            registry.prompts().map(|prompt| prompt.mcp_manifest()).collect();
        manifests.sort_by(|a, b| a.name.cmp(&b.name));
        manifests
    }

    async fn get_prompt(
        &self,
        name: &str,
        arguments: &JsonMap,
    ) -> ToolcastResult<(String, Vec<PromptMessage>)> {
        let registry = self.registry.current().await;
        pipeline::render_prompt(&registry, name, arguments).await
    }
}

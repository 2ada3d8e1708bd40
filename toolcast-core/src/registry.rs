//! Runtime registry produced by configuration wiring
//!
//! The registry is immutable once built. Reload builds a fresh one and the
//! server swaps an `Arc`; in-flight requests keep their original sources
//! until completion.

use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::error::{ToolcastError, ToolcastResult};
use crate::prompt::Prompt;
use crate::source::Source;
use crate::tool::Tool;

/// A named grouping of tools for catalog purposes
#[derive(Debug, Clone)]
pub struct Toolset {
    pub name: String,
    pub tool_names: Vec<String>,
}

/// Immutable lookup tables for one configuration generation
pub struct Registry {
    sources: HashMap<String, Arc<dyn Source>>,
    auth_services: HashMap<String, Arc<dyn AuthService>>,
    tools: HashMap<String, Arc<dyn Tool>>,
    prompts: HashMap<String, Arc<dyn Prompt>>,
    toolsets: HashMap<String, Toolset>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .field("auth_services", &self.auth_services.keys().collect::<Vec<_>>())
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("prompts", &self.prompts.keys().collect::<Vec<_>>())
            .field("toolsets", &self.toolsets)
            .finish()
    }
}

impl Registry {
    pub fn new(
        sources: HashMap<String, Arc<dyn Source>>,
        auth_services: HashMap<String, Arc<dyn AuthService>>,
        tools: HashMap<String, Arc<dyn Tool>>,
        prompts: HashMap<String, Arc<dyn Prompt>>,
        toolsets: HashMap<String, Toolset>,
    ) -> Self {
        Self {
            sources,
            auth_services,
            tools,
            prompts,
            toolsets,
        }
    }

    /// An empty registry, used before the first configuration load in tests.
    pub fn empty() -> Self {
        Self::new(
            HashMap::new(),
            HashMap::new(),
            HashMap::new(),
            HashMap::new(),
            HashMap::new(),
        )
    }

    pub fn tool(&self, name: &str) -> ToolcastResult<&Arc<dyn Tool>> {
        self.tools
            .get(name)
            .ok_or_else(|| ToolcastError::UnknownTool {
                name: name.to_string(),
            })
    }

    pub fn prompt(&self, name: &str) -> ToolcastResult<&Arc<dyn Prompt>> {
        self.prompts
            .get(name)
            .ok_or_else(|| ToolcastError::UnknownPrompt {
                name: name.to_string(),
            })
    }

    /// Tools of a toolset, in the toolset's declaration order.
    ///
    /// The empty name selects every registered tool.
    pub fn toolset_tools(&self, name: &str) -> ToolcastResult<Vec<&Arc<dyn Tool>>> {
        if name.is_empty() {
            return Ok(self.tools.values().collect());
        }
        let toolset = self
            .toolsets
            .get(name)
            .ok_or_else(|| ToolcastError::UnknownToolset {
                name: name.to_string(),
            })?;
        toolset
            .tool_names
            .iter()
            .map(|tool_name| self.tool(tool_name))
            .collect()
    }

    pub fn tools(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.values()
    }

    pub fn prompts(&self) -> impl Iterator<Item = &Arc<dyn Prompt>> {
        self.prompts.values()
    }

    pub fn auth_services(&self) -> impl Iterator<Item = &Arc<dyn AuthService>> {
        self.auth_services.values()
    }

    pub fn source(&self, name: &str) -> Option<&Arc<dyn Source>> {
        self.sources.get(name)
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Close every source handle. Called at process shutdown.
    pub async fn close(&self) {
        for (name, source) in &self.sources {
            tracing::debug!(source = %name, "closing source");
            source.close().await;
        }
    }
}

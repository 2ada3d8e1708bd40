//! Prompt contract and manifest types

use serde::Serialize;

use crate::error::ToolcastResult;
use crate::params::{JsonMap, ParamValues};

/// One rendered message of a prompt
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

/// MCP manifest for one prompt, as emitted by `prompts/list`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct McpPromptManifest {
    pub name: String,
    pub description: String,
    pub arguments: Vec<McpPromptArgument>,
}

/// Argument descriptor inside a prompt manifest.
///
/// Arguments backed by a default report `required: false`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct McpPromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// A named parameterised message template.
pub trait Prompt: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Parse raw arguments against the prompt's declared argument list,
    /// applying defaults.
    fn parse_args(&self, raw: &JsonMap) -> ToolcastResult<ParamValues>;

    /// Render every message template against the parsed argument map,
    /// preserving message order.
    fn substitute_params(&self, values: &ParamValues) -> ToolcastResult<Vec<PromptMessage>>;

    fn mcp_manifest(&self) -> McpPromptManifest;
}

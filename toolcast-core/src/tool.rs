//! Tool contract and manifest types

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

use crate::error::ToolcastResult;
use crate::params::{ClaimsByService, JsonMap, ParamValues, ParameterManifest};

/// JSON-surface manifest for one tool
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolManifest {
    pub description: String,
    pub parameters: Vec<ParameterManifest>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub template_parameters: Vec<ParameterManifest>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub auth_required: Vec<String>,
}

/// MCP manifest for one tool, as emitted by `tools/list`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct McpToolManifest {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A typed, named operation bound to at most one source.
///
/// Dropping the `invoke` future cancels the request; drivers that accept
/// cancellation pick it up from there.
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Run the operation with already-parsed values.
    ///
    /// `access_token` carries the caller's raw `Authorization` header for
    /// tools that propagate client credentials to the backend.
    async fn invoke(
        &self,
        params: ParamValues,
        access_token: Option<&str>,
    ) -> ToolcastResult<Value>;

    /// Parse and coerce a raw argument map, filling auth-backed parameters
    /// from verified claims.
    fn parse_params(&self, raw: &JsonMap, claims: &ClaimsByService)
        -> ToolcastResult<ParamValues>;

    fn manifest(&self) -> ToolManifest;

    fn mcp_manifest(&self) -> McpToolManifest;

    /// Auth gate: every required service must have verified, or none are
    /// required.
    fn authorized(&self, verified: &HashSet<String>) -> bool;

    /// Whether the caller's bearer is forwarded to the backend instead of
    /// the server's own ambient identity.
    fn requires_client_authorization(&self) -> bool {
        false
    }
}

/// Shared implementation of the auth gate.
pub fn authorized(required: &[String], verified: &HashSet<String>) -> bool {
    required.is_empty() || required.iter().all(|service| verified.contains(service))
}

impl std::fmt::Debug for dyn Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool").field("name", &self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verified(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_requirement_is_open() {
        assert!(authorized(&[], &verified(&[])));
        assert!(authorized(&[], &verified(&["g1"])));
    }

    #[test]
    fn test_subset_requirement() {
        let required = vec!["g1".to_string(), "g2".to_string()];
        assert!(authorized(&required, &verified(&["g1", "g2", "g3"])));
        assert!(!authorized(&required, &verified(&["g1"])));
        assert!(!authorized(&required, &verified(&[])));
    }
}

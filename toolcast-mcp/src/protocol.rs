//! MCP protocol types and version negotiation

use serde::{Deserialize, Serialize};
use serde_json::Value;

use toolcast_core::params::JsonMap;
use toolcast_core::prompt::McpPromptManifest;
use toolcast_core::tool::McpToolManifest;

/// Protocol versions this server speaks, oldest first
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

/// Version advertised by default
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Pick the version echoed back on `initialize`.
///
/// An exact match wins; a client version this server has never heard of
/// gets the server's latest, and reconnection is the client's concern.
pub fn negotiate_protocol_version(client_version: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .find(|v| **v == client_version)
        .copied()
        .unwrap_or_else(|| SUPPORTED_PROTOCOL_VERSIONS[SUPPORTED_PROTOCOL_VERSIONS.len() - 1])
}

/// `initialize` request parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default = "default_client_version")]
    pub protocol_version: String,

    #[serde(default)]
    pub capabilities: Value,

    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Client identity from `initialize`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// `initialize` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

/// Capability advertisement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub tools: ListChangedCapability,
    pub prompts: ListChangedCapability,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: ListChangedCapability {
                list_changed: false,
            },
            prompts: ListChangedCapability {
                list_changed: false,
            },
        }
    }
}

/// The registry only changes on reload, so list-changed notifications are
/// never emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListChangedCapability {
    pub list_changed: bool,
}

/// Server identity in the `initialize` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// `tools/list` response
#[derive(Debug, Clone, Serialize)]
pub struct ToolsListResult {
    pub tools: Vec<McpToolManifest>,
}

/// `tools/call` request parameters
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<JsonMap>,
}

/// `tools/call` response, also used for `prompts/get` execution failures
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResult {
    pub content: Vec<ToolContent>,
    pub is_error: bool,
}

impl CallResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: true,
        }
    }
}

/// Content blocks inside a call result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
}

/// `prompts/list` response
#[derive(Debug, Clone, Serialize)]
pub struct PromptsListResult {
    pub prompts: Vec<McpPromptManifest>,
}

/// `prompts/get` request parameters
#[derive(Debug, Clone, Deserialize)]
pub struct PromptsGetParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<JsonMap>,
}

/// `prompts/get` response
#[derive(Debug, Clone, Serialize)]
pub struct PromptsGetResult {
    pub description: String,
    pub messages: Vec<PromptWireMessage>,
}

/// A rendered prompt message in wire form
#[derive(Debug, Clone, Serialize)]
pub struct PromptWireMessage {
    pub role: String,
    pub content: ToolContent,
}

fn default_client_version() -> String {
    DEFAULT_PROTOCOL_VERSION.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiation_exact_match() {
        assert_eq!(negotiate_protocol_version("2024-11-05"), "2024-11-05");
        assert_eq!(negotiate_protocol_version("2025-03-26"), "2025-03-26");
    }

    #[test]
    fn test_negotiation_unknown_version_gets_latest() {
        assert_eq!(negotiate_protocol_version("1999-01-01"), "2025-06-18");
    }

    #[test]
    fn test_capabilities_wire_shape() {
        let caps = ServerCapabilities::default();
        let value = serde_json::to_value(&caps).unwrap();
        assert_eq!(value["tools"]["listChanged"], serde_json::json!(false));
        assert_eq!(value["prompts"]["listChanged"], serde_json::json!(false));
    }

    #[test]
    fn test_call_result_error_shape() {
        let result = CallResult::error("boom");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["isError"], serde_json::json!(true));
        assert_eq!(value["content"][0]["type"], serde_json::json!("text"));
        assert_eq!(value["content"][0]["text"], serde_json::json!("boom"));
    }
}

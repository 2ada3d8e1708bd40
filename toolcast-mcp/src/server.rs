//! MCP method dispatch
//!
//! A single JSON-RPC dispatcher backed by whatever implements
//! [`McpBackend`]; the server crate plugs the invocation pipeline in here.

use async_trait::async_trait;
use http::HeaderMap;
use serde_json::Value;
use tracing::{debug, warn};

use toolcast_core::error::{ToolcastError, ToolcastResult};
use toolcast_core::params::JsonMap;
use toolcast_core::prompt::{McpPromptManifest, PromptMessage};
use toolcast_core::tool::McpToolManifest;

use crate::jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
use crate::protocol::{
    negotiate_protocol_version, CallResult, InitializeParams, InitializeResult, PromptWireMessage,
    PromptsGetParams, PromptsGetResult, PromptsListResult, ServerCapabilities, ServerInfo,
    ToolContent, ToolsCallParams, ToolsListResult,
};
use crate::session::SessionManager;

/// What the MCP surface needs from the application
#[async_trait]
pub trait McpBackend: Send + Sync + 'static {
    /// Current tool manifests
    async fn list_tools(&self) -> Vec<McpToolManifest>;

    /// Run a tool through the invocation pipeline. Headers carry the
    /// per-service auth tokens and the forwardable bearer.
    async fn call_tool(
        &self,
        name: &str,
        arguments: &JsonMap,
        headers: &HeaderMap,
    ) -> ToolcastResult<Value>;

    /// Current prompt manifests
    async fn list_prompts(&self) -> Vec<McpPromptManifest>;

    /// Parse arguments and render a prompt.
    async fn get_prompt(
        &self,
        name: &str,
        arguments: &JsonMap,
    ) -> ToolcastResult<(String, Vec<PromptMessage>)>;
}

/// Outcome of dispatching one JSON-RPC document
pub struct DispatchOutcome {
    /// None for notifications
    pub response: Option<JsonRpcResponse>,
    /// Session created by `initialize`, echoed as `Mcp-Session-Id`
    pub new_session_id: Option<String>,
}

impl DispatchOutcome {
    fn respond(response: JsonRpcResponse) -> Self {
        Self {
            response: Some(response),
            new_session_id: None,
        }
    }

    fn silent() -> Self {
        Self {
            response: None,
            new_session_id: None,
        }
    }
}

/// MCP server: dispatch plus session tracking
pub struct McpServer<B: McpBackend> {
    backend: B,
    sessions: SessionManager,
    server_info: ServerInfo,
}

impl<B: McpBackend> McpServer<B> {
    pub fn new(backend: B, sessions: SessionManager, server_info: ServerInfo) -> Self {
        Self {
            backend,
            sessions,
            server_info,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Handle one JSON-RPC document.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        headers: &HeaderMap,
    ) -> DispatchOutcome {
        debug!(method = %request.method, id = ?request.id, "mcp request");

        if request.jsonrpc != JSONRPC_VERSION {
            return DispatchOutcome::respond(JsonRpcResponse::error(
                JsonRpcError::invalid_request(format!(
                    "unsupported jsonrpc version {:?}",
                    request.jsonrpc
                )),
                request.id,
            ));
        }

        let id = request.id.clone();
        let method = request.method.clone();
        match method.as_str() {
            "initialize" => self.handle_initialize(request).await,
            "notifications/initialized" => {
                debug!("client initialized");
                DispatchOutcome::silent()
            }
            "ping" => self.reply(id, Ok(serde_json::json!({}))),
            "tools/list" => {
                let tools = self.backend.list_tools().await;
                self.reply(id, serde_json::to_value(ToolsListResult { tools }))
            }
            "tools/call" => self.handle_tools_call(request, headers).await,
            "prompts/list" => {
                let prompts = self.backend.list_prompts().await;
                self.reply(id, serde_json::to_value(PromptsListResult { prompts }))
            }
            "prompts/get" => self.handle_prompts_get(request).await,
            other => {
                if request.is_notification() {
                    // Unknown notifications are dropped, per JSON-RPC
                    return DispatchOutcome::silent();
                }
                DispatchOutcome::respond(JsonRpcResponse::error(
                    JsonRpcError::method_not_found(other),
                    id,
                ))
            }
        }
    }

    async fn handle_initialize(&self, request: JsonRpcRequest) -> DispatchOutcome {
        let params: InitializeParams = match request.params {
            Some(params) => match serde_json::from_value(params) {
                Ok(params) => params,
                Err(e) => {
                    return DispatchOutcome::respond(JsonRpcResponse::error(
                        JsonRpcError::invalid_params(format!("invalid initialize params: {}", e)),
                        request.id,
                    ))
                }
            },
            None => {
                return DispatchOutcome::respond(JsonRpcResponse::error(
                    JsonRpcError::invalid_params("initialize requires parameters"),
                    request.id,
                ))
            }
        };

        let version = negotiate_protocol_version(&params.protocol_version);
        let session = self.sessions.create(version, params.client_info).await;

        let result = InitializeResult {
            protocol_version: version.to_string(),
            capabilities: ServerCapabilities::default(),
            server_info: self.server_info.clone(),
        };

        let mut outcome = self.reply(request.id, serde_json::to_value(result));
        outcome.new_session_id = Some(session.id);
        outcome
    }

    async fn handle_tools_call(
        &self,
        request: JsonRpcRequest,
        headers: &HeaderMap,
    ) -> DispatchOutcome {
        let id = request.id.clone();
        let params: ToolsCallParams = match request.params.map(serde_json::from_value).transpose()
        {
            Ok(Some(params)) => params,
            Ok(None) => {
                return DispatchOutcome::respond(JsonRpcResponse::error(
                    JsonRpcError::invalid_params("tools/call requires parameters"),
                    id,
                ))
            }
            Err(e) => {
                return DispatchOutcome::respond(JsonRpcResponse::error(
                    JsonRpcError::invalid_params(format!("invalid tools/call params: {}", e)),
                    id,
                ))
            }
        };

        let arguments = params.arguments.unwrap_or_default();
        match self.backend.call_tool(&params.name, &arguments, headers).await {
            Ok(result) => {
                let text = serde_json::to_string(&result).unwrap_or_default();
                self.reply(id, serde_json::to_value(CallResult::text(text)))
            }
            // Execution failures are a successful response with isError,
            // per the MCP failure convention for tool calls
            Err(err) if err.is_execution_error() => {
                warn!(tool = %params.name, error = %err, "tool execution failed");
                self.reply(id, serde_json::to_value(CallResult::error(err.to_string())))
            }
            Err(err) => DispatchOutcome::respond(JsonRpcResponse::error(to_rpc_error(&err), id)),
        }
    }

    async fn handle_prompts_get(&self, request: JsonRpcRequest) -> DispatchOutcome {
        let id = request.id.clone();
        let params: PromptsGetParams = match request.params.map(serde_json::from_value).transpose()
        {
            Ok(Some(params)) => params,
            Ok(None) => {
                return DispatchOutcome::respond(JsonRpcResponse::error(
                    JsonRpcError::invalid_params("prompts/get requires parameters"),
                    id,
                ))
            }
            Err(e) => {
                return DispatchOutcome::respond(JsonRpcResponse::error(
                    JsonRpcError::invalid_params(format!("invalid prompts/get params: {}", e)),
                    id,
                ))
            }
        };

        let arguments = params.arguments.unwrap_or_default();
        match self.backend.get_prompt(&params.name, &arguments).await {
            Ok((description, messages)) => {
                let result = PromptsGetResult {
                    description,
                    messages: messages
                        .into_iter()
                        .map(|m| PromptWireMessage {
                            role: m.role,
                            content: ToolContent::Text { text: m.content },
                        })
                        .collect(),
                };
                self.reply(id, serde_json::to_value(result))
            }
            Err(err) if err.is_execution_error() => {
                warn!(prompt = %params.name, error = %err, "prompt rendering failed");
                self.reply(id, serde_json::to_value(CallResult::error(err.to_string())))
            }
            Err(err) => DispatchOutcome::respond(JsonRpcResponse::error(to_rpc_error(&err), id)),
        }
    }

    fn reply(
        &self,
        id: Option<Value>,
        result: Result<Value, serde_json::Error>,
    ) -> DispatchOutcome {
        match result {
            Ok(value) => DispatchOutcome::respond(JsonRpcResponse::success(value, id)),
            Err(e) => DispatchOutcome::respond(JsonRpcResponse::error(
                JsonRpcError::internal_error(e.to_string()),
                id,
            )),
        }
    }
}

fn to_rpc_error(err: &ToolcastError) -> JsonRpcError {
    JsonRpcError::new(err.json_rpc_code(), err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    struct StubBackend {
        tools: Vec<McpToolManifest>,
        results: HashMap<String, ToolcastResult<Value>>,
    }

    #[async_trait]
    impl McpBackend for StubBackend {
        async fn list_tools(&self) -> Vec<McpToolManifest> {
            self.tools.clone()
        }

        async fn call_tool(
            &self,
            name: &str,
            _arguments: &JsonMap,
            _headers: &HeaderMap,
        ) -> ToolcastResult<Value> {
            self.results
                .get(name)
                .cloned()
                .unwrap_or_else(|| {
                    Err(ToolcastError::UnknownTool {
                        name: name.to_string(),
                    })
                })
        }

        async fn list_prompts(&self) -> Vec<McpPromptManifest> {
            Vec::new()
        }

        async fn get_prompt(
            &self,
            name: &str,
            _arguments: &JsonMap,
        ) -> ToolcastResult<(String, Vec<PromptMessage>)> {
            Err(ToolcastError::UnknownPrompt {
                name: name.to_string(),
            })
        }
    }

    fn server(results: HashMap<String, ToolcastResult<Value>>) -> McpServer<StubBackend> {
        McpServer::new(
            StubBackend {
                tools: vec![McpToolManifest {
                    name: "t1".to_string(),
                    description: "a tool".to_string(),
                    input_schema: json!({"type": "object"}),
                }],
                results,
            },
            SessionManager::default(),
            ServerInfo {
                name: "toolcast".to_string(),
                version: "0.0.0".to_string(),
            },
        )
    }

    fn request(method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest::new(method, Some(params), Some(json!("x")))
    }

    #[tokio::test]
    async fn test_initialize_negotiates_and_creates_session() {
        let server = server(HashMap::new());
        let outcome = server
            .handle_request(
                request("initialize", json!({"protocolVersion": "2025-03-26"})),
                &HeaderMap::new(),
            )
            .await;

        let response = outcome.response.unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], json!("2025-03-26"));
        assert_eq!(result["capabilities"]["tools"]["listChanged"], json!(false));
        assert!(outcome.new_session_id.is_some());
        assert_eq!(server.sessions().len().await, 1);
    }

    #[tokio::test]
    async fn test_ping_is_empty_result() {
        let server = server(HashMap::new());
        let outcome = server
            .handle_request(request("ping", json!({})), &HeaderMap::new())
            .await;
        assert_eq!(outcome.response.unwrap().result.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_initialized_notification_is_silent() {
        let server = server(HashMap::new());
        let outcome = server
            .handle_request(
                JsonRpcRequest::notification("notifications/initialized", None),
                &HeaderMap::new(),
            )
            .await;
        assert!(outcome.response.is_none());
    }

    #[tokio::test]
    async fn test_tools_call_backend_failure_is_error_content() {
        let mut results = HashMap::new();
        results.insert(
            "exec_sql".to_string(),
            Err(ToolcastError::backend("near \"SELEC\": syntax error")),
        );
        let server = server(results);

        let outcome = server
            .handle_request(
                request("tools/call", json!({"name": "exec_sql", "arguments": {"sql": "SELEC 1"}})),
                &HeaderMap::new(),
            )
            .await;

        let response = outcome.response.unwrap();
        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["isError"], json!(true));
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("syntax error"));
    }

    #[tokio::test]
    async fn test_tools_call_unknown_tool_is_invalid_params() {
        let server = server(HashMap::new());
        let outcome = server
            .handle_request(
                request("tools/call", json!({"name": "nope", "arguments": {}})),
                &HeaderMap::new(),
            )
            .await;

        let response = outcome.response.unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert!(error.message.contains("tool with name \"nope\" does not exist"));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let server = server(HashMap::new());
        let outcome = server
            .handle_request(request("bogus/method", json!({})), &HeaderMap::new())
            .await;
        assert_eq!(outcome.response.unwrap().error.unwrap().code, -32601);
    }
}

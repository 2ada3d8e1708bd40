//! REST-wrapper tool kind
//!
//! Composes a request from the bound HTTP source's base URL: a path
//! template, merged headers (tool wins on conflict), declared query
//! parameters, and a Handlebars body template over `{{.param}}`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use serde_yaml::Value as YamlValue;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use toolcast_core::error::{ConfigError, ConfigResult, ToolcastError, ToolcastResult};
use toolcast_core::kinds::{decode_strict, InitContext, ToolConfig};
use toolcast_core::params::{self, ClaimsByService, JsonMap, ParamValues, Parameter};
use toolcast_core::source::Source;
use toolcast_core::template::TemplateEngine;
use toolcast_core::tool::{authorized, McpToolManifest, Tool, ToolManifest};

use toolcast_sources::HttpSource;

pub const KIND: &str = "http";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct HttpToolConfig {
    #[serde(skip)]
    name: String,

    source: String,

    #[serde(default)]
    description: String,

    #[serde(default)]
    auth_required: Vec<String>,

    #[serde(default = "default_method")]
    method: String,

    /// Path template appended to the source base URL; `{{.param}}`
    /// references resolve against every parsed parameter
    path: String,

    /// Headers merged over the source defaults
    #[serde(default)]
    headers: BTreeMap<String, String>,

    /// Body template rendered against the body parameters
    #[serde(default)]
    request_body: String,

    /// Body parameters, substituted into `requestBody`
    #[serde(default)]
    parameters: Vec<Parameter>,

    /// Query parameters appended to the request URL
    #[serde(default)]
    query_params: Vec<Parameter>,

    /// Forward the caller's bearer to the backend instead of acting under
    /// the server's own identity
    #[serde(default)]
    use_client_authorization: bool,
}

pub fn decode_config(name: &str, node: YamlValue) -> ConfigResult<Box<dyn ToolConfig>> {
    let mut config: HttpToolConfig = decode_strict("tool", name, node)?;
    config.name = name.to_string();
    Ok(Box::new(config))
}

impl ToolConfig for HttpToolConfig {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&self, ctx: &InitContext) -> ConfigResult<Arc<dyn Tool>> {
        let method: reqwest::Method =
            self.method
                .to_uppercase()
                .parse()
                .map_err(|_| ConfigError::InvalidConfig {
                    family: "tool",
                    name: self.name.clone(),
                    message: format!("invalid HTTP method {:?}", self.method),
                })?;

        let mut declared = self.parameters.clone();
        declared.extend(self.query_params.iter().cloned());
        params::validate_parameters(&declared).map_err(|message| ConfigError::InvalidConfig {
            family: "tool",
            name: self.name.clone(),
            message,
        })?;

        let binding_services: Vec<String> = declared
            .iter()
            .flat_map(|p| p.auth_services.iter().map(|b| b.name.clone()))
            .collect();
        ctx.require_auth_services(&self.name, &binding_services)?;
        ctx.require_auth_services(&self.name, &self.auth_required)?;

        let source = ctx.source(&self.name, &self.source)?;
        if source.as_any().downcast_ref::<HttpSource>().is_none() {
            return Err(ConfigError::IncompatibleSource {
                tool: self.name.clone(),
                tool_kind: KIND.to_string(),
                source_kind: source.kind().to_string(),
            });
        }

        let engine = TemplateEngine::new();
        engine
            .validate(&self.path)
            .and_then(|_| engine.validate(&self.request_body))
            .map_err(|e| ConfigError::InvalidConfig {
                family: "tool",
                name: self.name.clone(),
                message: e.to_string(),
            })?;

        Ok(Arc::new(HttpTool {
            name: self.name.clone(),
            description: self.description.clone(),
            auth_required: self.auth_required.clone(),
            method,
            path: self.path.clone(),
            headers: self.headers.clone(),
            request_body: self.request_body.clone(),
            body_params: self.parameters.clone(),
            query_params: self.query_params.clone(),
            use_client_authorization: self.use_client_authorization,
            engine,
            source,
        }))
    }
}

pub struct HttpTool {
    name: String,
    description: String,
    auth_required: Vec<String>,
    method: reqwest::Method,
    path: String,
    headers: BTreeMap<String, String>,
    request_body: String,
    body_params: Vec<Parameter>,
    query_params: Vec<Parameter>,
    use_client_authorization: bool,
    engine: TemplateEngine,
    source: Arc<dyn Source>,
}

impl HttpTool {
    fn http_source(&self) -> ToolcastResult<&HttpSource> {
        self.source
            .as_any()
            .downcast_ref::<HttpSource>()
            .ok_or_else(|| ToolcastError::internal("source lost its HTTP capability"))
    }

    fn declared(&self) -> Vec<Parameter> {
        let mut declared = self.body_params.clone();
        declared.extend(self.query_params.iter().cloned());
        declared
    }
}

#[async_trait]
impl Tool for HttpTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(
        &self,
        params: ParamValues,
        access_token: Option<&str>,
    ) -> ToolcastResult<Value> {
        let source = self.http_source()?;
        let all_values = params.as_map();

        let path = self.engine.render(&self.path, &all_values)?;
        let url = source
            .base_url()
            .join(path.trim_start_matches('/'))
            .map_err(|e| ToolcastError::backend(format!("invalid request URL: {}", e)))?;

        let mut request = source.client().request(self.method.clone(), url);

        // Source defaults first, tool headers win on conflict
        let mut headers = source.default_headers().clone();
        headers.extend(self.headers.clone());
        for (name, value) in &headers {
            request = request.header(name, value);
        }

        let mut query: Vec<(String, String)> = source
            .default_query()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let (_, query_tail) = params.0.split_at(self.body_params.len());
        for pv in query_tail {
            let rendered = match &pv.value {
                Value::String(s) => s.clone(),
                Value::Null => continue,
                other => other.to_string(),
            };
            query.push((pv.name.clone(), rendered));
        }
        if !query.is_empty() {
            request = request.query(&query);
        }

        if self.use_client_authorization {
            if let Some(token) = access_token {
                request = request.header("Authorization", token);
            }
        }

        if !self.request_body.is_empty() {
            let body_values: JsonMap = params.0[..self.body_params.len()]
                .iter()
                .map(|pv| (pv.name.clone(), pv.value.clone()))
                .collect();
            let body = self.engine.render(&self.request_body, &body_values)?;
            request = request
                .header("Content-Type", "application/json")
                .body(body);
        }

        debug!(tool = %self.name, method = %self.method, "dispatching request");
        let response = request
            .send()
            .await
            .map_err(|e| ToolcastError::backend(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ToolcastError::backend(e.to_string()))?;

        if !status.is_success() {
            return Err(ToolcastError::backend(format!(
                "backend returned {}: {}",
                status, text
            )));
        }

        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    fn parse_params(
        &self,
        raw: &JsonMap,
        claims: &ClaimsByService,
    ) -> ToolcastResult<ParamValues> {
        params::parse_params(&self.declared(), raw, claims)
    }

    fn manifest(&self) -> ToolManifest {
        ToolManifest {
            description: self.description.clone(),
            parameters: params::manifest(&self.declared()),
            template_parameters: Vec::new(),
            auth_required: self.auth_required.clone(),
        }
    }

    fn mcp_manifest(&self) -> McpToolManifest {
        McpToolManifest {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: params::mcp_input_schema(&self.declared()),
        }
    }

    fn authorized(&self, verified: &HashSet<String>) -> bool {
        authorized(&self.auth_required, verified)
    }

    fn requires_client_authorization(&self) -> bool {
        self.use_client_authorization
    }
}

fn default_method() -> String {
    "GET".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::RawQuery;
    use axum::http::{HeaderMap as AxumHeaderMap, Method, StatusCode};
    use axum::routing::any;
    use axum::{Json, Router};
    use serde_json::json;
    use std::net::SocketAddr;

    async fn echo(
        method: Method,
        RawQuery(query): RawQuery,
        headers: AxumHeaderMap,
        body: String,
    ) -> Json<Value> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };
        Json(json!({
            "method": method.to_string(),
            "query": query.unwrap_or_default(),
            "authorization": header("Authorization"),
            "xTeam": header("X-Team"),
            "xApiKey": header("X-Api-Key"),
            "body": body,
        }))
    }

    async fn fail() -> (StatusCode, &'static str) {
        (StatusCode::INTERNAL_SERVER_ERROR, "backend exploded")
    }

    async fn spawn_echo_server() -> SocketAddr {
        let router = Router::new()
            .route("/items/{id}", any(echo))
            .route("/fail", any(fail));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        addr
    }

    async fn http_ctx(addr: SocketAddr) -> InitContext {
        let node: YamlValue = serde_yaml::from_str(&format!(
            r#"
baseUrl: "http://{addr}/"
headers:
  X-Team: source
  X-Api-Key: k
queryParams:
  format: json
"#
        ))
        .unwrap();
        let source = toolcast_sources::http::decode_config("api", node)
            .unwrap()
            .initialize()
            .await
            .unwrap();
        InitContext {
            sources: std::collections::HashMap::from([("api".to_string(), source)]),
            auth_services: std::collections::HashMap::new(),
        }
    }

    fn tool_config(extra: &str) -> HttpToolConfig {
        let node: YamlValue = serde_yaml::from_str(&format!(
            r#"
source: api
description: echo an item
method: post
path: "items/{{{{.id}}}}"
headers:
  X-Team: tools
requestBody: "{{{{.name}}}}"
parameters:
  - {{name: id, type: integer, description: item id}}
  - {{name: name, type: string, description: item name}}
queryParams:
  - {{name: verbose, type: boolean, description: verbose flag}}
{extra}
"#
        ))
        .unwrap();
        let mut config: HttpToolConfig = serde_yaml::from_value(node).unwrap();
        config.name = "echo_item".to_string();
        config
    }

    fn raw_args() -> JsonMap {
        let mut raw = JsonMap::new();
        raw.insert("id".to_string(), json!(7));
        raw.insert("name".to_string(), json!("widget"));
        raw.insert("verbose".to_string(), json!(true));
        raw
    }

    #[tokio::test]
    async fn test_composes_request_from_source_and_tool() {
        let addr = spawn_echo_server().await;
        let ctx = http_ctx(addr).await;
        let tool = tool_config("").initialize(&ctx).unwrap();

        let values = tool.parse_params(&raw_args(), &Default::default()).unwrap();
        let result = tool.invoke(values, Some("Bearer tok")).await.unwrap();

        assert_eq!(result["method"], json!("POST"));
        // Tool header wins over the source default; untouched defaults stay
        assert_eq!(result["xTeam"], json!("tools"));
        assert_eq!(result["xApiKey"], json!("k"));
        // Source default query plus the declared query parameter
        let query = result["query"].as_str().unwrap();
        assert!(query.contains("format=json"));
        assert!(query.contains("verbose=true"));
        // Body template rendered against the body parameters
        assert_eq!(result["body"], json!("widget"));
        // Without useClientAuthorization the bearer is not forwarded
        assert_eq!(result["authorization"], Value::Null);
    }

    #[tokio::test]
    async fn test_client_authorization_forwards_bearer() {
        let addr = spawn_echo_server().await;
        let ctx = http_ctx(addr).await;
        let tool = tool_config("useClientAuthorization: true")
            .initialize(&ctx)
            .unwrap();
        assert!(tool.requires_client_authorization());

        let values = tool.parse_params(&raw_args(), &Default::default()).unwrap();
        let result = tool.invoke(values, Some("Bearer tok")).await.unwrap();
        assert_eq!(result["authorization"], json!("Bearer tok"));
    }

    #[tokio::test]
    async fn test_backend_failure_surfaces_status_and_body() {
        let addr = spawn_echo_server().await;
        let ctx = http_ctx(addr).await;

        let node: YamlValue = serde_yaml::from_str(
            r#"
source: api
description: always fails
path: fail
"#,
        )
        .unwrap();
        let mut config: HttpToolConfig = serde_yaml::from_value(node).unwrap();
        config.name = "broken".to_string();
        let tool = config.initialize(&ctx).unwrap();

        let values = tool.parse_params(&JsonMap::new(), &Default::default()).unwrap();
        let err = tool.invoke(values, None).await.unwrap_err();
        match err {
            ToolcastError::Backend { message } => {
                assert!(message.contains("500"));
                assert!(message.contains("backend exploded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_http_source_is_incompatible() {
        struct NotHttp;

        #[async_trait]
        impl Source for NotHttp {
            fn kind(&self) -> &'static str {
                "stub"
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }

            async fn close(&self) {}
        }

        let ctx = InitContext {
            sources: std::collections::HashMap::from([(
                "api".to_string(),
                Arc::new(NotHttp) as Arc<dyn Source>,
            )]),
            auth_services: std::collections::HashMap::new(),
        };
        let err = tool_config("").initialize(&ctx).unwrap_err();
        assert!(matches!(err, ConfigError::IncompatibleSource { .. }));
    }

    #[tokio::test]
    async fn test_invalid_method_rejected() {
        let addr = spawn_echo_server().await;
        let ctx = http_ctx(addr).await;

        let node: YamlValue = serde_yaml::from_str(
            r#"
source: api
description: bad method
method: "NOT A METHOD"
path: fail
"#,
        )
        .unwrap();
        let mut config: HttpToolConfig = serde_yaml::from_value(node).unwrap();
        config.name = "bad_method".to_string();
        let err = config.initialize(&ctx).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig { .. }));
    }
}

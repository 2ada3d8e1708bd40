//! JSON-surface handlers
//!
//! `GET /api/tool/{name}/` returns the tool manifest, `POST
//! /api/tool/{name}/invoke` runs the pipeline, `GET /api/toolset/{name}`
//! aggregates manifests, `GET /healthz` answers liveness probes.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use toolcast_core::error::ToolcastError;
use toolcast_core::tool::ToolManifest;

use crate::errors::ApiError;
use crate::pipeline;
use crate::state::{AppState, SERVER_VERSION};

/// Catalog response shared by the tool and toolset routes
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse {
    pub server_version: &'static str,
    pub tools: BTreeMap<String, ToolManifest>,
}

/// Invoke response: the result is re-serialised to a string so backend
/// formatting (including empty-rowset markers) survives untouched
#[derive(Debug, Serialize)]
pub struct InvokeResponse {
    pub result: String,
}

pub async fn get_tool_manifest(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CatalogResponse>, ApiError> {
    let registry = state.registry().current().await;
    let tool = registry.tool(&name)?;

    let mut tools = BTreeMap::new();
    tools.insert(name, tool.manifest());

    Ok(Json(CatalogResponse {
        server_version: SERVER_VERSION,
        tools,
    }))
}

pub async fn invoke_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Result<Json<Value>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<InvokeResponse>, ApiError> {
    let Json(body) = body.map_err(|e| {
        ApiError(ToolcastError::InvalidParameter {
            name: "body".to_string(),
            reason: format!("malformed JSON body: {}", e),
        })
    })?;

    let raw_args = match body {
        Value::Object(map) => map,
        Value::Null => Default::default(),
        other => {
            return Err(ApiError(ToolcastError::InvalidParameter {
                name: "body".to_string(),
                reason: format!("expected a JSON object, got {}", other),
            }))
        }
    };

    debug!(tool = %name, "invoke request");
    let registry = state.registry().current().await;
    let result = pipeline::invoke_tool(&registry, &name, &raw_args, &headers).await?;

    let result = serde_json::to_string(&result)
        .map_err(|e| ApiError(ToolcastError::internal(e.to_string())))?;
    Ok(Json(InvokeResponse { result }))
}

pub async fn get_toolset_manifest(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CatalogResponse>, ApiError> {
    toolset_manifest(state, name).await
}

/// The unnamed toolset aggregates every registered tool.
pub async fn get_default_toolset_manifest(
    State(state): State<AppState>,
) -> Result<Json<CatalogResponse>, ApiError> {
    toolset_manifest(state, String::new()).await
}

async fn toolset_manifest(
    state: AppState,
    name: String,
) -> Result<Json<CatalogResponse>, ApiError> {
    let registry = state.registry().current().await;
    let tools = registry
        .toolset_tools(&name)?
        .into_iter()
        .map(|tool| (tool.name().to_string(), tool.manifest()))
        .collect();

    Ok(Json(CatalogResponse {
        server_version: SERVER_VERSION,
        tools,
    }))
}

pub async fn healthz() -> Response {
    Json(serde_json::json!({ "status": "healthy" })).into_response()
}

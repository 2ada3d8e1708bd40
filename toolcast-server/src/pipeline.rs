//! Shared invocation pipeline
//!
//! Both wire surfaces run the same sequence: resolve the tool, verify the
//! per-service auth headers, check the auth gate, parse parameters with
//! claim injection, dispatch, format. Cancellation is carried by the
//! request future: when the client goes away the whole chain is dropped.

use http::HeaderMap;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use toolcast_core::error::{ToolcastError, ToolcastResult};
use toolcast_core::params::{ClaimsByService, JsonMap};
use toolcast_core::prompt::PromptMessage;
use toolcast_core::registry::Registry;

/// Suffix of the per-service token headers (`<service>_token`)
pub const TOKEN_HEADER_SUFFIX: &str = "_token";

/// Result of verifying every auth header present on a request
#[derive(Debug, Default)]
pub struct AuthOutcome {
    pub verified: HashSet<String>,
    pub claims: ClaimsByService,
}

/// Call every declared auth service whose token header is present.
///
/// A failed verification is logged and skipped; it only becomes an error
/// when a tool's `authRequired` names the failed service.
pub async fn verify_headers(registry: &Registry, headers: &HeaderMap) -> AuthOutcome {
    let mut outcome = AuthOutcome::default();

    for service in registry.auth_services() {
        let header_name = format!("{}{}", service.name(), TOKEN_HEADER_SUFFIX);
        let Some(token) = headers.get(&header_name).and_then(|v| v.to_str().ok()) else {
            continue;
        };
        let token = token.strip_prefix("Bearer ").unwrap_or(token);

        match service.verify(token).await {
            Ok(claims) => {
                outcome.verified.insert(service.name().to_string());
                outcome.claims.insert(service.name().to_string(), claims);
            }
            Err(e) => {
                debug!(service = service.name(), error = %e, "auth verification failed");
            }
        }
    }

    outcome
}

/// Run one tool invocation end to end.
pub async fn invoke_tool(
    registry: &Registry,
    name: &str,
    raw_args: &JsonMap,
    headers: &HeaderMap,
) -> ToolcastResult<Value> {
    let tool = registry.tool(name)?;

    let auth = verify_headers(registry, headers).await;

    if !tool.authorized(&auth.verified) {
        return Err(ToolcastError::Unauthorized {
            message: format!(
                "tool {:?} requires auth services that have not verified on this request",
                name
            ),
        });
    }

    let params = tool.parse_params(raw_args, &auth.claims)?;

    let access_token = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok());

    debug!(tool = %name, params = params.len(), "invoking tool");
    tool.invoke(params, access_token).await
}

/// Parse prompt arguments and render its messages.
pub async fn render_prompt(
    registry: &Registry,
    name: &str,
    raw_args: &JsonMap,
) -> ToolcastResult<(String, Vec<PromptMessage>)> {
    let prompt = registry.prompt(name)?;
    let values = prompt.parse_args(raw_args)?;
    let messages = prompt.substitute_params(&values)?;
    Ok((prompt.description().to_string(), messages))
}

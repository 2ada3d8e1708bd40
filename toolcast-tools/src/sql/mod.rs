//! SQL tool family
//!
//! One tool kind per dialect plus execute-sql and prebuilt introspection
//! variants, all sharing the same runtime shape: a statement template, a
//! frozen parameter list, positional binding through the source's SQL
//! capability, and rows serialised as ordered column→value maps.

pub mod mysql;
pub mod postgres;
pub mod prebuilt;
pub mod sqlite;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use toolcast_core::error::{ConfigError, ConfigResult, ToolcastError, ToolcastResult};
use toolcast_core::kinds::InitContext;
use toolcast_core::params::{
    self, ClaimsByService, JsonMap, ParamValue, ParamValues, Parameter,
};
use toolcast_core::source::{BindStyle, Source};
use toolcast_core::template::{
    self, parse_template_params, render_identifiers, TemplateParameter, TemplateValue,
};
use toolcast_core::tool::{authorized, McpToolManifest, Tool, ToolManifest};

/// How a kind serialises an empty rowset.
///
/// This is part of each kind's contract: agents learn to parse it, so it
/// must never change silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyResult {
    /// `[]`
    EmptyArray,
    /// `"The query returned 0 rows."`
    Marker,
}

pub(crate) const EMPTY_ROWS_MARKER: &str = "The query returned 0 rows.";

/// Declarative shape shared by the per-dialect `*-sql` kinds
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SqlToolConfig {
    #[serde(skip)]
    pub(crate) name: String,

    pub(crate) source: String,

    #[serde(default)]
    pub(crate) description: String,

    #[serde(default)]
    pub(crate) auth_required: Vec<String>,

    pub(crate) statement: String,

    #[serde(default)]
    pub(crate) parameters: Vec<Parameter>,

    #[serde(default)]
    pub(crate) template_parameters: Vec<TemplateParameter>,
}

impl SqlToolConfig {
    /// Wire this config against a resolved source.
    ///
    /// The source must expose the SQL capability with the dialect's bind
    /// style; kind strings are not compared, so any source satisfying the
    /// capability is accepted.
    pub(crate) fn build(
        &self,
        kind: &'static str,
        bind_style: BindStyle,
        empty_result: EmptyResult,
        ctx: &InitContext,
    ) -> ConfigResult<Arc<dyn Tool>> {
        params::validate_parameters(&self.parameters)
            .map_err(|message| invalid(kind, &self.name, message))?;

        let mut names: HashSet<&str> =
            self.parameters.iter().map(|p| p.name.as_str()).collect();
        for template_param in &self.template_parameters {
            if !names.insert(template_param.name.as_str()) {
                return Err(invalid(
                    kind,
                    &self.name,
                    format!("duplicate parameter name {:?}", template_param.name),
                ));
            }
        }

        let source = ctx.source(&self.name, &self.source)?;
        let sql = source.sql().ok_or_else(|| incompatible(kind, &self.name, &source))?;
        if sql.bind_style() != bind_style {
            return Err(incompatible(kind, &self.name, &source));
        }

        let binding_services: Vec<String> = self
            .parameters
            .iter()
            .flat_map(|p| p.auth_services.iter().map(|b| b.name.clone()))
            .collect();
        ctx.require_auth_services(&self.name, &binding_services)?;
        ctx.require_auth_services(&self.name, &self.auth_required)?;

        Ok(Arc::new(SqlTool {
            name: self.name.clone(),
            kind,
            description: self.description.clone(),
            statement: self.statement.clone(),
            parameters: self.parameters.clone(),
            template_parameters: self.template_parameters.clone(),
            auth_required: self.auth_required.clone(),
            source,
            empty_result,
        }))
    }
}

/// Runtime SQL tool, shared by every dialect kind
pub struct SqlTool {
    name: String,
    kind: &'static str,
    description: String,
    statement: String,
    parameters: Vec<Parameter>,
    template_parameters: Vec<TemplateParameter>,
    auth_required: Vec<String>,
    source: Arc<dyn Source>,
    empty_result: EmptyResult,
}

impl SqlTool {
    pub(crate) fn new_prebuilt(
        name: String,
        kind: &'static str,
        description: String,
        statement: String,
        parameters: Vec<Parameter>,
        auth_required: Vec<String>,
        source: Arc<dyn Source>,
        empty_result: EmptyResult,
    ) -> Self {
        Self {
            name,
            kind,
            description,
            statement,
            parameters,
            template_parameters: Vec::new(),
            auth_required,
            source,
            empty_result,
        }
    }

    /// Rebuild template values from the parsed tail of `ParamValues`.
    fn template_values(&self, tail: &[ParamValue]) -> ToolcastResult<Vec<(String, TemplateValue)>> {
        tail.iter()
            .map(|pv| {
                let value = match &pv.value {
                    Value::String(s) => TemplateValue::Identifier(s.clone()),
                    Value::Array(items) => TemplateValue::List(
                        items
                            .iter()
                            .filter_map(|v| v.as_str().map(|s| s.to_string()))
                            .collect(),
                    ),
                    other => {
                        return Err(ToolcastError::InvalidParameter {
                            name: pv.name.clone(),
                            reason: format!("expected identifier fragment, got {}", other),
                        })
                    }
                };
                Ok((pv.name.clone(), value))
            })
            .collect()
    }
}

#[async_trait]
impl Tool for SqlTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(
        &self,
        params: ParamValues,
        _access_token: Option<&str>,
    ) -> ToolcastResult<Value> {
        let sql = self
            .source
            .sql()
            .ok_or_else(|| ToolcastError::internal("source lost its SQL capability"))?;

        let (bind_values, template_tail) = params.0.split_at(self.parameters.len());

        let statement = if self.template_parameters.is_empty() {
            self.statement.clone()
        } else {
            let template_values = self.template_values(template_tail)?;
            render_identifiers(&self.statement, &template_values)?
        };

        debug!(tool = %self.name, kind = self.kind, "dispatching statement");
        let positional: Vec<Value> = bind_values.iter().map(|pv| pv.value.clone()).collect();
        let rows = sql.query(&statement, &positional).await?;

        if rows.is_empty() && self.empty_result == EmptyResult::Marker {
            return Ok(Value::String(EMPTY_ROWS_MARKER.to_string()));
        }
        Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
    }

    fn parse_params(
        &self,
        raw: &JsonMap,
        claims: &ClaimsByService,
    ) -> ToolcastResult<ParamValues> {
        let mut values = params::parse_params(&self.parameters, raw, claims)?;
        for (name, value) in parse_template_params(&self.template_parameters, raw)? {
            let value = match value {
                TemplateValue::Identifier(s) => Value::String(s),
                TemplateValue::List(items) => {
                    Value::Array(items.into_iter().map(Value::String).collect())
                }
            };
            values.0.push(ParamValue { name, value });
        }
        Ok(values)
    }

    fn manifest(&self) -> ToolManifest {
        ToolManifest {
            description: self.description.clone(),
            parameters: params::manifest(&self.parameters),
            template_parameters: template::manifest(&self.template_parameters),
            auth_required: self.auth_required.clone(),
        }
    }

    fn mcp_manifest(&self) -> McpToolManifest {
        let mut schema = params::mcp_input_schema(&self.parameters);
        template::extend_mcp_schema(&mut schema, &self.template_parameters);
        McpToolManifest {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: schema,
        }
    }

    fn authorized(&self, verified: &HashSet<String>) -> bool {
        authorized(&self.auth_required, verified)
    }
}

/// Declarative shape shared by the per-dialect `*-execute-sql` kinds.
///
/// Intended for operator-controlled contexts: the statement arrives as a
/// single `sql` argument and runs verbatim, with `authRequired` as the
/// only gate.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ExecuteSqlConfig {
    #[serde(skip)]
    pub(crate) name: String,

    pub(crate) source: String,

    #[serde(default)]
    pub(crate) description: String,

    #[serde(default)]
    pub(crate) auth_required: Vec<String>,
}

impl ExecuteSqlConfig {
    pub(crate) fn build(
        &self,
        kind: &'static str,
        bind_style: BindStyle,
        empty_result: EmptyResult,
        ctx: &InitContext,
    ) -> ConfigResult<Arc<dyn Tool>> {
        let source = ctx.source(&self.name, &self.source)?;
        let sql = source.sql().ok_or_else(|| incompatible(kind, &self.name, &source))?;
        if sql.bind_style() != bind_style {
            return Err(incompatible(kind, &self.name, &source));
        }
        ctx.require_auth_services(&self.name, &self.auth_required)?;

        let mut statement_param = Parameter::scalar("sql", params::ParameterType::String);
        statement_param.description = "The SQL statement to execute.".to_string();

        Ok(Arc::new(ExecuteSqlTool {
            inner: SqlTool::new_prebuilt(
                self.name.clone(),
                kind,
                self.description.clone(),
                String::new(),
                vec![statement_param],
                self.auth_required.clone(),
                source,
                empty_result,
            ),
        }))
    }
}

/// Runtime execute-sql tool: delegates everything to [`SqlTool`] except the
/// statement, which comes from the `sql` argument.
pub struct ExecuteSqlTool {
    inner: SqlTool,
}

#[async_trait]
impl Tool for ExecuteSqlTool {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    async fn invoke(
        &self,
        params: ParamValues,
        _access_token: Option<&str>,
    ) -> ToolcastResult<Value> {
        let statement = params
            .get("sql")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolcastError::MissingParameter {
                name: "sql".to_string(),
            })?
            .to_string();

        let sql = self
            .inner
            .source
            .sql()
            .ok_or_else(|| ToolcastError::internal("source lost its SQL capability"))?;

        debug!(tool = %self.inner.name, kind = self.inner.kind, "dispatching verbatim statement");
        let rows = sql.query(&statement, &[]).await?;

        if rows.is_empty() && self.inner.empty_result == EmptyResult::Marker {
            return Ok(Value::String(EMPTY_ROWS_MARKER.to_string()));
        }
        Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
    }

    fn parse_params(
        &self,
        raw: &JsonMap,
        claims: &ClaimsByService,
    ) -> ToolcastResult<ParamValues> {
        self.inner.parse_params(raw, claims)
    }

    fn manifest(&self) -> ToolManifest {
        self.inner.manifest()
    }

    fn mcp_manifest(&self) -> McpToolManifest {
        self.inner.mcp_manifest()
    }

    fn authorized(&self, verified: &HashSet<String>) -> bool {
        self.inner.authorized(verified)
    }
}

fn incompatible(kind: &'static str, tool: &str, source: &Arc<dyn Source>) -> ConfigError {
    ConfigError::IncompatibleSource {
        tool: tool.to_string(),
        tool_kind: kind.to_string(),
        source_kind: source.kind().to_string(),
    }
}

fn invalid(kind: &'static str, name: &str, message: String) -> ConfigError {
    ConfigError::InvalidConfig {
        family: "tool",
        name: format!("{} ({})", name, kind),
        message,
    }
}

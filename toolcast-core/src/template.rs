//! Two-stage statement and message templating
//!
//! Stage one substitutes *template parameters* (identifier-like fragments
//! such as table or column names) into the statement text with escaping.
//! Stage two renders `{{.name}}` value placeholders through Handlebars in
//! strict mode; SQL kinds skip stage two and bind values natively instead.

use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ToolcastError, ToolcastResult};
use crate::params::JsonMap;

/// Identifier-level parameter substituted into statement text before the
/// statement reaches the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateParameter {
    pub name: String,

    #[serde(rename = "type", default)]
    pub param_type: TemplateParameterType,

    #[serde(default)]
    pub description: String,
}

/// Template parameters are identifiers or identifier lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemplateParameterType {
    #[default]
    String,
    Array,
}

/// A resolved template-parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    Identifier(String),
    List(Vec<String>),
}

/// Pull template-parameter values out of the raw argument map.
///
/// Template parameters are always required: there is no sensible default
/// for an identifier fragment.
pub fn parse_template_params(
    declared: &[TemplateParameter],
    raw: &JsonMap,
) -> ToolcastResult<Vec<(String, TemplateValue)>> {
    let mut out = Vec::with_capacity(declared.len());
    for param in declared {
        let value = raw
            .get(&param.name)
            .ok_or_else(|| ToolcastError::MissingParameter {
                name: param.name.clone(),
            })?;
        let value = match (param.param_type, value) {
            (TemplateParameterType::String, Value::String(s)) => {
                TemplateValue::Identifier(s.clone())
            }
            (TemplateParameterType::Array, Value::Array(items)) => {
                let mut fragments = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => fragments.push(s.clone()),
                        other => {
                            return Err(ToolcastError::InvalidParameter {
                                name: param.name.clone(),
                                reason: format!("expected string elements, got {}", other),
                            })
                        }
                    }
                }
                TemplateValue::List(fragments)
            }
            (_, other) => {
                return Err(ToolcastError::InvalidParameter {
                    name: param.name.clone(),
                    reason: format!("expected identifier fragment, got {}", other),
                })
            }
        };
        out.push((param.name.clone(), value));
    }
    Ok(out)
}

/// Substitute template parameters into a statement.
///
/// Placeholders use the same `{{.name}}` syntax as value templates; only
/// declared template-parameter names are replaced here. Fragments are
/// validated, never quoted: a fragment containing anything outside
/// `[A-Za-z0-9_.]` is rejected.
pub fn render_identifiers(
    statement: &str,
    values: &[(String, TemplateValue)],
) -> ToolcastResult<String> {
    let mut rendered = statement.to_string();
    for (name, value) in values {
        let fragment = match value {
            TemplateValue::Identifier(ident) => escape_identifier(name, ident)?,
            TemplateValue::List(idents) => {
                let mut escaped = Vec::with_capacity(idents.len());
                for ident in idents {
                    escaped.push(escape_identifier(name, ident)?);
                }
                escaped.join(", ")
            }
        };
        for placeholder in [format!("{{{{.{}}}}}", name), format!("{{{{ .{} }}}}", name)] {
            rendered = rendered.replace(&placeholder, &fragment);
        }
    }
    Ok(rendered)
}

fn escape_identifier(param: &str, fragment: &str) -> ToolcastResult<String> {
    if fragment.is_empty() {
        return Err(ToolcastError::template(format!(
            "template parameter {:?} is empty",
            param
        )));
    }
    if let Some(bad) = fragment
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '_' && *c != '.')
    {
        return Err(ToolcastError::template(format!(
            "template parameter {:?} contains forbidden character {:?}",
            param, bad
        )));
    }
    Ok(fragment.to_string())
}

/// JSON-surface manifest entries for a template-parameter list.
pub fn manifest(params: &[TemplateParameter]) -> Vec<crate::params::ParameterManifest> {
    params
        .iter()
        .map(|p| crate::params::ParameterManifest {
            name: p.name.clone(),
            param_type: match p.param_type {
                TemplateParameterType::String => "string".to_string(),
                TemplateParameterType::Array => "array".to_string(),
            },
            description: p.description.clone(),
            required: true,
            auth_services: Vec::new(),
            items: None,
        })
        .collect()
}

/// Extend an MCP input schema with template-parameter properties.
///
/// Template parameters are always client-supplied and always required.
pub fn extend_mcp_schema(schema: &mut Value, params: &[TemplateParameter]) {
    let Some(obj) = schema.as_object_mut() else {
        return;
    };
    for param in params {
        let property = match param.param_type {
            TemplateParameterType::String => serde_json::json!({
                "type": "string",
                "description": param.description,
            }),
            TemplateParameterType::Array => serde_json::json!({
                "type": "array",
                "description": param.description,
                "items": { "type": "string" },
            }),
        };
        if let Some(properties) = obj.get_mut("properties").and_then(Value::as_object_mut) {
            properties.insert(param.name.clone(), property);
        }
        if let Some(required) = obj.get_mut("required").and_then(Value::as_array_mut) {
            required.push(Value::String(param.name.clone()));
        }
    }
}

/// Handlebars wrapper rendering `{{.name}}` value placeholders.
///
/// Strict mode: referencing a value that is not present is an error.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// Render a template against a value map.
    pub fn render(&self, template: &str, values: &JsonMap) -> ToolcastResult<String> {
        let normalized = normalize_dot_paths(template);
        self.handlebars
            .render_template(&normalized, &Value::Object(values.clone()))
            .map_err(|e| ToolcastError::template(e.to_string()))
    }

    /// Check template syntax without rendering.
    pub fn validate(&self, template: &str) -> ToolcastResult<()> {
        handlebars::Template::compile(&normalize_dot_paths(template))
            .map(|_| ())
            .map_err(|e| ToolcastError::template(e.to_string()))
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Rewrite `{{.name}}` references to the `{{name}}` form Handlebars
/// expects. Only a single leading dot on a plain path is stripped.
fn normalize_dot_paths(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start + 2]);
        rest = &rest[start + 2..];
        let end = match rest.find("}}") {
            Some(end) => end,
            None => break,
        };
        let inner = &rest[..end];
        let trimmed = inner.trim_start();
        if let Some(stripped) = trimmed.strip_prefix('.') {
            if stripped.chars().next().map_or(false, |c| c != '.') {
                let leading = &inner[..inner.len() - trimmed.len()];
                out.push_str(leading);
                out.push_str(stripped);
            } else {
                out.push_str(inner);
            }
        } else {
            out.push_str(inner);
        }
        out.push_str("}}");
        rest = &rest[end + 2..];
    }
    out.push_str(rest);
    out
}

//! Typed parameter model shared by tools and prompts
//!
//! Parameters are a tagged union over scalar, array and map shapes. A
//! declaration list drives request parsing (with claim injection for
//! auth-backed parameters), the JSON-surface manifest and the MCP
//! JSON-Schema manifest.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::error::{ToolcastError, ToolcastResult};

/// JSON object shorthand used throughout the crate
pub type JsonMap = Map<String, Value>;

/// Claims maps keyed by auth-service name, produced by header verification
pub type ClaimsByService = HashMap<String, JsonMap>;

/// Scalar value types usable as map values and array elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Integer,
    Float,
    Boolean,
}

impl ScalarType {
    /// JSON-Schema type name
    pub fn schema_type(&self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Integer => "integer",
            ScalarType::Float => "number",
            ScalarType::Boolean => "boolean",
        }
    }
}

/// Parameter type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    /// Prompts omit `type` and fall back to string
    #[default]
    String,
    Integer,
    Float,
    Boolean,
    Array,
    Map,
}

impl ParameterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Integer => "integer",
            ParameterType::Float => "float",
            ParameterType::Boolean => "boolean",
            ParameterType::Array => "array",
            ParameterType::Map => "map",
        }
    }
}

/// Binding of a parameter to a verified claim field of one auth service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthBinding {
    /// Auth service name, as declared under `authServices:` in the manifest
    pub name: String,
    /// Claim field projected out of the verified token
    pub field: String,
}

/// A declared tool or prompt parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Parameter {
    pub name: String,

    #[serde(rename = "type", default)]
    pub param_type: ParameterType,

    #[serde(default)]
    pub description: String,

    /// Default applied when the argument is omitted; its runtime type must
    /// match the declared type (checked at config load)
    #[serde(default)]
    pub default: Option<Value>,

    /// Defaults to true; a present default makes the effective value false
    #[serde(default)]
    pub required: Option<bool>,

    /// Non-empty bindings make this parameter claim-fed: the request value
    /// is ignored and no default is allowed
    #[serde(default, rename = "authServices")]
    pub auth_services: Vec<AuthBinding>,

    /// Element shape for array parameters
    #[serde(default)]
    pub items: Option<Box<Parameter>>,

    /// Value type for map parameters; keys are always strings
    #[serde(default, rename = "valueType")]
    pub value_type: Option<ScalarType>,
}

impl Parameter {
    /// Shorthand for a scalar parameter (mostly used in tests)
    pub fn scalar(name: impl Into<String>, param_type: ParameterType) -> Self {
        Parameter {
            name: name.into(),
            param_type,
            description: String::new(),
            default: None,
            required: None,
            auth_services: Vec::new(),
            items: None,
            value_type: None,
        }
    }

    /// Required flag as surfaced in manifests
    pub fn manifest_required(&self) -> bool {
        self.required.unwrap_or(self.default.is_none())
    }

    /// Whether omission is an error during parsing
    fn required_for_parse(&self) -> bool {
        self.default.is_none() && self.required.unwrap_or(true)
    }

    pub fn is_auth_backed(&self) -> bool {
        !self.auth_services.is_empty()
    }

    /// Structural validation applied once at config load
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("parameter name must not be empty".to_string());
        }
        match self.param_type {
            ParameterType::Array => {
                if self.items.is_none() {
                    return Err(format!("array parameter {:?} requires items", self.name));
                }
                self.items.as_ref().unwrap().validate()?;
            }
            ParameterType::Map => {}
            _ => {
                if self.items.is_some() {
                    return Err(format!(
                        "parameter {:?} of type {} does not take items",
                        self.name,
                        self.param_type.as_str()
                    ));
                }
            }
        }
        if self.is_auth_backed() && self.default.is_some() {
            return Err(format!(
                "auth-backed parameter {:?} must not declare a default",
                self.name
            ));
        }
        if let Some(default) = &self.default {
            coerce_value(self, default.clone())
                .map_err(|reason| format!("default for {:?}: {}", self.name, reason))?;
        }
        Ok(())
    }

    /// Map value type, defaulting to string
    fn map_value_type(&self) -> ScalarType {
        self.value_type.unwrap_or(ScalarType::String)
    }
}

/// Validate a declaration list: unique names plus per-parameter checks.
pub fn validate_parameters(params: &[Parameter]) -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for p in params {
        if !seen.insert(p.name.as_str()) {
            return Err(format!("duplicate parameter name {:?}", p.name));
        }
        p.validate()?;
    }
    Ok(())
}

/// A single parsed value, paired with its declared name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamValue {
    pub name: String,
    pub value: Value,
}

/// Parsed values in parameter declaration order.
///
/// Order matters: SQL adapters bind these positionally (`$1`, `?`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParamValues(pub Vec<ParamValue>);

impl ParamValues {
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Values in declaration order, for positional binding
    pub fn positional(&self) -> Vec<&Value> {
        self.0.iter().map(|p| &p.value).collect()
    }

    /// Map view used by template rendering
    pub fn as_map(&self) -> JsonMap {
        self.0
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamValue> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse a raw argument map against a declaration list.
///
/// Values are produced in declaration order. Auth-backed parameters are
/// filled exclusively from `claims`; whatever the request carried under
/// that name is ignored.
pub fn parse_params(
    declared: &[Parameter],
    raw: &JsonMap,
    claims: &ClaimsByService,
) -> ToolcastResult<ParamValues> {
    let mut out = Vec::with_capacity(declared.len());

    for param in declared {
        let value = if param.is_auth_backed() {
            resolve_auth_value(param, claims)?
        } else {
            match raw.get(&param.name) {
                Some(v) if !v.is_null() => Some(v.clone()),
                _ => None,
            }
        };

        let value = match value {
            Some(v) => {
                coerce_value(param, v).map_err(|reason| ToolcastError::InvalidParameter {
                    name: param.name.clone(),
                    reason,
                })?
            }
            None if param.is_auth_backed() => unreachable!("auth resolution already errored"),
            None => match &param.default {
                Some(d) => d.clone(),
                None if param.required_for_parse() => {
                    return Err(ToolcastError::MissingParameter {
                        name: param.name.clone(),
                    })
                }
                None => Value::Null,
            },
        };

        out.push(ParamValue {
            name: param.name.clone(),
            value,
        });
    }

    Ok(ParamValues(out))
}

fn resolve_auth_value(param: &Parameter, claims: &ClaimsByService) -> ToolcastResult<Option<Value>> {
    for binding in &param.auth_services {
        if let Some(service_claims) = claims.get(&binding.name) {
            if let Some(value) = service_claims.get(&binding.field) {
                return Ok(Some(value.clone()));
            }
        }
    }
    let first = &param.auth_services[0];
    Err(ToolcastError::MissingAuthClaim {
        param: param.name.clone(),
        service: first.name.clone(),
        field: first.field.clone(),
    })
}

/// Coerce a raw JSON value to the declared parameter type.
///
/// Numeric widening (integer into float) is allowed; string-to-number is
/// not. Arrays validate element-wise, maps value-wise.
fn coerce_value(param: &Parameter, value: Value) -> Result<Value, String> {
    match param.param_type {
        ParameterType::String => match value {
            Value::String(_) => Ok(value),
            other => Err(type_mismatch("string", &other)),
        },
        ParameterType::Integer => {
            let is_integer = matches!(&value, Value::Number(n) if n.is_i64() || n.is_u64());
            if is_integer {
                Ok(value)
            } else {
                Err(type_mismatch("integer", &value))
            }
        }
        ParameterType::Float => match value {
            Value::Number(n) => {
                let widened = n
                    .as_f64()
                    .ok_or_else(|| "number out of float range".to_string())?;
                Ok(json!(widened))
            }
            other => Err(type_mismatch("float", &other)),
        },
        ParameterType::Boolean => match value {
            Value::Bool(_) => Ok(value),
            other => Err(type_mismatch("boolean", &other)),
        },
        ParameterType::Array => {
            let items = param
                .items
                .as_ref()
                .ok_or_else(|| "array parameter missing items declaration".to_string())?;
            match value {
                Value::Array(elements) => {
                    let mut coerced = Vec::with_capacity(elements.len());
                    for (index, element) in elements.into_iter().enumerate() {
                        let element = coerce_value(items, element)
                            .map_err(|reason| format!("element {}: {}", index, reason))?;
                        coerced.push(element);
                    }
                    Ok(Value::Array(coerced))
                }
                other => Err(type_mismatch("array", &other)),
            }
        }
        ParameterType::Map => match value {
            Value::Object(entries) => {
                let value_type = param.map_value_type();
                let scalar = Parameter::scalar("value", scalar_to_parameter_type(value_type));
                let mut coerced = Map::new();
                for (key, entry) in entries {
                    let entry = coerce_value(&scalar, entry)
                        .map_err(|reason| format!("value for key {:?}: {}", key, reason))?;
                    coerced.insert(key, entry);
                }
                Ok(Value::Object(coerced))
            }
            other => Err(type_mismatch("map", &other)),
        },
    }
}

fn scalar_to_parameter_type(scalar: ScalarType) -> ParameterType {
    match scalar {
        ScalarType::String => ParameterType::String,
        ScalarType::Integer => ParameterType::Integer,
        ScalarType::Float => ParameterType::Float,
        ScalarType::Boolean => ParameterType::Boolean,
    }
}

fn type_mismatch(expected: &str, got: &Value) -> String {
    let got = match got {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    format!("expected {}, got {}", expected, got)
}

/// JSON-surface manifest entry for one parameter
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParameterManifest {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub auth_services: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParameterManifest>>,
}

/// Manifest entries for a declaration list, in declaration order.
pub fn manifest(params: &[Parameter]) -> Vec<ParameterManifest> {
    params.iter().map(parameter_manifest).collect()
}

fn parameter_manifest(param: &Parameter) -> ParameterManifest {
    ParameterManifest {
        name: param.name.clone(),
        param_type: param.param_type.as_str().to_string(),
        description: param.description.clone(),
        required: param.manifest_required(),
        auth_services: param
            .auth_services
            .iter()
            .map(|b| b.name.clone())
            .collect(),
        items: param
            .items
            .as_ref()
            .map(|items| Box::new(parameter_manifest(&inherit_description(items, param)))),
    }
}

/// MCP input schema for a declaration list: a JSON-Schema object with
/// `properties` and `required`.
///
/// Auth-backed parameters never appear: clients cannot supply them, their
/// values come from verified claims.
pub fn mcp_input_schema(params: &[Parameter]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in params {
        if param.is_auth_backed() {
            continue;
        }
        properties.insert(param.name.clone(), parameter_schema(param));
        if param.default.is_none() {
            required.push(Value::String(param.name.clone()));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn parameter_schema(param: &Parameter) -> Value {
    match param.param_type {
        ParameterType::String | ParameterType::Integer | ParameterType::Float
        | ParameterType::Boolean => {
            let schema_type = match param.param_type {
                ParameterType::Float => "number",
                other => other.as_str(),
            };
            json!({
                "type": schema_type,
                "description": param.description,
            })
        }
        ParameterType::Array => {
            let items = param.items.as_ref().expect("validated at config load");
            json!({
                "type": "array",
                "description": param.description,
                "items": parameter_schema(&inherit_description(items, param)),
            })
        }
        ParameterType::Map => json!({
            "type": "object",
            "description": param.description,
            "additionalProperties": { "type": param.map_value_type().schema_type() },
        }),
    }
}

/// Items inherit the parent description unless they carry their own.
fn inherit_description(items: &Parameter, parent: &Parameter) -> Parameter {
    let mut items = items.clone();
    if items.description.is_empty() {
        items.description = parent.description.clone();
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_with(service: &str, field: &str, value: Value) -> ClaimsByService {
        let mut claims = JsonMap::new();
        claims.insert(field.to_string(), value);
        HashMap::from([(service.to_string(), claims)])
    }

    fn raw(entries: &[(&str, Value)]) -> JsonMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_parse_preserves_declaration_order() {
        let declared = vec![
            Parameter::scalar("b", ParameterType::Integer),
            Parameter::scalar("a", ParameterType::String),
        ];
        let values = parse_params(
            &declared,
            &raw(&[("a", json!("x")), ("b", json!(1))]),
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(values.names(), vec!["b", "a"]);
        assert_eq!(values.positional(), vec![&json!(1), &json!("x")]);
    }

    #[test]
    fn test_missing_required_parameter() {
        let declared = vec![Parameter::scalar("id", ParameterType::Integer)];
        let err = parse_params(&declared, &JsonMap::new(), &HashMap::new()).unwrap_err();
        assert_eq!(err.to_string(), "parameter \"id\" is required");
    }

    #[test]
    fn test_default_applied_when_omitted() {
        let mut p = Parameter::scalar("limit", ParameterType::Integer);
        p.default = Some(json!(10));
        let values = parse_params(&[p], &JsonMap::new(), &HashMap::new()).unwrap();
        assert_eq!(values.get("limit"), Some(&json!(10)));
    }

    #[test]
    fn test_explicit_required_with_default_accepts_omission() {
        let mut p = Parameter::scalar("limit", ParameterType::Integer);
        p.default = Some(json!(10));
        p.required = Some(true);
        assert!(p.manifest_required());
        let values = parse_params(&[p], &JsonMap::new(), &HashMap::new()).unwrap();
        assert_eq!(values.get("limit"), Some(&json!(10)));
    }

    #[test]
    fn test_string_to_number_rejected() {
        let declared = vec![Parameter::scalar("id", ParameterType::Integer)];
        let err = parse_params(&declared, &raw(&[("id", json!("1"))]), &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, ToolcastError::InvalidParameter { .. }));
    }

    #[test]
    fn test_integer_widens_to_float() {
        let declared = vec![Parameter::scalar("ratio", ParameterType::Float)];
        let values =
            parse_params(&declared, &raw(&[("ratio", json!(2))]), &HashMap::new()).unwrap();
        assert_eq!(values.get("ratio"), Some(&json!(2.0)));
    }

    #[test]
    fn test_array_elements_validated() {
        let mut p = Parameter::scalar("ids", ParameterType::Array);
        p.items = Some(Box::new(Parameter::scalar("item", ParameterType::Integer)));
        let err = parse_params(
            &[p],
            &raw(&[("ids", json!([1, "two", 3]))]),
            &HashMap::new(),
        )
        .unwrap_err();
        match err {
            ToolcastError::InvalidParameter { reason, .. } => {
                assert!(reason.contains("element 1"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_map_values_validated() {
        let mut p = Parameter::scalar("labels", ParameterType::Map);
        p.value_type = Some(ScalarType::String);
        let err = parse_params(
            &[p],
            &raw(&[("labels", json!({"env": "prod", "count": 3}))]),
            &HashMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ToolcastError::InvalidParameter { .. }));
    }

    #[test]
    fn test_auth_backed_ignores_request_value() {
        let mut p = Parameter::scalar("email", ParameterType::String);
        p.auth_services = vec![AuthBinding {
            name: "g1".to_string(),
            field: "email".to_string(),
        }];
        let values = parse_params(
            &[p],
            &raw(&[("email", json!("mallory@evil"))]),
            &claims_with("g1", "email", json!("alice@x")),
        )
        .unwrap();
        assert_eq!(values.get("email"), Some(&json!("alice@x")));
    }

    #[test]
    fn test_auth_backed_missing_claim() {
        let mut p = Parameter::scalar("email", ParameterType::String);
        p.auth_services = vec![AuthBinding {
            name: "g1".to_string(),
            field: "email".to_string(),
        }];
        let err = parse_params(&[p], &JsonMap::new(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, ToolcastError::MissingAuthClaim { .. }));
    }

    #[test]
    fn test_optional_without_default_yields_null() {
        let mut p = Parameter::scalar("note", ParameterType::String);
        p.required = Some(false);
        let values = parse_params(&[p], &JsonMap::new(), &HashMap::new()).unwrap();
        assert_eq!(values.get("note"), Some(&Value::Null));
        assert_eq!(values.names(), vec!["note"]);
    }

    #[test]
    fn test_mcp_schema_required_set() {
        let mut with_default = Parameter::scalar("limit", ParameterType::Integer);
        with_default.default = Some(json!(10));
        let mut auth_backed = Parameter::scalar("email", ParameterType::String);
        auth_backed.auth_services = vec![AuthBinding {
            name: "g1".to_string(),
            field: "email".to_string(),
        }];
        let declared = vec![
            Parameter::scalar("id", ParameterType::Integer),
            with_default,
            auth_backed,
        ];

        let schema = mcp_input_schema(&declared);
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, vec!["id"]);
        assert!(schema["properties"].get("email").is_none());
        assert_eq!(schema["properties"]["limit"]["type"], json!("integer"));
    }

    #[test]
    fn test_items_inherit_parent_description() {
        let mut p = Parameter::scalar("ids", ParameterType::Array);
        p.description = "user ids".to_string();
        p.items = Some(Box::new(Parameter::scalar("item", ParameterType::Integer)));
        let schema = mcp_input_schema(&[p]);
        assert_eq!(
            schema["properties"]["ids"]["items"]["description"],
            json!("user ids")
        );
    }

    #[test]
    fn test_validate_rejects_auth_backed_default() {
        let mut p = Parameter::scalar("email", ParameterType::String);
        p.auth_services = vec![AuthBinding {
            name: "g1".to_string(),
            field: "email".to_string(),
        }];
        p.default = Some(json!("x"));
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_mistyped_default() {
        let mut p = Parameter::scalar("id", ParameterType::Integer);
        p.default = Some(json!("not-a-number"));
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_names() {
        let declared = vec![
            Parameter::scalar("id", ParameterType::Integer),
            Parameter::scalar("id", ParameterType::String),
        ];
        assert!(validate_parameters(&declared).is_err());
    }
}

//! Custom prompt kind
//!
//! An ordered list of role/content message templates. Arguments reuse the
//! parameter model and default to string type when `type` is omitted.

use serde::Deserialize;
use serde_yaml::Value as YamlValue;
use std::collections::HashMap;
use std::sync::Arc;

use toolcast_core::error::{ConfigError, ConfigResult, ToolcastError, ToolcastResult};
use toolcast_core::kinds::{decode_strict, PromptConfig};
use toolcast_core::params::{self, JsonMap, ParamValues, Parameter};
use toolcast_core::prompt::{McpPromptArgument, McpPromptManifest, Prompt, PromptMessage};
use toolcast_core::template::TemplateEngine;

pub const KIND: &str = "custom";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomPromptConfig {
    #[serde(skip)]
    name: String,

    #[serde(default)]
    description: String,

    messages: Vec<MessageConfig>,

    #[serde(default)]
    arguments: Vec<Parameter>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageConfig {
    #[serde(default = "default_role")]
    role: String,

    content: String,
}

pub fn decode_config(name: &str, node: YamlValue) -> ConfigResult<Box<dyn PromptConfig>> {
    let mut config: CustomPromptConfig = decode_strict("prompt", name, node)?;
    config.name = name.to_string();
    Ok(Box::new(config))
}

impl PromptConfig for CustomPromptConfig {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&self) -> ConfigResult<Arc<dyn Prompt>> {
        params::validate_parameters(&self.arguments).map_err(|message| {
            ConfigError::InvalidConfig {
                family: "prompt",
                name: self.name.clone(),
                message,
            }
        })?;

        let engine = TemplateEngine::new();
        for (index, message) in self.messages.iter().enumerate() {
            engine
                .validate(&message.content)
                .map_err(|e| ConfigError::InvalidConfig {
                    family: "prompt",
                    name: self.name.clone(),
                    message: format!("message {}: {}", index, e),
                })?;
        }

        Ok(Arc::new(CustomPrompt {
            name: self.name.clone(),
            description: self.description.clone(),
            messages: self.messages.clone(),
            arguments: self.arguments.clone(),
            engine,
        }))
    }
}

pub struct CustomPrompt {
    name: String,
    description: String,
    messages: Vec<MessageConfig>,
    arguments: Vec<Parameter>,
    engine: TemplateEngine,
}

impl Prompt for CustomPrompt {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parse_args(&self, raw: &JsonMap) -> ToolcastResult<ParamValues> {
        params::parse_params(&self.arguments, raw, &HashMap::new())
    }

    fn substitute_params(&self, values: &ParamValues) -> ToolcastResult<Vec<PromptMessage>> {
        let value_map = values.as_map();
        self.messages
            .iter()
            .enumerate()
            .map(|(index, message)| {
                let content = self
                    .engine
                    .render(&message.content, &value_map)
                    .map_err(|e| ToolcastError::template(format!("message {}: {}", index, e)))?;
                Ok(PromptMessage {
                    role: message.role.clone(),
                    content,
                })
            })
            .collect()
    }

    fn mcp_manifest(&self) -> McpPromptManifest {
        McpPromptManifest {
            name: self.name.clone(),
            description: self.description.clone(),
            arguments: self
                .arguments
                .iter()
                .map(|p| McpPromptArgument {
                    name: p.name.clone(),
                    description: p.description.clone(),
                    required: p.default.is_none(),
                })
                .collect(),
        }
    }
}

fn default_role() -> String {
    "user".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prompt() -> Arc<dyn Prompt> {
        let node: YamlValue = serde_yaml::from_str(
            r#"
description: Greets someone by name
messages:
  - {role: user, content: "Hello, {{.name}}"}
arguments:
  - {name: name, description: who to greet}
"#,
        )
        .unwrap();
        decode_config("p1", node).unwrap().initialize().unwrap()
    }

    #[test]
    fn test_substitution() {
        let prompt = prompt();
        let mut raw = JsonMap::new();
        raw.insert("name".to_string(), json!("Bob"));
        let values = prompt.parse_args(&raw).unwrap();
        let messages = prompt.substitute_params(&values).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[0].content, "Hello, Bob");
    }

    #[test]
    fn test_substitution_idempotent_on_plain_output() {
        let prompt = prompt();
        let mut raw = JsonMap::new();
        raw.insert("name".to_string(), json!("Bob"));
        let values = prompt.parse_args(&raw).unwrap();
        let first = prompt.substitute_params(&values).unwrap();

        // Rendering content that no longer contains placeholders is stable
        let engine = TemplateEngine::new();
        let again = engine.render(&first[0].content, &values.as_map()).unwrap();
        assert_eq!(again, first[0].content);
    }

    #[test]
    fn test_untyped_argument_defaults_to_string() {
        let prompt = prompt();
        let mut raw = JsonMap::new();
        raw.insert("name".to_string(), json!(42));
        let err = prompt.parse_args(&raw).unwrap_err();
        assert!(matches!(err, ToolcastError::InvalidParameter { .. }));
    }

    #[test]
    fn test_manifest_reports_defaulted_args_optional() {
        let node: YamlValue = serde_yaml::from_str(
            r#"
messages:
  - {content: "{{.greeting}}, {{.name}}"}
arguments:
  - {name: greeting, default: Hello}
  - {name: name}
"#,
        )
        .unwrap();
        let prompt = decode_config("p2", node).unwrap().initialize().unwrap();
        let manifest = prompt.mcp_manifest();
        assert!(!manifest.arguments[0].required);
        assert!(manifest.arguments[1].required);
    }
}

//! Two-phase decode and initialize wiring
//!
//! Phase one peeks the `kind` of every entity node and runs the matching
//! factory's strict decode. Phase two initializes in dependency order:
//! sources first (pools open here), then auth services, then tools and
//! prompts against both tables, toolsets last.

use serde_yaml::Value as YamlValue;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use toolcast_core::auth::AuthService;
use toolcast_core::error::{ConfigError, ConfigResult};
use toolcast_core::kinds::{
    self, AuthServiceConfig, InitContext, PromptConfig, SourceConfig, ToolConfig,
};
use toolcast_core::prompt::Prompt;
use toolcast_core::registry::{Registry, Toolset};
use toolcast_core::source::Source;
use toolcast_core::tool::Tool;

use crate::schema::{KindEnvelope, RootConfig};

/// Typed configuration, decoded but not yet wired
pub struct DecodedConfig {
    pub sources: Vec<Box<dyn SourceConfig>>,
    pub auth_services: Vec<Box<dyn AuthServiceConfig>>,
    pub tools: Vec<Box<dyn ToolConfig>>,
    pub prompts: Vec<Box<dyn PromptConfig>>,
    pub toolsets: Vec<Toolset>,
}

impl std::fmt::Debug for DecodedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedConfig")
            .field("sources", &self.sources.len())
            .field("auth_services", &self.auth_services.len())
            .field("tools", &self.tools.len())
            .field("prompts", &self.prompts.len())
            .field("toolsets", &self.toolsets)
            .finish()
    }
}

/// Decode a manifest document into typed configs.
pub fn decode(document: &str) -> ConfigResult<DecodedConfig> {
    let root: RootConfig = serde_yaml::from_str(document)?;

    let mut sources = Vec::with_capacity(root.sources.len());
    for (name, node) in root.sources {
        let (kind, node) = peek_kind("source", &name, node)?;
        sources.push(kinds::decode_source(&kind, &name, node)?);
    }

    let mut auth_services = Vec::with_capacity(root.auth_services.len());
    for (name, node) in root.auth_services {
        let (kind, node) = peek_kind("auth service", &name, node)?;
        auth_services.push(kinds::decode_auth_service(&kind, &name, node)?);
    }

    let mut tools = Vec::with_capacity(root.tools.len());
    for (name, node) in root.tools {
        let (kind, node) = peek_kind("tool", &name, node)?;
        tools.push(kinds::decode_tool(&kind, &name, node)?);
    }

    let mut prompts = Vec::with_capacity(root.prompts.len());
    for (name, node) in root.prompts {
        let (kind, node) = peek_kind("prompt", &name, node)?;
        prompts.push(kinds::decode_prompt(&kind, &name, node)?);
    }

    let toolsets = root
        .toolsets
        .into_iter()
        .map(|(name, tool_names)| Toolset { name, tool_names })
        .collect();

    Ok(DecodedConfig {
        sources,
        auth_services,
        tools,
        prompts,
        toolsets,
    })
}

/// Pull the `kind` tag out of an entity node, handing the factory the node
/// minus the tag so typed configs only declare their own fields.
fn peek_kind(
    family: &'static str,
    name: &str,
    node: YamlValue,
) -> ConfigResult<(String, YamlValue)> {
    let envelope: KindEnvelope =
        serde_yaml::from_value(node.clone()).map_err(|_| ConfigError::InvalidConfig {
            family,
            name: name.to_string(),
            message: "missing required field `kind`".to_string(),
        })?;

    let node = match node {
        YamlValue::Mapping(mut mapping) => {
            mapping.remove("kind");
            YamlValue::Mapping(mapping)
        }
        other => other,
    };

    Ok((envelope.kind, node))
}

/// Wire decoded configs into a runnable registry.
///
/// Any missing cross-reference, incompatible source, duplicate name, or
/// auth binding to an undeclared service is fatal here.
pub async fn initialize(decoded: DecodedConfig) -> ConfigResult<Registry> {
    let mut sources: HashMap<String, Arc<dyn Source>> = HashMap::new();
    for config in &decoded.sources {
        debug!(source = config.name(), kind = config.kind(), "initializing source");
        let source = config.initialize().await?;
        insert_unique(&mut sources, "source", config.name(), source)?;
    }

    let mut auth_services: HashMap<String, Arc<dyn AuthService>> = HashMap::new();
    for config in &decoded.auth_services {
        let service = config.initialize()?;
        insert_unique(&mut auth_services, "auth service", config.name(), service)?;
    }

    let ctx = InitContext {
        sources,
        auth_services,
    };

    let mut tools: HashMap<String, Arc<dyn Tool>> = HashMap::new();
    for config in &decoded.tools {
        let tool = config.initialize(&ctx)?;
        insert_unique(&mut tools, "tool", config.name(), tool)?;
    }

    let mut prompts: HashMap<String, Arc<dyn Prompt>> = HashMap::new();
    for config in &decoded.prompts {
        let prompt = config.initialize()?;
        insert_unique(&mut prompts, "prompt", config.name(), prompt)?;
    }

    let mut toolsets: HashMap<String, Toolset> = HashMap::new();
    for toolset in decoded.toolsets {
        for tool_name in &toolset.tool_names {
            if !tools.contains_key(tool_name) {
                return Err(ConfigError::MissingReference {
                    referrer: format!("toolset {:?}", toolset.name),
                    family: "tool",
                    name: tool_name.clone(),
                });
            }
        }
        if toolsets.contains_key(&toolset.name) {
            return Err(ConfigError::DuplicateName {
                family: "toolset",
                name: toolset.name,
            });
        }
        toolsets.insert(toolset.name.clone(), toolset);
    }

    info!(
        tools = tools.len(),
        prompts = prompts.len(),
        toolsets = toolsets.len(),
        "configuration initialized"
    );

    Ok(Registry::new(
        ctx.sources,
        ctx.auth_services,
        tools,
        prompts,
        toolsets,
    ))
}

fn insert_unique<T>(
    table: &mut HashMap<String, T>,
    family: &'static str,
    name: &str,
    value: T,
) -> ConfigResult<()> {
    if table.contains_key(name) {
        return Err(ConfigError::DuplicateName {
            family,
            name: name.to_string(),
        });
    }
    table.insert(name.to_string(), value);
    Ok(())
}

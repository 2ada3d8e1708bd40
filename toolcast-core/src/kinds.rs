//! Process-wide kind registry
//!
//! Each entity family (sources, tools, prompts, auth services) has a
//! `{kind → factory}` table. Implementation crates register their factories
//! through an explicit `register_all()` hook called at program start;
//! `kind: <name>` in the manifest selects the factory during decoding.
//! There is no runtime unregister.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_yaml::Value as YamlValue;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::auth::AuthService;
use crate::error::{ConfigError, ConfigResult};
use crate::prompt::Prompt;
use crate::source::Source;
use crate::tool::Tool;

/// Everything a tool or prompt config may reference while initializing
pub struct InitContext {
    pub sources: HashMap<String, Arc<dyn Source>>,
    pub auth_services: HashMap<String, Arc<dyn AuthService>>,
}

impl InitContext {
    /// Resolve a source reference or fail with the referring tool's name.
    pub fn source(&self, referrer: &str, name: &str) -> ConfigResult<Arc<dyn Source>> {
        self.sources
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::MissingReference {
                referrer: referrer.to_string(),
                family: "source",
                name: name.to_string(),
            })
    }

    /// Check that every named auth service is declared.
    pub fn require_auth_services(&self, referrer: &str, names: &[String]) -> ConfigResult<()> {
        for name in names {
            if !self.auth_services.contains_key(name) {
                return Err(ConfigError::MissingReference {
                    referrer: referrer.to_string(),
                    family: "auth service",
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Declarative source shape; `initialize` opens the backend handle.
#[async_trait]
pub trait SourceConfig: Send + Sync {
    fn kind(&self) -> &'static str;
    fn name(&self) -> &str;

    /// Open pools, validate endpoints. Configuration problems must surface
    /// here, not lazily on first use.
    async fn initialize(&self) -> ConfigResult<Arc<dyn Source>>;
}

/// Declarative tool shape; `initialize` wires the bound source and freezes
/// the parameter list.
pub trait ToolConfig: Send + Sync {
    fn kind(&self) -> &'static str;
    fn name(&self) -> &str;

    fn initialize(&self, ctx: &InitContext) -> ConfigResult<Arc<dyn Tool>>;
}

/// Declarative prompt shape.
pub trait PromptConfig: Send + Sync {
    fn kind(&self) -> &'static str;
    fn name(&self) -> &str;

    fn initialize(&self) -> ConfigResult<Arc<dyn Prompt>>;
}

/// Declarative auth-service shape.
pub trait AuthServiceConfig: Send + Sync {
    fn kind(&self) -> &'static str;
    fn name(&self) -> &str;

    fn initialize(&self) -> ConfigResult<Arc<dyn AuthService>>;
}

impl std::fmt::Debug for dyn SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig").field("kind", &self.kind()).field("name", &self.name()).finish()
    }
}

impl std::fmt::Debug for dyn ToolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolConfig").field("kind", &self.kind()).field("name", &self.name()).finish()
    }
}

impl std::fmt::Debug for dyn PromptConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptConfig").field("kind", &self.kind()).field("name", &self.name()).finish()
    }
}

impl std::fmt::Debug for dyn AuthServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthServiceConfig").field("kind", &self.kind()).field("name", &self.name()).finish()
    }
}

pub type SourceConfigFactory = fn(name: &str, node: YamlValue) -> ConfigResult<Box<dyn SourceConfig>>;
pub type ToolConfigFactory = fn(name: &str, node: YamlValue) -> ConfigResult<Box<dyn ToolConfig>>;
pub type PromptConfigFactory = fn(name: &str, node: YamlValue) -> ConfigResult<Box<dyn PromptConfig>>;
pub type AuthServiceConfigFactory =
    fn(name: &str, node: YamlValue) -> ConfigResult<Box<dyn AuthServiceConfig>>;

static SOURCE_KINDS: Lazy<RwLock<HashMap<String, SourceConfigFactory>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));
static TOOL_KINDS: Lazy<RwLock<HashMap<String, ToolConfigFactory>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));
static PROMPT_KINDS: Lazy<RwLock<HashMap<String, PromptConfigFactory>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));
static AUTH_KINDS: Lazy<RwLock<HashMap<String, AuthServiceConfigFactory>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Register a source kind. Returns false (keeping the first factory) when
/// the kind is already taken.
pub fn register_source_kind(kind: &str, factory: SourceConfigFactory) -> bool {
    let mut table = SOURCE_KINDS.write().expect("kind table poisoned");
    if table.contains_key(kind) {
        return false;
    }
    table.insert(kind.to_string(), factory);
    true
}

/// Register a tool kind. Returns false on duplicates.
pub fn register_tool_kind(kind: &str, factory: ToolConfigFactory) -> bool {
    let mut table = TOOL_KINDS.write().expect("kind table poisoned");
    if table.contains_key(kind) {
        return false;
    }
    table.insert(kind.to_string(), factory);
    true
}

/// Register a prompt kind. Returns false on duplicates.
pub fn register_prompt_kind(kind: &str, factory: PromptConfigFactory) -> bool {
    let mut table = PROMPT_KINDS.write().expect("kind table poisoned");
    if table.contains_key(kind) {
        return false;
    }
    table.insert(kind.to_string(), factory);
    true
}

/// Register an auth-service kind. Returns false on duplicates.
pub fn register_auth_kind(kind: &str, factory: AuthServiceConfigFactory) -> bool {
    let mut table = AUTH_KINDS.write().expect("kind table poisoned");
    if table.contains_key(kind) {
        return false;
    }
    table.insert(kind.to_string(), factory);
    true
}

/// Decode a source node through its kind factory.
pub fn decode_source(kind: &str, name: &str, node: YamlValue) -> ConfigResult<Box<dyn SourceConfig>> {
    let factory = SOURCE_KINDS
        .read()
        .expect("kind table poisoned")
        .get(kind)
        .copied()
        .ok_or_else(|| unknown_kind("source", kind, name))?;
    factory(name, node)
}

/// Decode a tool node through its kind factory.
pub fn decode_tool(kind: &str, name: &str, node: YamlValue) -> ConfigResult<Box<dyn ToolConfig>> {
    let factory = TOOL_KINDS
        .read()
        .expect("kind table poisoned")
        .get(kind)
        .copied()
        .ok_or_else(|| unknown_kind("tool", kind, name))?;
    factory(name, node)
}

/// Decode a prompt node through its kind factory.
pub fn decode_prompt(kind: &str, name: &str, node: YamlValue) -> ConfigResult<Box<dyn PromptConfig>> {
    let factory = PROMPT_KINDS
        .read()
        .expect("kind table poisoned")
        .get(kind)
        .copied()
        .ok_or_else(|| unknown_kind("prompt", kind, name))?;
    factory(name, node)
}

/// Decode an auth-service node through its kind factory.
pub fn decode_auth_service(
    kind: &str,
    name: &str,
    node: YamlValue,
) -> ConfigResult<Box<dyn AuthServiceConfig>> {
    let factory = AUTH_KINDS
        .read()
        .expect("kind table poisoned")
        .get(kind)
        .copied()
        .ok_or_else(|| unknown_kind("auth service", kind, name))?;
    factory(name, node)
}

fn unknown_kind(family: &'static str, kind: &str, name: &str) -> ConfigError {
    ConfigError::UnknownKind {
        family,
        kind: kind.to_string(),
        name: name.to_string(),
    }
}

/// Decode a typed config out of a YAML node, mapping serde failures to a
/// strict-decode error for the given entity.
///
/// Used by factory implementations; relies on `deny_unknown_fields` on the
/// target type to reject misnamed keys.
pub fn decode_strict<T: serde::de::DeserializeOwned>(
    family: &'static str,
    name: &str,
    node: YamlValue,
) -> ConfigResult<T> {
    serde_yaml::from_value(node).map_err(|e| ConfigError::InvalidConfig {
        family,
        name: name.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory_a(_name: &str, _node: YamlValue) -> ConfigResult<Box<dyn SourceConfig>> {
        Err(ConfigError::Validation("factory a".to_string()))
    }

    fn factory_b(_name: &str, _node: YamlValue) -> ConfigResult<Box<dyn SourceConfig>> {
        Err(ConfigError::Validation("factory b".to_string()))
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        assert!(register_source_kind("test-dup", factory_a));
        assert!(!register_source_kind("test-dup", factory_b));

        // The surviving factory is the first one
        let err = decode_source("test-dup", "s1", YamlValue::Null).unwrap_err();
        assert!(err.to_string().contains("factory a"));
    }

    #[test]
    fn test_unknown_kind() {
        let err = decode_source("no-such-kind", "s1", YamlValue::Null).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKind { .. }));
        assert!(err.to_string().contains("no-such-kind"));
    }
}

//! Core types for toolcast
//!
//! This crate carries everything the implementation crates share: the error
//! taxonomy, the typed parameter model, statement templating, the
//! process-wide kind registry, the entity traits (sources, tools, prompts,
//! auth services) and the immutable runtime registry the config pipeline
//! produces.

pub mod auth;
pub mod error;
pub mod kinds;
pub mod params;
pub mod prompt;
pub mod registry;
pub mod source;
pub mod template;
pub mod tool;

pub use error::{ConfigError, ConfigResult, ToolcastError, ToolcastResult};
pub use params::{
    AuthBinding, ClaimsByService, JsonMap, ParamValue, ParamValues, Parameter, ParameterManifest,
    ParameterType, ScalarType,
};
pub use registry::{Registry, Toolset};
pub use template::{TemplateEngine, TemplateParameter, TemplateParameterType, TemplateValue};

pub use auth::AuthService;
pub use prompt::{McpPromptArgument, McpPromptManifest, Prompt, PromptMessage};
pub use source::{BindStyle, Source, SqlBackend};
pub use tool::{McpToolManifest, Tool, ToolManifest};

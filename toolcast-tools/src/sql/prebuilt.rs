//! Prebuilt introspection tool kinds
//!
//! Canned statements over a backend's information schema. Each kind fixes
//! the statement and parameter list; the manifest only declares the source
//! and an optional description override.

use serde::Deserialize;
use serde_json::json;
use serde_yaml::Value as YamlValue;
use std::sync::Arc;

use toolcast_core::error::{ConfigError, ConfigResult};
use toolcast_core::kinds::{decode_strict, InitContext, ToolConfig};
use toolcast_core::params::{Parameter, ParameterType};
use toolcast_core::source::BindStyle;
use toolcast_core::tool::Tool;

use super::{EmptyResult, SqlTool};

pub const PG_LIST_TABLES_KIND: &str = "postgres-list-tables";
pub const PG_LIST_ACTIVE_QUERIES_KIND: &str = "postgres-list-active-queries";
pub const SQLITE_LIST_TABLES_KIND: &str = "sqlite-list-tables";
pub const MYSQL_LIST_TABLES_KIND: &str = "mysql-list-tables";

const PG_LIST_TABLES_STATEMENT: &str = "\
SELECT table_schema, table_name \
FROM information_schema.tables \
WHERE table_type = 'BASE TABLE' \
  AND table_schema NOT IN ('pg_catalog', 'information_schema') \
  AND ($1 = '' OR table_name = ANY(string_to_array($1, ','))) \
ORDER BY table_schema, table_name";

const PG_LIST_ACTIVE_QUERIES_STATEMENT: &str = "\
SELECT pid, usename, state, wait_event_type, query, \
       now() - query_start AS duration \
FROM pg_stat_activity \
WHERE state <> 'idle' \
  AND now() - query_start > make_interval(secs => $1) \
ORDER BY query_start";

const SQLITE_LIST_TABLES_STATEMENT: &str = "\
SELECT name FROM sqlite_master \
WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
  AND (?1 = '' OR name = ?1) \
ORDER BY name";

// COALESCE(NULLIF(?, ''), table_name) makes the empty filter match every
// table with a single placeholder (mysql has no numbered parameters)
const MYSQL_LIST_TABLES_STATEMENT: &str = "\
SELECT table_name FROM information_schema.tables \
WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE' \
  AND FIND_IN_SET(table_name, COALESCE(NULLIF(?, ''), table_name)) \
ORDER BY table_name";

/// Shared declarative shape for the prebuilt kinds
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct PrebuiltConfig {
    #[serde(skip)]
    name: String,

    source: String,

    #[serde(default)]
    description: String,

    #[serde(default)]
    auth_required: Vec<String>,
}

/// Everything that distinguishes one prebuilt kind from another
struct PrebuiltSpec {
    kind: &'static str,
    bind_style: BindStyle,
    empty_result: EmptyResult,
    statement: &'static str,
    default_description: &'static str,
    parameters: fn() -> Vec<Parameter>,
}

struct PrebuiltToolConfig {
    config: PrebuiltConfig,
    spec: PrebuiltSpec,
}

impl ToolConfig for PrebuiltToolConfig {
    fn kind(&self) -> &'static str {
        self.spec.kind
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn initialize(&self, ctx: &InitContext) -> ConfigResult<Arc<dyn Tool>> {
        let source = ctx.source(&self.config.name, &self.config.source)?;
        let sql = source.sql().ok_or_else(|| ConfigError::IncompatibleSource {
            tool: self.config.name.clone(),
            tool_kind: self.spec.kind.to_string(),
            source_kind: source.kind().to_string(),
        })?;
        if sql.bind_style() != self.spec.bind_style {
            return Err(ConfigError::IncompatibleSource {
                tool: self.config.name.clone(),
                tool_kind: self.spec.kind.to_string(),
                source_kind: source.kind().to_string(),
            });
        }
        ctx.require_auth_services(&self.config.name, &self.config.auth_required)?;

        let description = if self.config.description.is_empty() {
            self.spec.default_description.to_string()
        } else {
            self.config.description.clone()
        };

        Ok(Arc::new(SqlTool::new_prebuilt(
            self.config.name.clone(),
            self.spec.kind,
            description,
            self.spec.statement.to_string(),
            (self.spec.parameters)(),
            self.config.auth_required.clone(),
            source,
            self.spec.empty_result,
        )))
    }
}

fn decode_prebuilt(
    name: &str,
    node: YamlValue,
    spec: PrebuiltSpec,
) -> ConfigResult<Box<dyn ToolConfig>> {
    let mut config: PrebuiltConfig = decode_strict("tool", name, node)?;
    config.name = name.to_string();
    Ok(Box::new(PrebuiltToolConfig { config, spec }))
}

pub fn decode_pg_list_tables(name: &str, node: YamlValue) -> ConfigResult<Box<dyn ToolConfig>> {
    decode_prebuilt(
        name,
        node,
        PrebuiltSpec {
            kind: PG_LIST_TABLES_KIND,
            bind_style: BindStyle::Dollar,
            empty_result: EmptyResult::EmptyArray,
            statement: PG_LIST_TABLES_STATEMENT,
            default_description: "Lists user tables, optionally filtered by a comma-separated list of names.",
            parameters: pg_list_tables_parameters,
        },
    )
}

pub fn decode_pg_list_active_queries(
    name: &str,
    node: YamlValue,
) -> ConfigResult<Box<dyn ToolConfig>> {
    decode_prebuilt(
        name,
        node,
        PrebuiltSpec {
            kind: PG_LIST_ACTIVE_QUERIES_KIND,
            bind_style: BindStyle::Dollar,
            empty_result: EmptyResult::EmptyArray,
            statement: PG_LIST_ACTIVE_QUERIES_STATEMENT,
            default_description: "Lists currently executing statements, oldest first.",
            parameters: pg_list_active_queries_parameters,
        },
    )
}

pub fn decode_sqlite_list_tables(
    name: &str,
    node: YamlValue,
) -> ConfigResult<Box<dyn ToolConfig>> {
    decode_prebuilt(
        name,
        node,
        PrebuiltSpec {
            kind: SQLITE_LIST_TABLES_KIND,
            bind_style: BindStyle::Question,
            empty_result: EmptyResult::Marker,
            statement: SQLITE_LIST_TABLES_STATEMENT,
            default_description: "Lists tables, optionally filtered to an exact name.",
            parameters: sqlite_list_tables_parameters,
        },
    )
}

pub fn decode_mysql_list_tables(
    name: &str,
    node: YamlValue,
) -> ConfigResult<Box<dyn ToolConfig>> {
    decode_prebuilt(
        name,
        node,
        PrebuiltSpec {
            kind: MYSQL_LIST_TABLES_KIND,
            bind_style: BindStyle::Question,
            empty_result: EmptyResult::EmptyArray,
            statement: MYSQL_LIST_TABLES_STATEMENT,
            default_description: "Lists base tables in the current schema, optionally filtered by a comma-separated list of names.",
            parameters: mysql_list_tables_parameters,
        },
    )
}

fn pg_list_tables_parameters() -> Vec<Parameter> {
    let mut filter = Parameter::scalar("tableNames", ParameterType::String);
    filter.description =
        "Comma-separated table names to include; empty lists every table.".to_string();
    filter.default = Some(json!(""));
    vec![filter]
}

fn pg_list_active_queries_parameters() -> Vec<Parameter> {
    let mut min_duration = Parameter::scalar("minDurationSecs", ParameterType::Float);
    min_duration.description = "Only report queries running at least this long.".to_string();
    min_duration.default = Some(json!(0.0));
    vec![min_duration]
}

fn sqlite_list_tables_parameters() -> Vec<Parameter> {
    let mut filter = Parameter::scalar("tableName", ParameterType::String);
    filter.description = "Exact table name to include; empty lists every table.".to_string();
    filter.default = Some(json!(""));
    vec![filter]
}

fn mysql_list_tables_parameters() -> Vec<Parameter> {
    let mut filter = Parameter::scalar("tableNames", ParameterType::String);
    filter.description =
        "Comma-separated table names to include; empty lists every table.".to_string();
    filter.default = Some(json!(""));
    vec![filter]
}

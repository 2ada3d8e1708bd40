//! Sqlite tool kinds
//!
//! Empty-result convention for this dialect: the marker string
//! `"The query returned 0 rows."`.

use serde_yaml::Value as YamlValue;
use std::sync::Arc;

use toolcast_core::error::ConfigResult;
use toolcast_core::kinds::{decode_strict, InitContext, ToolConfig};
use toolcast_core::source::BindStyle;
use toolcast_core::tool::Tool;

use super::{EmptyResult, ExecuteSqlConfig, SqlToolConfig};

pub const SQL_KIND: &str = "sqlite-sql";
pub const EXECUTE_SQL_KIND: &str = "sqlite-execute-sql";

pub fn decode_sql(name: &str, node: YamlValue) -> ConfigResult<Box<dyn ToolConfig>> {
    let mut config: SqlToolConfig = decode_strict("tool", name, node)?;
    config.name = name.to_string();
    Ok(Box::new(SqliteSqlConfig(config)))
}

pub fn decode_execute_sql(name: &str, node: YamlValue) -> ConfigResult<Box<dyn ToolConfig>> {
    let mut config: ExecuteSqlConfig = decode_strict("tool", name, node)?;
    config.name = name.to_string();
    Ok(Box::new(SqliteExecuteSqlConfig(config)))
}

struct SqliteSqlConfig(SqlToolConfig);

impl ToolConfig for SqliteSqlConfig {
    fn kind(&self) -> &'static str {
        SQL_KIND
    }

    fn name(&self) -> &str {
        &self.0.name
    }

    fn initialize(&self, ctx: &InitContext) -> ConfigResult<Arc<dyn Tool>> {
        self.0
            .build(SQL_KIND, BindStyle::Question, EmptyResult::Marker, ctx)
    }
}

struct SqliteExecuteSqlConfig(ExecuteSqlConfig);

impl ToolConfig for SqliteExecuteSqlConfig {
    fn kind(&self) -> &'static str {
        EXECUTE_SQL_KIND
    }

    fn name(&self) -> &str {
        &self.0.name
    }

    fn initialize(&self, ctx: &InitContext) -> ConfigResult<Arc<dyn Tool>> {
        self.0
            .build(EXECUTE_SQL_KIND, BindStyle::Question, EmptyResult::Marker, ctx)
    }
}

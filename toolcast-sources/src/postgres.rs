//! Postgres source kind
//!
//! Opens a connection pool during initialization and exposes it through
//! the SQL capability with `$1`-style binding.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use serde_yaml::Value as YamlValue;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::any::Any;
use std::sync::Arc;
use tracing::info;

use toolcast_core::error::{scrub_credentials, ConfigError, ConfigResult, ToolcastError, ToolcastResult};
use toolcast_core::kinds::{decode_strict, SourceConfig};
use toolcast_core::params::JsonMap;
use toolcast_core::source::{BindStyle, Source, SqlBackend};

use crate::rows;

pub const KIND: &str = "postgres";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostgresConfig {
    #[serde(skip)]
    name: String,

    host: String,

    #[serde(default = "default_port")]
    port: u16,

    database: String,

    /// Empty user defers to ambient credentials (PGUSER and friends)
    #[serde(default)]
    user: String,

    #[serde(default)]
    password: String,

    #[serde(default = "default_pool_size", rename = "maxConnections")]
    max_connections: u32,
}

pub fn decode_config(name: &str, node: YamlValue) -> ConfigResult<Box<dyn SourceConfig>> {
    let mut config: PostgresConfig = decode_strict("source", name, node)?;
    config.name = name.to_string();
    Ok(Box::new(config))
}

#[async_trait]
impl SourceConfig for PostgresConfig {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> ConfigResult<Arc<dyn Source>> {
        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database);
        if !self.user.is_empty() {
            options = options.username(&self.user);
        }
        if !self.password.is_empty() {
            options = options.password(&self.password);
        }

        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| init_error(&self.name, &e))?;

        // Configuration problems must surface now, not on first invoke
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| init_error(&self.name, &e))?;

        info!(source = %self.name, host = %self.host, database = %self.database, "postgres source ready");
        Ok(Arc::new(PostgresSource { pool }))
    }
}

pub struct PostgresSource {
    pool: PgPool,
}

impl PostgresSource {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SqlBackend for PostgresSource {
    async fn query(&self, statement: &str, params: &[Value]) -> ToolcastResult<Vec<JsonMap>> {
        let mut query = sqlx::query(statement);
        for value in params {
            query = rows::bind_pg(query, value);
        }
        let fetched = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ToolcastError::backend(e.to_string()))?;
        Ok(fetched.iter().map(rows::pg_row_to_json).collect())
    }

    fn bind_style(&self) -> BindStyle {
        BindStyle::Dollar
    }
}

#[async_trait]
impl Source for PostgresSource {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn sql(&self) -> Option<&dyn SqlBackend> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn init_error(name: &str, error: &sqlx::Error) -> ConfigError {
    ConfigError::Initialize {
        family: "source",
        name: name.to_string(),
        message: scrub_credentials(&error.to_string()),
    }
}

fn default_port() -> u16 {
    5432
}

fn default_pool_size() -> u32 {
    5
}

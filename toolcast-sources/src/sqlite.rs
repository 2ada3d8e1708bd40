//! Sqlite source kind

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use serde_yaml::Value as YamlValue;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::any::Any;
use std::sync::Arc;
use tracing::info;

use toolcast_core::error::{ConfigError, ConfigResult, ToolcastError, ToolcastResult};
use toolcast_core::kinds::{decode_strict, SourceConfig};
use toolcast_core::params::JsonMap;
use toolcast_core::source::{BindStyle, Source, SqlBackend};

use crate::rows;

pub const KIND: &str = "sqlite";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteConfig {
    #[serde(skip)]
    name: String,

    /// Database file path, or `:memory:` for an in-memory database
    database: String,
}

pub fn decode_config(name: &str, node: YamlValue) -> ConfigResult<Box<dyn SourceConfig>> {
    let mut config: SqliteConfig = decode_strict("source", name, node)?;
    config.name = name.to_string();
    Ok(Box::new(config))
}

#[async_trait]
impl SourceConfig for SqliteConfig {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> ConfigResult<Arc<dyn Source>> {
        let in_memory = self.database == ":memory:";
        let options = if in_memory {
            SqliteConnectOptions::new().in_memory(true)
        } else {
            SqliteConnectOptions::new().filename(&self.database)
        };

        // An in-memory database exists per connection; a pool pinned to one
        // never-recycled connection keeps every statement on the same
        // database.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| init_error(&self.name, &e))?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| init_error(&self.name, &e))?;

        info!(source = %self.name, database = %self.database, "sqlite source ready");
        Ok(Arc::new(SqliteSource { pool }))
    }
}

pub struct SqliteSource {
    pool: SqlitePool,
}

impl SqliteSource {
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SqlBackend for SqliteSource {
    async fn query(&self, statement: &str, params: &[Value]) -> ToolcastResult<Vec<JsonMap>> {
        let mut query = sqlx::query(statement);
        for value in params {
            query = rows::bind_sqlite(query, value);
        }
        let fetched = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ToolcastError::backend(e.to_string()))?;
        Ok(fetched.iter().map(rows::sqlite_row_to_json).collect())
    }

    fn bind_style(&self) -> BindStyle {
        BindStyle::Question
    }
}

#[async_trait]
impl Source for SqliteSource {
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
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn memory_source() -> Arc<dyn Source> {
        let config = SqliteConfig {
            name: "db1".to_string(),
            database: ":memory:".to_string(),
        };
        config.initialize().await.unwrap()
    }

    #[tokio::test]
    async fn test_query_round_trip() {
        let source = memory_source().await;
        let sql = source.sql().unwrap();

        sql.query("CREATE TABLE t (id INTEGER, name TEXT)", &[])
            .await
            .unwrap();
        sql.query(
            "INSERT INTO t (id, name) VALUES (?, ?)",
            &[json!(1), json!("Alice")],
        )
        .await
        .unwrap();

        let rows = sql
            .query("SELECT id, name FROM t WHERE id = ?", &[json!(1)])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&json!(1)));
        assert_eq!(rows[0].get("name"), Some(&json!("Alice")));

        // Column order is preserved
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["id", "name"]);
    }

    #[tokio::test]
    async fn test_backend_error_surfaces_driver_message() {
        let source = memory_source().await;
        let err = source.sql().unwrap().query("SELEC 1", &[]).await.unwrap_err();
        assert!(matches!(err, ToolcastError::Backend { .. }));
    }

    #[tokio::test]
    async fn test_in_memory_pool_shares_one_database() {
        let source = memory_source().await;
        let sql = source.sql().unwrap();
        sql.query("CREATE TABLE shared (x INTEGER)", &[]).await.unwrap();
        // A second statement must land on the same connection
        sql.query("INSERT INTO shared (x) VALUES (?)", &[json!(7)])
            .await
            .unwrap();
        let rows = sql.query("SELECT x FROM shared", &[]).await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}

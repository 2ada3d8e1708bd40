//! Dynamic row decoding and positional parameter binding
//!
//! Tool statements are not known at compile time, so rows are decoded by
//! inspecting column type information and values are bound by inspecting
//! the JSON value shape. Each dialect has its own corner cases, kept here
//! in one place.

use serde_json::{json, Map, Value};
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, MySql, Postgres, Row, Sqlite, TypeInfo, ValueRef};
use tracing::debug;

use toolcast_core::params::JsonMap;

/// Bind a JSON value onto a postgres query.
///
/// Homogeneous scalar arrays become native postgres arrays so `ANY($n)`
/// works; mixed arrays and maps are bound as jsonb.
pub fn bind_pg<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) if n.is_i64() => query.bind(n.as_i64().unwrap_or_default()),
        Value::Number(n) => query.bind(n.as_f64().unwrap_or_default()),
        Value::String(s) => query.bind(s.as_str()),
        Value::Array(items) => {
            if let Some(ints) = homogeneous(items, Value::as_i64) {
                query.bind(ints)
            } else if let Some(floats) = homogeneous(items, Value::as_f64) {
                query.bind(floats)
            } else if let Some(bools) = homogeneous(items, Value::as_bool) {
                query.bind(bools)
            } else if let Some(strings) =
                homogeneous(items, |v| v.as_str().map(|s| s.to_string()))
            {
                query.bind(strings)
            } else {
                query.bind(value)
            }
        }
        Value::Object(_) => query.bind(value),
    }
}

/// Bind a JSON value onto a sqlite query. Arrays and maps are stored as
/// their JSON text.
pub fn bind_sqlite<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) if n.is_i64() => query.bind(n.as_i64().unwrap_or_default()),
        Value::Number(n) => query.bind(n.as_f64().unwrap_or_default()),
        Value::String(s) => query.bind(s.as_str()),
        other => query.bind(other.to_string()),
    }
}

/// Bind a JSON value onto a mysql query. Arrays and maps are bound as JSON.
pub fn bind_mysql<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) if n.is_i64() => query.bind(n.as_i64().unwrap_or_default()),
        Value::Number(n) => query.bind(n.as_f64().unwrap_or_default()),
        Value::String(s) => query.bind(s.as_str()),
        other => query.bind(other),
    }
}

fn homogeneous<T>(items: &[Value], extract: impl Fn(&Value) -> Option<T>) -> Option<Vec<T>> {
    items.iter().map(extract).collect()
}

/// Decode a postgres row into an ordered column→value map.
pub fn pg_row_to_json(row: &PgRow) -> JsonMap {
    let mut out = Map::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = pg_value(row, index, column.type_info().name());
        out.insert(column.name().to_string(), value);
    }
    out
}

fn pg_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name {
        "BOOL" => opt(row.try_get::<Option<bool>, _>(index)),
        "INT2" => opt(row.try_get::<Option<i16>, _>(index).map(|v| v.map(i64::from))),
        "INT4" => opt(row.try_get::<Option<i32>, _>(index).map(|v| v.map(i64::from))),
        "INT8" => opt(row.try_get::<Option<i64>, _>(index)),
        "FLOAT4" => opt(row.try_get::<Option<f32>, _>(index).map(|v| v.map(f64::from))),
        "FLOAT8" => opt(row.try_get::<Option<f64>, _>(index)),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => {
            opt(row.try_get::<Option<String>, _>(index))
        }
        "UUID" => opt(row
            .try_get::<Option<uuid::Uuid>, _>(index)
            .map(|v| v.map(|u| u.to_string()))),
        "JSON" | "JSONB" => opt(row.try_get::<Option<Value>, _>(index)),
        "TIMESTAMPTZ" => opt(row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)
            .map(|v| v.map(|t| t.to_rfc3339()))),
        "TIMESTAMP" => opt(row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)
            .map(|v| v.map(|t| t.to_string()))),
        "DATE" => opt(row
            .try_get::<Option<chrono::NaiveDate>, _>(index)
            .map(|v| v.map(|t| t.to_string()))),
        other => {
            // Unmapped types fall back to text, then null
            match row.try_get::<Option<String>, _>(index) {
                Ok(v) => json_or_null(v),
                Err(e) => {
                    debug!(column = index, pg_type = other, error = %e, "undecodable column");
                    Value::Null
                }
            }
        }
    }
}

/// Decode a sqlite row into an ordered column→value map.
///
/// Sqlite only types expression columns at runtime, so the value's own
/// type wins over the statement metadata.
pub fn sqlite_row_to_json(row: &SqliteRow) -> JsonMap {
    let mut out = Map::new();
    for (index, column) in row.columns().iter().enumerate() {
        let type_name = row
            .try_get_raw(index)
            .map(|value| value.type_info().name().to_string())
            .unwrap_or_else(|_| column.type_info().name().to_string());
        let value = match type_name.as_str() {
            "NULL" => Value::Null,
            "INTEGER" => opt(row.try_get::<Option<i64>, _>(index)),
            "REAL" => opt(row.try_get::<Option<f64>, _>(index)),
            "BOOLEAN" => opt(row.try_get::<Option<bool>, _>(index)),
            "TEXT" | "DATETIME" => opt(row.try_get::<Option<String>, _>(index)),
            other => match row.try_get::<Option<String>, _>(index) {
                Ok(v) => json_or_null(v),
                Err(e) => {
                    debug!(column = index, sqlite_type = other, error = %e, "undecodable column");
                    Value::Null
                }
            },
        };
        out.insert(column.name().to_string(), value);
    }
    out
}

/// Decode a mysql row into an ordered column→value map.
pub fn mysql_row_to_json(row: &MySqlRow) -> JsonMap {
    let mut out = Map::new();
    for (index, column) in row.columns().iter().enumerate() {
        let type_name = column.type_info().name();
        let value = match type_name {
            "BOOLEAN" => opt(row.try_get::<Option<bool>, _>(index)),
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                opt(row.try_get::<Option<i64>, _>(index))
            }
            "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "INT UNSIGNED" | "BIGINT UNSIGNED" => {
                opt(row
                    .try_get::<Option<u64>, _>(index)
                    .map(|v| v.map(|n| json!(n))))
            }
            "FLOAT" => opt(row.try_get::<Option<f32>, _>(index).map(|v| v.map(f64::from))),
            "DOUBLE" => opt(row.try_get::<Option<f64>, _>(index)),
            "VARCHAR" | "CHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" => {
                opt(row.try_get::<Option<String>, _>(index))
            }
            "JSON" => opt(row.try_get::<Option<Value>, _>(index)),
            "DATETIME" | "TIMESTAMP" => opt(row
                .try_get::<Option<chrono::NaiveDateTime>, _>(index)
                .map(|v| v.map(|t| t.to_string()))),
            "DATE" => opt(row
                .try_get::<Option<chrono::NaiveDate>, _>(index)
                .map(|v| v.map(|t| t.to_string()))),
            other => match row.try_get::<Option<String>, _>(index) {
                Ok(v) => json_or_null(v),
                Err(e) => {
                    debug!(column = index, mysql_type = other, error = %e, "undecodable column");
                    Value::Null
                }
            },
        };
        out.insert(column.name().to_string(), value);
    }
    out
}

fn opt<T: Into<Value>>(result: Result<Option<T>, sqlx::Error>) -> Value {
    match result {
        Ok(Some(v)) => v.into(),
        Ok(None) => Value::Null,
        Err(e) => {
            debug!(error = %e, "column decode failed");
            Value::Null
        }
    }
}

fn json_or_null(value: Option<String>) -> Value {
    value.map(Value::String).unwrap_or(Value::Null)
}

//! Backend source adapters for toolcast
//!
//! A source is a live backend handle (connection pool, HTTP client) shared
//! by every tool bound to it. All kinds validate their configuration during
//! `initialize`, never lazily on first use.

pub mod http;
pub mod mysql;
pub mod postgres;
pub mod rows;
pub mod sqlite;

pub use http::HttpSource;
pub use mysql::MySqlSource;
pub use postgres::PostgresSource;
pub use sqlite::SqliteSource;

/// Register every source kind this crate provides.
///
/// Called once at program start, before configuration decoding.
pub fn register_all() {
    toolcast_core::kinds::register_source_kind(postgres::KIND, postgres::decode_config);
    toolcast_core::kinds::register_source_kind(sqlite::KIND, sqlite::decode_config);
    toolcast_core::kinds::register_source_kind(mysql::KIND, mysql::decode_config);
    toolcast_core::kinds::register_source_kind(http::KIND, http::decode_config);
}

//! Tool and prompt kinds for toolcast
//!
//! Every kind registers a factory into the process-wide kind tables; the
//! configuration pipeline selects factories by the `kind:` tag.

pub mod http;
pub mod prompts;
pub mod sql;

use toolcast_core::kinds;

/// Register every tool and prompt kind this crate provides.
///
/// Called once at program start, before configuration decoding.
pub fn register_all() {
    kinds::register_tool_kind(sql::postgres::SQL_KIND, sql::postgres::decode_sql);
    kinds::register_tool_kind(
        sql::postgres::EXECUTE_SQL_KIND,
        sql::postgres::decode_execute_sql,
    );
    kinds::register_tool_kind(sql::sqlite::SQL_KIND, sql::sqlite::decode_sql);
    kinds::register_tool_kind(
        sql::sqlite::EXECUTE_SQL_KIND,
        sql::sqlite::decode_execute_sql,
    );
    kinds::register_tool_kind(sql::mysql::SQL_KIND, sql::mysql::decode_sql);
    kinds::register_tool_kind(
        sql::mysql::EXECUTE_SQL_KIND,
        sql::mysql::decode_execute_sql,
    );
    kinds::register_tool_kind(
        sql::prebuilt::PG_LIST_TABLES_KIND,
        sql::prebuilt::decode_pg_list_tables,
    );
    kinds::register_tool_kind(
        sql::prebuilt::PG_LIST_ACTIVE_QUERIES_KIND,
        sql::prebuilt::decode_pg_list_active_queries,
    );
    kinds::register_tool_kind(
        sql::prebuilt::SQLITE_LIST_TABLES_KIND,
        sql::prebuilt::decode_sqlite_list_tables,
    );
    kinds::register_tool_kind(
        sql::prebuilt::MYSQL_LIST_TABLES_KIND,
        sql::prebuilt::decode_mysql_list_tables,
    );
    kinds::register_tool_kind(http::KIND, http::decode_config);
    kinds::register_prompt_kind(prompts::KIND, prompts::decode_config);
}

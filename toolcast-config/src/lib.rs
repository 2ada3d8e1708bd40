//! Configuration pipeline for toolcast
//!
//! Turns a YAML manifest into a runnable [`Registry`]: a loose root decode,
//! a strict per-entity decode through the kind factories, then dependency-
//! ordered initialization with cross-reference validation.
//!
//! ```yaml
//! sources:
//!   db1: {kind: sqlite, database: ":memory:"}
//! tools:
//!   get_user:
//!     kind: sqlite-sql
//!     source: db1
//!     description: Look up a user by id
//!     statement: "SELECT id, name FROM users WHERE id = ?"
//!     parameters:
//!       - {name: id, type: integer, description: user id}
//! toolsets:
//!   default: [get_user]
//! ```

pub mod decode;
pub mod loader;
pub mod schema;

pub use decode::{decode as decode_document, initialize, DecodedConfig};
pub use loader::{load_file, load_str};
pub use schema::RootConfig;

pub use toolcast_core::error::{ConfigError, ConfigResult};
pub use toolcast_core::registry::Registry;

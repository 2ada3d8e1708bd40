//! Source trait and backend capability surfaces
//!
//! A source owns a live backend handle (connection pool, HTTP client) and
//! is shared by every tool bound to it. Tools resolve the capabilities they
//! need through accessor methods rather than matching on kind strings, so
//! several source kinds can satisfy the same tool family.

use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;

use crate::error::ToolcastResult;
use crate::params::JsonMap;

/// Positional placeholder style understood by a SQL backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindStyle {
    /// `$1`, `$2`, ... (postgres)
    Dollar,
    /// `?` (sqlite, mysql)
    Question,
}

/// Capability: a SQL-like query interface with positional binding.
#[async_trait]
pub trait SqlBackend: Send + Sync {
    /// Run a statement with positionally-bound parameters.
    ///
    /// Rows come back as column→value maps with column order preserved.
    async fn query(&self, statement: &str, params: &[Value]) -> ToolcastResult<Vec<JsonMap>>;

    /// Placeholder style the statement text must use
    fn bind_style(&self) -> BindStyle;
}

/// A live backend adapter produced by initializing a source config.
///
/// Sources must be safe for concurrent use: the backend handle is the unit
/// of concurrency, and adapters hold no per-invocation state on it.
#[async_trait]
pub trait Source: Send + Sync + 'static {
    /// Registered kind identifier
    fn kind(&self) -> &'static str;

    /// SQL capability, when this source exposes one
    fn sql(&self) -> Option<&dyn SqlBackend> {
        None
    }

    /// Concrete-type escape hatch for capabilities that are not worth a
    /// shared trait (a single source kind provides them)
    fn as_any(&self) -> &dyn Any;

    /// Release the backend handle. Called once, at shutdown or after a
    /// registry swap when no invocation references the source any more.
    async fn close(&self);
}

impl std::fmt::Debug for dyn Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source").field("kind", &self.kind()).finish()
    }
}
